//! Background sync orchestration
//!
//! The [`BackgroundSyncController`] registers interest with the host
//! background-execution agent, runs the foreground periodic timer, and
//! triggers both processors. The host agent sits behind the
//! [`BackgroundAgent`] capability trait and is chosen at construction.

mod agent;
mod controller;

pub use agent::{BackgroundAgent, CommandAgent, NoopAgent, RegistrationError, agent_from_config};
pub use controller::{BackgroundSyncController, ControllerState};

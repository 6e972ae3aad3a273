//! Transport seam for delivering queued items
//!
//! Processors only see the [`Transport`] trait. The production
//! implementation is [`HttpTransport`] over reqwest; timeouts live there.

pub mod client;
mod error;
mod http;
mod types;

pub use client::Transport;
pub use error::TransportError;
pub use http::HttpTransport;
pub use types::{OutboundRequest, TransportResponse};

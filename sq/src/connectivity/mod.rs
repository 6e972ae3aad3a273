//! Connectivity monitoring
//!
//! Turns host reachability signals into controller actions: reachable
//! starts the periodic timer and drains both queues, unreachable stops the
//! timer.

mod monitor;

pub use monitor::ConnectivityMonitor;

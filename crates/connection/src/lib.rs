//! Connection manager for the Proclaim remote control API.
//!
//! Polls Proclaim's on-air session endpoint, aggregates reachability and
//! authentication into a single connection status, performs the token
//! handshake, and dispatches app commands with the auth header attached.

pub mod auth;
pub mod command;
pub mod error;
pub mod manager;
pub mod probe;
pub mod scheduler;
pub mod state;
pub mod types;
pub(crate) mod wire;

#[cfg(test)]
pub(crate) mod test_support;

pub use auth::AuthClient;
pub use command::CommandDispatcher;
pub use error::ControlError;
pub use manager::ConnectionManager;
pub use probe::StatusClient;
pub use scheduler::PollScheduler;
pub use state::{StateStore, compute_status};
pub use types::{ConnectionState, ControlConfig, OverallStatus, ProbeResult, StatusReport};

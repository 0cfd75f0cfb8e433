//! Public types for the Proclaim connection manager.

use proclaim_protocol::auth_required;

/// User configuration: where Proclaim runs and how to authenticate.
///
/// Replaced wholesale on every configuration change.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ControlConfig {
    /// IPv4 address of the Proclaim machine; empty when not configured.
    pub host: String,
    /// Remote control password; only used when `host` is not loopback.
    pub password: String,
}

impl ControlConfig {
    pub fn new(host: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            password: password.into(),
        }
    }

    /// Returns true when commands must carry an auth token.
    pub fn auth_required(&self) -> bool {
        auth_required(&self.host)
    }

    pub fn has_host(&self) -> bool {
        !self.host.is_empty()
    }
}

/// Live connection state shared by all components.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConnectionState {
    /// Proclaim is broadcasting a live session.
    pub on_air: bool,
    /// Raw session id; empty when off air or unknown.
    pub on_air_session_id: String,
    /// The most recent probe completed without a network error.
    pub last_probe_succeeded: bool,
    /// Derived from the configured host.
    pub auth_required: bool,
    /// A token was obtained and has not been rejected since.
    pub auth_succeeded: bool,
    /// Opaque credential; empty when not authenticated.
    pub auth_token: String,
}

/// Overall connection status, derived from [`ConnectionState`] and config.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OverallStatus {
    /// No host configured.
    BadConfig,
    /// The on-air probe is failing.
    Disconnected,
    /// Proclaim is reachable but rejected (or has not yet accepted) our password.
    ConnectionFailure,
    /// Everything is working.
    Ok,
}

impl OverallStatus {
    /// Human-readable reason shown next to non-Ok statuses.
    pub fn message(&self) -> Option<&'static str> {
        match self {
            Self::BadConfig => Some("IP not specified"),
            Self::Disconnected => Some("Could not obtain on air status"),
            Self::ConnectionFailure => Some("Authentication unsuccessful"),
            Self::Ok => None,
        }
    }
}

/// Outcome of a single on-air probe.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProbeResult {
    /// Proclaim returned a session id.
    OnAir { session_id: String },
    /// Proclaim answered with an empty or short body.
    OffAir,
    /// Network error, timeout, or error status.
    Unreachable,
}

impl ProbeResult {
    pub fn is_reachable(&self) -> bool {
        !matches!(self, Self::Unreachable)
    }
}

/// Latest status and on-air value, published after every recomputation.
///
/// Observers hold a `watch` receiver: a slow reader skips intermediate
/// reports but always ends on the newest one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusReport {
    pub status: OverallStatus,
    pub on_air: bool,
    /// Empty when off air.
    pub session_id: String,
}

impl StatusReport {
    pub(crate) fn new(state: &ConnectionState, status: OverallStatus) -> Self {
        Self {
            status,
            on_air: state.on_air,
            session_id: state.on_air_session_id.clone(),
        }
    }
}

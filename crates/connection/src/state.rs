//! Connection state store and status aggregation.
//!
//! All writes to [`ConnectionState`] go through [`StateStore`], which holds
//! the state and the current configuration under one mutex, recomputes the
//! overall status after every mutation, and publishes a [`StatusReport`]
//! while still holding the lock so observers see mutations in order.

use std::sync::{Mutex, MutexGuard};

use tokio::sync::watch;
use tracing::{debug, trace, warn};

use crate::error::ControlError;
use crate::types::{ConnectionState, ControlConfig, OverallStatus, ProbeResult, StatusReport};

/// Derives the overall status. First match wins.
pub fn compute_status(state: &ConnectionState, config: &ControlConfig) -> OverallStatus {
    if !config.has_host() {
        return OverallStatus::BadConfig;
    }
    if !state.last_probe_succeeded {
        return OverallStatus::Disconnected;
    }
    if state.auth_required && !state.auth_succeeded {
        return OverallStatus::ConnectionFailure;
    }
    OverallStatus::Ok
}

/// What changed when a probe result was applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProbeApplied {
    /// `last_probe_succeeded` went from false to true.
    pub regained: bool,
    pub auth_required: bool,
}

/// Credentials a handshake was started with.
#[derive(Debug, Clone)]
pub(crate) struct AuthTicket {
    pub(crate) config: ControlConfig,
    pub(crate) generation: u64,
}

struct Inner {
    state: ConnectionState,
    config: ControlConfig,
    /// Bumped on every scheduler start/stop and on host change; probe
    /// results carry the generation they were issued under.
    poll_generation: u64,
    /// Bumped on every config replacement; handshake results carry the
    /// generation of the credentials they used.
    auth_generation: u64,
}

/// Single owner of [`ConnectionState`].
pub struct StateStore {
    inner: Mutex<Inner>,
    report_tx: watch::Sender<StatusReport>,
}

impl StateStore {
    /// Creates a store with all flags cleared.
    pub fn new(config: ControlConfig) -> Self {
        let state = ConnectionState {
            auth_required: config.auth_required(),
            ..ConnectionState::default()
        };
        let (report_tx, _) = watch::channel(StatusReport::new(
            &state,
            compute_status(&state, &config),
        ));
        Self {
            inner: Mutex::new(Inner {
                state,
                config,
                poll_generation: 0,
                auth_generation: 0,
            }),
            report_tx,
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        // State is plain data; a panic mid-update cannot break an invariant
        // that spans fields, so a poisoned lock is still usable.
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Returns a receiver that always holds the newest [`StatusReport`].
    pub fn subscribe(&self) -> watch::Receiver<StatusReport> {
        self.report_tx.subscribe()
    }

    /// Returns a copy of the current state and its derived status.
    pub fn snapshot(&self) -> (ConnectionState, OverallStatus) {
        let inner = self.lock();
        let status = compute_status(&inner.state, &inner.config);
        (inner.state.clone(), status)
    }

    pub fn status(&self) -> OverallStatus {
        self.snapshot().1
    }

    pub fn config(&self) -> ControlConfig {
        self.lock().config.clone()
    }

    /// Returns the current config together with the current state.
    pub fn read(&self) -> (ControlConfig, ConnectionState) {
        let inner = self.lock();
        (inner.config.clone(), inner.state.clone())
    }

    /// Replaces the configuration and re-derives `auth_required`.
    ///
    /// Handshakes started with the previous credentials become stale. On a
    /// host change, probes still in flight against the old host do too.
    /// Returns true when the host changed.
    pub fn replace_config(&self, config: ControlConfig) -> bool {
        let mut inner = self.lock();
        let host_changed = inner.config.host != config.host;
        if host_changed {
            inner.poll_generation = inner.poll_generation.wrapping_add(1);
        }
        inner.auth_generation = inner.auth_generation.wrapping_add(1);
        inner.state.auth_required = config.auth_required();
        inner.config = config;
        self.publish(&inner);
        host_changed
    }

    /// Starts a new poll generation and returns it.
    pub(crate) fn next_generation(&self) -> u64 {
        let mut inner = self.lock();
        inner.poll_generation = inner.poll_generation.wrapping_add(1);
        inner.poll_generation
    }

    /// Applies a probe result issued under `generation`.
    ///
    /// Returns `None` and leaves state untouched when the generation is stale.
    pub(crate) fn apply_probe(&self, generation: u64, result: ProbeResult) -> Option<ProbeApplied> {
        let mut inner = self.lock();
        if inner.poll_generation != generation {
            trace!(
                generation,
                current = inner.poll_generation,
                "discarding stale probe result"
            );
            return None;
        }

        let was_reachable = inner.state.last_probe_succeeded;
        let state = &mut inner.state;
        match result {
            ProbeResult::OnAir { session_id } => {
                state.on_air = true;
                state.on_air_session_id = session_id;
                state.last_probe_succeeded = true;
            }
            ProbeResult::OffAir => {
                state.on_air = false;
                state.on_air_session_id.clear();
                state.last_probe_succeeded = true;
            }
            ProbeResult::Unreachable => {
                state.on_air = false;
                state.on_air_session_id.clear();
                state.last_probe_succeeded = false;
            }
        }

        let applied = ProbeApplied {
            regained: !was_reachable && inner.state.last_probe_succeeded,
            auth_required: inner.state.auth_required,
        };
        if was_reachable != inner.state.last_probe_succeeded {
            debug!(
                reachable = inner.state.last_probe_succeeded,
                "on-air probe reachability changed"
            );
        }

        self.publish(&inner);
        Some(applied)
    }

    /// Captures the credentials for a handshake about to start.
    pub(crate) fn begin_auth(&self) -> AuthTicket {
        let inner = self.lock();
        AuthTicket {
            config: inner.config.clone(),
            generation: inner.auth_generation,
        }
    }

    /// Applies the outcome of a handshake started with `ticket`.
    ///
    /// Results for credentials that have since been replaced are dropped. A
    /// 401 invalidates the credential; other failures leave it as it was.
    pub(crate) fn apply_auth(&self, ticket: &AuthTicket, result: Result<String, ControlError>) {
        let mut inner = self.lock();
        let host = &ticket.config.host;
        if inner.auth_generation != ticket.generation {
            debug!(
                %host,
                generation = ticket.generation,
                current = inner.auth_generation,
                "discarding auth result for previous credentials"
            );
            return;
        }
        match result {
            Ok(token) => {
                inner.state.auth_succeeded = true;
                inner.state.auth_token = token;
            }
            Err(ControlError::AuthRejected) => {
                warn!(%host, "Proclaim rejected the password");
                inner.state.auth_succeeded = false;
                inner.state.auth_token.clear();
            }
            Err(e) => {
                warn!(%host, error = %e, "authentication failed");
            }
        }
        self.publish(&inner);
    }

    /// Drops the stored token after Proclaim rejected it.
    pub(crate) fn invalidate_auth(&self) {
        let mut inner = self.lock();
        inner.state.auth_succeeded = false;
        inner.state.auth_token.clear();
        self.publish(&inner);
    }

    /// Recomputes and reports status without mutating state.
    pub(crate) fn recompute(&self) {
        let inner = self.lock();
        self.publish(&inner);
    }

    fn publish(&self, inner: &Inner) {
        let status = compute_status(&inner.state, &inner.config);
        // Keeps the value even with no receiver attached.
        self.report_tx
            .send_replace(StatusReport::new(&inner.state, status));
    }

    #[cfg(test)]
    pub(crate) fn set_state(&self, state: ConnectionState) {
        self.lock().state = state;
    }
}

//! Connection manager wiring polling, authentication and commands together.
//!
//! Owns the configuration and the state store, builds every component once,
//! and reacts to configuration updates and shutdown. This is the surface the
//! command catalog, the status display and the configuration host talk to.

use std::sync::Arc;

use proclaim_protocol::constants::{CMD_GO_OFF_AIR, CMD_GO_ON_AIR};
use tokio::sync::watch;
use tracing::info;

use crate::auth::AuthClient;
use crate::command::CommandDispatcher;
use crate::error::ControlError;
use crate::probe::{StatusClient, build_http_client};
use crate::scheduler::{PollContext, PollScheduler};
use crate::state::StateStore;
use crate::types::{ConnectionState, ControlConfig, OverallStatus, StatusReport};

/// Connection manager for a single Proclaim instance.
pub struct ConnectionManager {
    store: Arc<StateStore>,
    scheduler: PollScheduler,
    auth: AuthClient,
    commands: CommandDispatcher,
}

impl ConnectionManager {
    /// Creates a manager for `config`. Nothing runs until [`start`](Self::start).
    pub fn new(config: ControlConfig) -> Result<Self, ControlError> {
        let http = build_http_client()?;
        Ok(Self::with_clients(
            config,
            StatusClient::new(http.clone()),
            AuthClient::new(http),
            CommandDispatcher::new(),
        ))
    }

    fn with_clients(
        config: ControlConfig,
        status: StatusClient,
        auth: AuthClient,
        commands: CommandDispatcher,
    ) -> Self {
        let store = Arc::new(StateStore::new(config));
        let scheduler = PollScheduler::new(PollContext {
            store: store.clone(),
            status,
            auth: auth.clone(),
        });

        Self {
            store,
            scheduler,
            auth,
            commands,
        }
    }

    /// Builds a manager whose clients target `port` (for testing).
    #[cfg(test)]
    pub(crate) fn with_port(config: ControlConfig, port: u16) -> Self {
        let http = build_http_client().unwrap();
        Self::with_clients(
            config,
            StatusClient::new(http.clone()).with_port(port),
            AuthClient::new(http).with_port(port),
            CommandDispatcher::new().with_port(port),
        )
    }

    /// Subscribes to status reports. The receiver always holds the newest
    /// one, however far behind its reader is.
    pub fn subscribe(&self) -> watch::Receiver<StatusReport> {
        self.store.subscribe()
    }

    /// Starts polling the configured host and authenticates if required.
    pub async fn start(&self) {
        let config = self.store.config();
        info!(host = %config.host, "starting Proclaim connection");
        self.scheduler.start(config.host);
        self.authenticate_if_required().await;
        self.store.recompute();
    }

    /// Applies a new configuration.
    ///
    /// The poll cadence restarts only when the host changed; password-only
    /// edits keep it running.
    pub async fn on_config_updated(&self, config: ControlConfig) {
        let host = config.host.clone();
        let host_changed = self.store.replace_config(config);

        if host_changed || !self.scheduler.is_running() {
            info!(%host, "restarting on-air poll");
            self.scheduler.start(host);
        }

        self.authenticate_if_required().await;
        self.store.recompute();
    }

    /// Stops polling. Safe to call more than once.
    pub fn on_shutdown(&self) {
        self.scheduler.stop();
        info!("Proclaim connection shut down");
    }

    /// Sends an app command. Failures only show up in the status.
    pub async fn send_command(&self, name: &str, index: Option<u32>) {
        self.commands.send_command(&self.store, name, index).await;
    }

    /// Sends `GoOffAir` when on air, `GoOnAir` otherwise.
    pub async fn toggle_on_air(&self) {
        let command = if self.store.snapshot().0.on_air {
            CMD_GO_OFF_AIR
        } else {
            CMD_GO_ON_AIR
        };
        self.send_command(command, None).await;
    }

    /// Returns the current state and status.
    pub fn snapshot(&self) -> (ConnectionState, OverallStatus) {
        self.store.snapshot()
    }

    pub fn status(&self) -> OverallStatus {
        self.store.status()
    }

    pub fn config(&self) -> ControlConfig {
        self.store.config()
    }

    async fn authenticate_if_required(&self) {
        if self.store.config().auth_required() {
            self.auth.refresh(&self.store).await;
        }
    }
}

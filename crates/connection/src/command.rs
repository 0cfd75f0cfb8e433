//! App command dispatch.
//!
//! Commands are fire-and-forget: nothing here returns an error to the
//! caller. A 401 drops the stored token so the status turns into
//! `ConnectionFailure` until the next handshake succeeds.

use percent_encoding::{NON_ALPHANUMERIC, utf8_percent_encode};
use proclaim_protocol::constants::{
    APP_COMMAND_PATH, AUTH_TOKEN_HEADER, COMMAND_INDEX_PARAM, COMMAND_NAME_PARAM,
    COMMAND_SUCCESS_BODY, CONTROL_PORT, REQUEST_TIMEOUT,
};
use proclaim_protocol::strip_bom;
use tracing::{debug, info};

use crate::error::ControlError;
use crate::state::StateStore;
use crate::wire::{self, Request};

/// Sends app commands to Proclaim.
#[derive(Debug, Clone)]
pub struct CommandDispatcher {
    port: u16,
}

impl Default for CommandDispatcher {
    fn default() -> Self {
        Self::new()
    }
}

impl CommandDispatcher {
    pub fn new() -> Self {
        Self { port: CONTROL_PORT }
    }

    /// Overrides the control port (for testing).
    #[cfg(test)]
    pub(crate) fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Sends `name` with an optional numeric argument. Best effort.
    pub async fn send_command(&self, store: &StateStore, name: &str, index: Option<u32>) {
        let (config, state) = store.read();
        if !config.has_host() {
            debug!(command = %name, "no host configured, dropping command");
            return;
        }

        let token = if state.auth_required {
            if !state.auth_succeeded {
                debug!(command = %name, "not authenticated, dropping command");
                return;
            }
            Some(state.auth_token)
        } else {
            None
        };

        match self.perform(&config.host, name, index, token).await {
            Ok(()) => {}
            Err(ControlError::AuthRejected) => {
                info!(command = %name, "Proclaim rejected the auth token");
                store.invalidate_auth();
            }
            Err(e) => {
                debug!(command = %name, error = %e, "command failed");
            }
        }
    }

    async fn perform(
        &self,
        host: &str,
        name: &str,
        index: Option<u32>,
        token: Option<String>,
    ) -> Result<(), ControlError> {
        let mut headers = Vec::new();
        if let Some(token) = token {
            headers.push((AUTH_TOKEN_HEADER, token));
        }
        let req = Request {
            method: "GET",
            target: command_target(name, index),
            headers,
        };

        let resp = wire::send(host, self.port, &req, REQUEST_TIMEOUT).await?;
        if resp.status == 401 {
            return Err(ControlError::AuthRejected);
        }
        if !resp.is_success() {
            return Err(ControlError::CommandRejected {
                status: resp.status,
            });
        }

        let body = strip_bom(&resp.body);
        if body != COMMAND_SUCCESS_BODY {
            debug!(command = %name, body = %body, "unexpected response from Proclaim");
        }
        Ok(())
    }
}

/// Builds `/appCommand/perform?appCommandName=...[&index=...]`.
fn command_target(name: &str, index: Option<u32>) -> String {
    let name = utf8_percent_encode(name, NON_ALPHANUMERIC);
    let mut target = format!("{APP_COMMAND_PATH}?{COMMAND_NAME_PARAM}={name}");
    if let Some(index) = index {
        target.push_str(&format!("&{COMMAND_INDEX_PARAM}={index}"));
    }
    target
}

//! Authentication handshake.
//!
//! Posts the configured password and extracts the token Proclaim hands back.
//! Proclaim answers with `text/html` and a byte order mark in front of the
//! JSON, so the body is read as text and decoded by hand.

use proclaim_protocol::constants::{AUTHENTICATE_PATH, CONTROL_PORT, base_url};
use proclaim_protocol::{AuthenticateRequest, AuthenticateResponse};
use reqwest::StatusCode;
use tracing::{debug, info};

use crate::error::ControlError;
use crate::state::StateStore;

/// Client for `POST /appCommand/authenticate`.
#[derive(Clone)]
pub struct AuthClient {
    http: reqwest::Client,
    port: u16,
}

impl AuthClient {
    pub fn new(http: reqwest::Client) -> Self {
        Self {
            http,
            port: CONTROL_PORT,
        }
    }

    /// Overrides the control port (for testing).
    #[cfg(test)]
    pub(crate) fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Performs the handshake and returns the token.
    pub async fn authenticate(&self, host: &str, password: &str) -> Result<String, ControlError> {
        let url = format!("{}{AUTHENTICATE_PATH}", base_url(host, self.port));
        let req = AuthenticateRequest {
            password: password.to_string(),
        };
        let resp = self.http.post(&url).json(&req).send().await?;
        let status = resp.status();

        if status == StatusCode::UNAUTHORIZED {
            return Err(ControlError::AuthRejected);
        }
        if !status.is_success() {
            return Err(ControlError::Http {
                status: status.as_u16(),
            });
        }

        let body = resp.text().await?;
        Ok(AuthenticateResponse::parse(&body)?)
    }

    /// Authenticates with the configured credentials and records the outcome.
    ///
    /// Does nothing when no host is configured. The outcome is dropped if the
    /// credentials were replaced while the request was in flight.
    pub async fn refresh(&self, store: &StateStore) {
        let ticket = store.begin_auth();
        let config = &ticket.config;
        if !config.has_host() {
            return;
        }

        debug!(host = %config.host, "requesting auth token");
        let result = self.authenticate(&config.host, &config.password).await;
        if result.is_ok() {
            info!(host = %config.host, "authenticated with Proclaim");
        }
        store.apply_auth(&ticket, result);
    }
}

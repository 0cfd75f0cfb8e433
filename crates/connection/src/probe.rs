//! On-air status probe.
//!
//! Async HTTP client using `reqwest`. One GET per probe, bounded by the
//! request timeout, never retried.

use proclaim_protocol::constants::{
    CONTROL_PORT, ONAIR_SESSION_PATH, REQUEST_TIMEOUT, base_url, is_session_id,
};
use tracing::{debug, trace};

use crate::error::ControlError;
use crate::types::ProbeResult;

/// Builds the `reqwest` client shared by the probe and auth paths.
///
/// Proclaim lives on the local network, so system proxies are bypassed.
pub(crate) fn build_http_client() -> Result<reqwest::Client, ControlError> {
    reqwest::Client::builder()
        .timeout(REQUEST_TIMEOUT)
        .no_proxy()
        .build()
        .map_err(|e| ControlError::Protocol(format!("failed to build HTTP client: {e}")))
}

/// Client for `GET /onair/session`.
#[derive(Clone)]
pub struct StatusClient {
    http: reqwest::Client,
    port: u16,
}

impl StatusClient {
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

    /// Probes `host` once and classifies the answer.
    pub async fn probe(&self, host: &str) -> ProbeResult {
        match self.fetch(host).await {
            Ok(body) if is_session_id(&body) => {
                trace!(%host, "on air");
                ProbeResult::OnAir { session_id: body }
            }
            Ok(_) => ProbeResult::OffAir,
            Err(e) => {
                debug!(%host, error = %e, "on-air probe failed");
                ProbeResult::Unreachable
            }
        }
    }

    async fn fetch(&self, host: &str) -> Result<String, ControlError> {
        let url = format!("{}{ONAIR_SESSION_PATH}", base_url(host, self.port));
        let resp = self.http.get(&url).send().await?;
        let status = resp.status();
        if !status.is_success() {
            return Err(ControlError::Http {
                status: status.as_u16(),
            });
        }
        Ok(resp.text().await?)
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::test_support::{LOCAL_HOST, MockProclaim, closed_port};

    fn client(port: u16) -> StatusClient {
        StatusClient::new(build_http_client().unwrap()).with_port(port)
    }

    #[tokio::test]
    async fn long_body_is_on_air() {
        let mock = MockProclaim::start(LOCAL_HOST).await;
        let id = "0123456789abcdef0123456789abcdef01234567";
        mock.route(ONAIR_SESSION_PATH, 200, id);

        let result = client(mock.port).probe(LOCAL_HOST).await;
        assert_eq!(
            result,
            ProbeResult::OnAir {
                session_id: id.into()
            }
        );
        assert_eq!(mock.count(ONAIR_SESSION_PATH), 1);
    }

    #[tokio::test]
    async fn short_or_empty_body_is_off_air() {
        let mock = MockProclaim::start(LOCAL_HOST).await;
        let c = client(mock.port);

        for body in ["", "\"\"", &"z".repeat(30)] {
            mock.route(ONAIR_SESSION_PATH, 200, body);
            assert_eq!(c.probe(LOCAL_HOST).await, ProbeResult::OffAir, "body {body:?}");
        }
    }

    #[tokio::test]
    async fn refused_connection_is_unreachable() {
        let port = closed_port(LOCAL_HOST).await;
        assert_eq!(client(port).probe(LOCAL_HOST).await, ProbeResult::Unreachable);
    }

    #[tokio::test]
    async fn error_status_is_unreachable() {
        let mock = MockProclaim::start(LOCAL_HOST).await;
        mock.route(ONAIR_SESSION_PATH, 500, "boom");
        assert_eq!(
            client(mock.port).probe(LOCAL_HOST).await,
            ProbeResult::Unreachable
        );
    }

    #[tokio::test]
    async fn slow_response_times_out() {
        let mock = MockProclaim::start(LOCAL_HOST).await;
        mock.route_delayed(
            ONAIR_SESSION_PATH,
            200,
            &"s".repeat(40),
            Duration::from_millis(1500),
        );

        let started = std::time::Instant::now();
        let result = client(mock.port).probe(LOCAL_HOST).await;
        assert_eq!(result, ProbeResult::Unreachable);
        assert!(started.elapsed() < Duration::from_millis(1400));
    }
}

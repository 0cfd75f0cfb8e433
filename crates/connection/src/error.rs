//! Error taxonomy for requests against the control API.
//!
//! None of these escape the crate's public operations: each component
//! matches on them and turns them into state changes or log lines.

use proclaim_protocol::MessageError;

/// Errors from a single request to Proclaim.
#[derive(Debug, thiserror::Error)]
pub enum ControlError {
    /// Connection refused, reset, or timed out.
    #[error("unreachable: {0}")]
    Unreachable(String),

    /// Proclaim answered 401.
    #[error("authentication rejected")]
    AuthRejected,

    /// Authentication response was not JSON or carried no token.
    #[error("malformed auth response: {0}")]
    AuthMalformedResponse(#[from] MessageError),

    /// A command got a non-success, non-401 status.
    #[error("command rejected with HTTP {status}")]
    CommandRejected { status: u16 },

    /// Any other non-success status.
    #[error("HTTP {status}")]
    Http { status: u16 },

    /// The response could not be parsed as HTTP/1.1.
    #[error("protocol error: {0}")]
    Protocol(String),
}

impl From<reqwest::Error> for ControlError {
    fn from(e: reqwest::Error) -> Self {
        match e.status() {
            Some(status) if status == reqwest::StatusCode::UNAUTHORIZED => Self::AuthRejected,
            Some(status) => Self::Http {
                status: status.as_u16(),
            },
            None => Self::Unreachable(e.to_string()),
        }
    }
}

impl From<std::io::Error> for ControlError {
    fn from(e: std::io::Error) -> Self {
        Self::Unreachable(e.to_string())
    }
}

impl ControlError {
    /// Returns true for the 401 case on any request path.
    pub fn is_auth_rejected(&self) -> bool {
        matches!(self, Self::AuthRejected)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn io_errors_are_unreachable() {
        let err: ControlError =
            std::io::Error::new(std::io::ErrorKind::ConnectionRefused, "refused").into();
        assert!(matches!(err, ControlError::Unreachable(_)));
        assert!(!err.is_auth_rejected());
    }

    #[test]
    fn display_mentions_status() {
        let err = ControlError::CommandRejected { status: 503 };
        assert!(err.to_string().contains("503"));
    }
}

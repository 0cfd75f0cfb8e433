//! JSON payloads of the authentication handshake and response text helpers.

use serde::{Deserialize, Serialize};

/// Byte order mark Proclaim prefixes to some response bodies.
const BOM: char = '\u{FEFF}';

/// Errors decoding a Proclaim response body.
#[derive(Debug, thiserror::Error)]
pub enum MessageError {
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("response carries no auth token")]
    MissingToken,
}

/// Body of `POST /appCommand/authenticate`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthenticateRequest {
    #[serde(rename = "Password")]
    pub password: String,
}

/// Response of the authentication handshake.
///
/// Proclaim names the field `proclaimAuthToken`; the shorter `authToken`
/// spelling is accepted as well.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthenticateResponse {
    #[serde(rename = "proclaimAuthToken", alias = "authToken", default)]
    pub token: Option<String>,
}

impl AuthenticateResponse {
    /// Parses a raw response body, stripping a leading BOM first.
    ///
    /// A missing, null, or empty token is an error.
    pub fn parse(body: &str) -> Result<String, MessageError> {
        let resp: AuthenticateResponse = serde_json::from_str(strip_bom(body))?;
        match resp.token {
            Some(token) if !token.is_empty() => Ok(token),
            _ => Err(MessageError::MissingToken),
        }
    }
}

/// Removes a single leading byte order mark, if present.
pub fn strip_bom(body: &str) -> &str {
    body.strip_prefix(BOM).unwrap_or(body)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn authenticate_request_uses_capitalized_field() {
        let req = AuthenticateRequest {
            password: "hunter2".into(),
        };
        let json = serde_json::to_string(&req).unwrap();
        assert_eq!(json, r#"{"Password":"hunter2"}"#);
    }

    #[test]
    fn strip_bom_removes_single_prefix() {
        assert_eq!(strip_bom("\u{FEFF}success"), "success");
        assert_eq!(strip_bom("success"), "success");
        assert_eq!(strip_bom(""), "");
        // Only one leading mark is an encoding artifact.
        assert_eq!(strip_bom("\u{FEFF}\u{FEFF}x"), "\u{FEFF}x");
    }

    #[test]
    fn parse_bom_prefixed_auth_token() {
        let token = AuthenticateResponse::parse("\u{FEFF}{\"authToken\":\"abc123\"}").unwrap();
        assert_eq!(token, "abc123");
    }

    #[test]
    fn parse_proclaim_field_name() {
        let token =
            AuthenticateResponse::parse("\u{FEFF}{\"proclaimAuthToken\":\"tok-9\"}").unwrap();
        assert_eq!(token, "tok-9");
    }

    #[test]
    fn parse_missing_token_fails() {
        let err = AuthenticateResponse::parse("{\"other\":1}").unwrap_err();
        assert!(matches!(err, MessageError::MissingToken));

        let err = AuthenticateResponse::parse("{\"proclaimAuthToken\":\"\"}").unwrap_err();
        assert!(matches!(err, MessageError::MissingToken));
    }

    #[test]
    fn parse_non_json_fails() {
        let err = AuthenticateResponse::parse("<html>nope</html>").unwrap_err();
        assert!(matches!(err, MessageError::Json(_)));
    }
}

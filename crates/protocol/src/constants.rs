use std::time::Duration;

/// TCP port the Proclaim remote control API listens on.
pub const CONTROL_PORT: u16 = 52195;

/// Path of the on-air session probe.
pub const ONAIR_SESSION_PATH: &str = "/onair/session";

/// Path of the app command endpoint.
pub const APP_COMMAND_PATH: &str = "/appCommand/perform";

/// Path of the authentication handshake.
pub const AUTHENTICATE_PATH: &str = "/appCommand/authenticate";

/// Query parameter carrying the command name.
pub const COMMAND_NAME_PARAM: &str = "appCommandName";

/// Query parameter carrying the optional numeric command argument.
pub const COMMAND_INDEX_PARAM: &str = "index";

/// Header carrying the auth token on command requests.
///
/// Proclaim matches this name case-sensitively, so it must reach the wire
/// spelled exactly like this.
pub const AUTH_TOKEN_HEADER: &str = "ProclaimAuthToken";

/// Body Proclaim returns when a command was accepted.
pub const COMMAND_SUCCESS_BODY: &str = "success";

/// Host for which Proclaim does not require authentication.
pub const LOOPBACK_HOST: &str = "127.0.0.1";

/// Session ids longer than this mean Proclaim is on air.
pub const SESSION_ID_MIN_LEN: usize = 30;

/// Timeout applied to every request (probe, auth, command).
pub const REQUEST_TIMEOUT: Duration = Duration::from_millis(1000);

/// Interval between on-air probes.
pub const POLL_INTERVAL: Duration = Duration::from_millis(1000);

/// Well-known command names used outside the external command catalog.
pub const CMD_GO_ON_AIR: &str = "GoOnAir";
pub const CMD_GO_OFF_AIR: &str = "GoOffAir";

/// Returns true when commands to `host` must carry an auth token.
pub fn auth_required(host: &str) -> bool {
    host != LOOPBACK_HOST
}

/// Returns true when a probe body is an on-air session id.
///
/// Length is counted in UTF-16 code units, the unit Proclaim's own clients
/// measure in.
pub fn is_session_id(body: &str) -> bool {
    body.encode_utf16().count() > SESSION_ID_MIN_LEN
}

/// Builds the base URL (`http://host:port`) for a configured host.
pub fn base_url(host: &str, port: u16) -> String {
    format!("http://{host}:{port}")
}

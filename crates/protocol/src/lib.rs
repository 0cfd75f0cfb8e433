//! Wire protocol for the Proclaim local-network control API.
//!
//! Holds the fixed endpoint constants, the JSON shapes used by the
//! authentication handshake, and the small text helpers shared by every
//! request path. No I/O lives here.

pub mod constants;
pub mod messages;

// Re-export primary types for convenience.
pub use constants::{
    AUTH_TOKEN_HEADER, CONTROL_PORT, LOOPBACK_HOST, auth_required, is_session_id,
};
pub use messages::{AuthenticateRequest, AuthenticateResponse, MessageError, strip_bom};

//! RPC service definitions for CLI ↔ session daemon communication.
//!
//! This module defines the tarpc service the daemon exposes over its Unix
//! socket, plus the types that cross the wire:
//! - Session bookkeeping: `is_initialised`, `new_session_id`, `add_session`,
//!   `remove_session`
//! - The registered API client: auth updates and instance REST calls

pub mod daemon_service;

use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};

pub use crate::api::types::{Account, AuthInfo, Status, StatusDraft, Visibility};

/// Deadline used for every client call.
///
/// The transport imposes no per-call timeout of its own: a stalled call
/// holds its handler until the daemon exits.
const CALL_DEADLINE: Duration = Duration::from_secs(365 * 24 * 60 * 60);

/// Builds the tarpc context for a client call.
pub fn call_context() -> tarpc::context::Context {
    let mut ctx = tarpc::context::current();
    ctx.deadline = Instant::now() + CALL_DEADLINE;
    ctx
}

// ============================================================================
// SESSION IDENTIFIERS
// ============================================================================

/// Number of random bytes in a session identifier.
pub const SESSION_ID_LEN: usize = 16;

/// Opaque random identifier for one CLI invocation attached to the daemon.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(Vec<u8>);

impl SessionId {
    /// Mints a fresh random identifier.
    pub fn generate() -> Self {
        let bytes: [u8; SESSION_ID_LEN] = rand::random();
        Self(bytes.to_vec())
    }

    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", crate::paths::hex_encode(&self.0))
    }
}

// ============================================================================
// DAEMON METADATA
// ============================================================================

/// Identity and mode of a running daemon.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DaemonInfo {
    pub pid: u32,
    pub version: String,
    pub build_sha: String,
    /// Start time (RFC3339)
    pub started_at: String,
    /// `None` when the daemon runs without an idle timeout
    pub idle_timeout_secs: Option<u64>,
    pub socket_path: String,
}

// ============================================================================
// ERROR TYPES
// ============================================================================

/// Errors returned by daemon RPC methods.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ServiceError {
    /// The session registry is inactive (daemon runs without idle timeout)
    NotInitialised,
    /// The session ID is already registered
    SessionIdExists { session_id: String },
    /// No instance URL or access token has been configured
    NotAuthenticated,
    /// The instance answered with a non-success status
    Http { status: u16 },
    /// The request never produced a response
    Transport { message: String },
    /// The response body could not be decoded
    Decode { message: String },
    /// Reading or writing local state failed
    Io { message: String },
}

impl std::fmt::Display for ServiceError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ServiceError::NotInitialised => write!(f, "Session registry is not initialised"),
            ServiceError::SessionIdExists { session_id } => {
                write!(f, "Session ID exists: {}", session_id)
            }
            ServiceError::NotAuthenticated => {
                write!(f, "Not logged in: no instance or access token configured")
            }
            ServiceError::Http { status } => write!(f, "Instance returned HTTP {}", status),
            ServiceError::Transport { message } => write!(f, "Request failed: {}", message),
            ServiceError::Decode { message } => {
                write!(f, "Failed to decode response: {}", message)
            }
            ServiceError::Io { message } => write!(f, "I/O error: {}", message),
        }
    }
}

impl std::error::Error for ServiceError {}

/// Result type for daemon operations.
pub type ServiceResult<T> = Result<T, ServiceError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generated_session_ids_differ() {
        let a = SessionId::generate();
        let b = SessionId::generate();
        assert_ne!(a, b);
        assert_eq!(a.as_bytes().len(), SESSION_ID_LEN);
    }

    #[test]
    fn test_session_id_displays_as_hex() {
        let id = SessionId::from_bytes(vec![0xde, 0xad, 0xbe, 0xef]);
        assert_eq!(id.to_string(), "deadbeef");
    }

    #[test]
    fn test_service_error_messages() {
        assert_eq!(
            ServiceError::NotInitialised.to_string(),
            "Session registry is not initialised"
        );
        let exists = ServiceError::SessionIdExists {
            session_id: "ab".to_string(),
        };
        assert_eq!(exists.to_string(), "Session ID exists: ab");
        assert_eq!(
            ServiceError::Http { status: 401 }.to_string(),
            "Instance returned HTTP 401"
        );
    }

    #[test]
    fn test_call_context_has_distant_deadline() {
        let ctx = call_context();
        assert!(ctx.deadline > Instant::now() + Duration::from_secs(60 * 60));
    }
}

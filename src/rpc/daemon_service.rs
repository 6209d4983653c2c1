//! Daemon service definition for CLI ↔ daemon RPC.
//!
//! The `#[tarpc::service]` macro turns this trait into `DaemonServiceRequest`
//! and `DaemonServiceResponse` enums; those tags are what travels over the
//! socket.

use crate::rpc::{
    Account, AuthInfo, DaemonInfo, ServiceResult, SessionId, Status, StatusDraft,
};

/// Service exposed by the session daemon to CLI invocations.
#[tarpc::service]
pub trait DaemonService {
    /// Whether the daemon tracks sessions (idle-timeout mode).
    async fn is_initialised() -> bool;

    /// Mint a session ID not currently registered. Does not register it.
    async fn new_session_id() -> SessionId;

    /// Register a session ID with the daemon.
    async fn add_session(id: SessionId) -> ServiceResult<()>;

    /// Release a session ID. Unknown IDs are ignored.
    async fn remove_session(id: SessionId) -> ServiceResult<()>;

    /// Daemon pid, version and run mode.
    async fn daemon_info() -> DaemonInfo;

    /// Current instance and account, without the token.
    async fn auth_info() -> AuthInfo;

    /// Replace the instance URL and access token. Clears the account ID.
    async fn update_authentication(instance: String, access_token: String) -> ServiceResult<()>;

    /// Set the current account ID.
    async fn update_current_account_id(account_id: String) -> ServiceResult<()>;

    /// Fetch the account the access token belongs to.
    async fn verify_credentials() -> ServiceResult<Account>;

    /// Fetch an account by ID.
    async fn get_account(account_id: String) -> ServiceResult<Account>;

    /// Publish a status.
    async fn create_status(draft: StatusDraft) -> ServiceResult<Status>;
}

//! RPC server implementation for the session daemon.
//!
//! Implements the tarpc `DaemonService` trait. One `DaemonServer` is cloned
//! into every connection; all clones share the registry and the API client.

use crate::api::ApiClient;
use crate::rpc::daemon_service::DaemonService;
use crate::rpc::{
    Account, AuthInfo, DaemonInfo, ServiceResult, SessionId, Status, StatusDraft,
};
use crate::session_daemon::registry::SessionRegistry;
use std::sync::Arc;

/// Build identity baked in by build.rs.
pub const BUILD_SHA: &str = env!("FEDI_GIT_SHA");

/// Server implementation for DaemonService.
#[derive(Clone)]
pub struct DaemonServer {
    api: Arc<ApiClient>,
    registry: Arc<SessionRegistry>,
    info: Arc<DaemonInfo>,
}

impl DaemonServer {
    pub fn new(api: Arc<ApiClient>, registry: Arc<SessionRegistry>, info: DaemonInfo) -> Self {
        Self {
            api,
            registry,
            info: Arc::new(info),
        }
    }
}

impl DaemonService for DaemonServer {
    async fn is_initialised(self, _: tarpc::context::Context) -> bool {
        self.registry.is_initialised()
    }

    async fn new_session_id(self, _: tarpc::context::Context) -> SessionId {
        self.registry.mint_session_id()
    }

    async fn add_session(self, _: tarpc::context::Context, id: SessionId) -> ServiceResult<()> {
        self.registry.add(id)
    }

    async fn remove_session(
        self,
        _: tarpc::context::Context,
        id: SessionId,
    ) -> ServiceResult<()> {
        self.registry.remove(&id)
    }

    async fn daemon_info(self, _: tarpc::context::Context) -> DaemonInfo {
        (*self.info).clone()
    }

    async fn auth_info(self, _: tarpc::context::Context) -> AuthInfo {
        self.api.auth_info().await
    }

    async fn update_authentication(
        self,
        _: tarpc::context::Context,
        instance: String,
        access_token: String,
    ) -> ServiceResult<()> {
        self.api.update_authentication(instance, access_token).await
    }

    async fn update_current_account_id(
        self,
        _: tarpc::context::Context,
        account_id: String,
    ) -> ServiceResult<()> {
        self.api.update_current_account_id(account_id).await
    }

    async fn verify_credentials(self, _: tarpc::context::Context) -> ServiceResult<Account> {
        self.api.verify_credentials().await
    }

    async fn get_account(
        self,
        _: tarpc::context::Context,
        account_id: String,
    ) -> ServiceResult<Account> {
        self.api.get_account(account_id).await
    }

    async fn create_status(
        self,
        _: tarpc::context::Context,
        draft: StatusDraft,
    ) -> ServiceResult<Status> {
        self.api.create_status(draft).await
    }
}

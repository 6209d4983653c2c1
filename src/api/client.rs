//! The API client the daemon serves: login state plus instance REST calls.

use super::credentials::Credentials;
use super::types::{Account, AuthInfo, Status, StatusDraft};
use crate::daemon_log::daemon_log;
use crate::rpc::{ServiceError, ServiceResult};
use serde::de::DeserializeOwned;
use std::path::PathBuf;
use std::time::Duration;
use tokio::sync::RwLock;

/// Mutable login state. Written only by the two `update_*` operations.
#[derive(Debug, Clone, Default)]
struct AuthState {
    instance: Option<String>,
    access_token: Option<String>,
    account_id: Option<String>,
}

impl From<Credentials> for AuthState {
    fn from(credentials: Credentials) -> Self {
        Self {
            instance: credentials.instance,
            access_token: credentials.access_token,
            account_id: credentials.account_id,
        }
    }
}

impl AuthState {
    fn to_credentials(&self) -> Credentials {
        Credentials {
            instance: self.instance.clone(),
            access_token: self.access_token.clone(),
            account_id: self.account_id.clone(),
        }
    }
}

/// Long-lived instance client shared by every daemon connection.
///
/// Many handlers read the auth state concurrently; login and account
/// switches take the write lock.
pub struct ApiClient {
    auth: RwLock<AuthState>,
    agent: ureq::Agent,
    /// Where auth updates are written through to, if anywhere.
    credentials_path: Option<PathBuf>,
}

impl ApiClient {
    pub fn new(credentials: Credentials, timeout: Duration) -> Self {
        let agent: ureq::Agent = ureq::Agent::config_builder()
            .timeout_global(Some(timeout))
            .build()
            .into();

        Self {
            auth: RwLock::new(AuthState::from(credentials)),
            agent,
            credentials_path: None,
        }
    }

    pub fn with_credentials_path(mut self, path: PathBuf) -> Self {
        self.credentials_path = Some(path);
        self
    }

    pub async fn auth_info(&self) -> AuthInfo {
        let auth = self.auth.read().await;
        AuthInfo {
            instance: auth.instance.clone(),
            account_id: auth.account_id.clone(),
            has_token: auth.access_token.is_some(),
        }
    }

    pub async fn update_authentication(
        &self,
        instance: String,
        access_token: String,
    ) -> ServiceResult<()> {
        let instance = normalize_instance(&instance);
        let mut auth = self.auth.write().await;
        let next = AuthState {
            instance: Some(instance.clone()),
            access_token: Some(access_token),
            account_id: None,
        };
        self.persist(&next)?;
        *auth = next;
        daemon_log("api", &format!("Authentication updated for {}", instance));
        Ok(())
    }

    pub async fn update_current_account_id(&self, account_id: String) -> ServiceResult<()> {
        let mut auth = self.auth.write().await;
        let next = AuthState {
            account_id: Some(account_id),
            ..auth.clone()
        };
        self.persist(&next)?;
        *auth = next;
        Ok(())
    }

    pub async fn verify_credentials(&self) -> ServiceResult<Account> {
        self.get_json("/api/v1/accounts/verify_credentials".to_string())
            .await
    }

    pub async fn get_account(&self, account_id: String) -> ServiceResult<Account> {
        self.get_json(format!(
            "/api/v1/accounts/{}",
            urlencoding::encode(&account_id)
        ))
            .await
    }

    pub async fn create_status(&self, draft: StatusDraft) -> ServiceResult<Status> {
        let body = serde_json::to_string(&draft.to_request_body()).map_err(|e| {
            ServiceError::Decode {
                message: e.to_string(),
            }
        })?;
        self.send_json("/api/v1/statuses".to_string(), Some(body))
            .await
    }

    async fn get_json<T>(&self, path: String) -> ServiceResult<T>
    where
        T: DeserializeOwned + Send + 'static,
    {
        self.send_json(path, None).await
    }

    /// Runs one authorized request on the blocking pool.
    async fn send_json<T>(&self, path: String, body: Option<String>) -> ServiceResult<T>
    where
        T: DeserializeOwned + Send + 'static,
    {
        let (instance, token) = self.authorized().await?;
        let agent = self.agent.clone();

        tokio::task::spawn_blocking(move || request_json(&agent, &instance, &token, &path, body))
            .await
            .map_err(|e| ServiceError::Transport {
                message: format!("Request task failed: {}", e),
            })?
    }

    /// Snapshot of instance and token, released before any network I/O.
    async fn authorized(&self) -> ServiceResult<(String, String)> {
        let auth = self.auth.read().await;
        match (&auth.instance, &auth.access_token) {
            (Some(instance), Some(token)) => Ok((instance.clone(), token.clone())),
            _ => Err(ServiceError::NotAuthenticated),
        }
    }

    /// Writes `auth` through to disk. Callers install it only on success.
    fn persist(&self, auth: &AuthState) -> ServiceResult<()> {
        let Some(path) = &self.credentials_path else {
            return Ok(());
        };
        auth.to_credentials()
            .save(path)
            .map_err(|e| ServiceError::Io {
                message: format!("{:#}", e),
            })
    }
}

/// Adds `https://` when no scheme is given and drops trailing slashes.
fn normalize_instance(instance: &str) -> String {
    let trimmed = instance.trim().trim_end_matches('/');
    if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
        trimmed.to_string()
    } else {
        format!("https://{}", trimmed)
    }
}

fn request_json<T: DeserializeOwned>(
    agent: &ureq::Agent,
    instance: &str,
    token: &str,
    path: &str,
    body: Option<String>,
) -> ServiceResult<T> {
    let url = format!("{}{}", instance, path);
    let authorization = format!("Bearer {}", token);

    let result = match body {
        None => agent
            .get(&url)
            .header("Authorization", &authorization)
            .call(),
        Some(body) => agent
            .post(&url)
            .header("Authorization", &authorization)
            .header("Content-Type", "application/json")
            .send(&body),
    };

    let text = result
        .map_err(map_http_error)?
        .body_mut()
        .read_to_string()
        .map_err(map_http_error)?;

    serde_json::from_str(&text).map_err(|e| ServiceError::Decode {
        message: e.to_string(),
    })
}

fn map_http_error(err: ureq::Error) -> ServiceError {
    match err {
        ureq::Error::StatusCode(status) => ServiceError::Http { status },
        other => ServiceError::Transport {
            message: other.to_string(),
        },
    }
}

#[cfg(test)]
#[path = "tests/client_tests.rs"]
mod tests;

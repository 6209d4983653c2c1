//! CLI commands that run against an attached daemon.

use crate::rpc::daemon_service::DaemonServiceClient;
use crate::rpc::{call_context, Account, DaemonInfo, Status, StatusDraft};
use anyhow::{Context, Result};

/// Stores credentials in the daemon, checks them, and records the account.
pub async fn login(
    client: &DaemonServiceClient,
    instance: String,
    token: String,
) -> Result<Account> {
    client
        .update_authentication(call_context(), instance, token)
        .await
        .context("update_authentication RPC failed")??;

    let account = client
        .verify_credentials(call_context())
        .await
        .context("verify_credentials RPC failed")?
        .context("Instance rejected the access token")?;

    client
        .update_current_account_id(call_context(), account.id.clone())
        .await
        .context("update_current_account_id RPC failed")??;

    Ok(account)
}

pub async fn whoami(client: &DaemonServiceClient) -> Result<Account> {
    let account = client
        .verify_credentials(call_context())
        .await
        .context("verify_credentials RPC failed")??;
    Ok(account)
}

pub async fn show_account(client: &DaemonServiceClient, account_id: String) -> Result<Account> {
    let account = client
        .get_account(call_context(), account_id)
        .await
        .context("get_account RPC failed")??;
    Ok(account)
}

pub async fn post(client: &DaemonServiceClient, draft: StatusDraft) -> Result<Status> {
    let status = client
        .create_status(call_context(), draft)
        .await
        .context("create_status RPC failed")??;
    Ok(status)
}

pub fn format_account(account: &Account) -> String {
    let mut out = format!("@{} ({})\n", account.acct, account.id);
    if !account.display_name.is_empty() {
        out.push_str(&format!("  name:      {}\n", account.display_name));
    }
    out.push_str(&format!("  url:       {}\n", account.url));
    out.push_str(&format!(
        "  posts:     {}\n  following: {}\n  followers: {}",
        account.statuses_count, account.following_count, account.followers_count
    ));
    out
}

pub fn format_status(status: &Status) -> String {
    match &status.url {
        Some(url) => format!("Posted {} ({}): {}", status.id, status.visibility, url),
        None => format!("Posted {} ({})", status.id, status.visibility),
    }
}

pub fn format_daemon_info(info: &DaemonInfo) -> String {
    let idle = match info.idle_timeout_secs {
        Some(secs) => format!("{}s", secs),
        None => "disabled".to_string(),
    };
    format!(
        "pid:          {}\nversion:      {} ({})\nstarted:      {}\nidle timeout: {}\nsocket:       {}",
        info.pid, info.version, info.build_sha, info.started_at, idle, info.socket_path
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{ApiClient, Credentials};
    use crate::rpc::ServiceError;
    use crate::session_daemon::bootstrap::connect;
    use crate::session_daemon::{Daemon, RunMode};
    use std::sync::Arc;
    use std::time::Duration;
    use tempfile::TempDir;

    fn account() -> Account {
        Account {
            id: "109".to_string(),
            username: "alice".to_string(),
            acct: "alice".to_string(),
            display_name: "Alice".to_string(),
            url: "https://example.social/@alice".to_string(),
            followers_count: 3,
            following_count: 2,
            statuses_count: 1,
        }
    }

    #[test]
    fn test_format_account() {
        let out = format_account(&account());
        assert!(out.starts_with("@alice (109)"));
        assert!(out.contains("name:      Alice"));
        assert!(out.contains("followers: 3"));
    }

    #[test]
    fn test_format_daemon_info_without_idle_timeout() {
        let info = DaemonInfo {
            pid: 42,
            version: "0.1.0".to_string(),
            build_sha: "abc".to_string(),
            started_at: "2026-01-01T00:00:00Z".to_string(),
            idle_timeout_secs: None,
            socket_path: "/tmp/x.socket".to_string(),
        };
        let out = format_daemon_info(&info);
        assert!(out.contains("idle timeout: disabled"));
        assert!(out.contains("pid:          42"));
    }

    #[tokio::test]
    async fn test_commands_require_login() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("server.test.socket");
        let api = Arc::new(ApiClient::new(
            Credentials::default(),
            Duration::from_secs(5),
        ));
        let daemon = Daemon::bind(&path, api, RunMode::NoIdleTimeout)
            .await
            .unwrap();
        tokio::spawn(daemon.run(std::future::pending()));

        let client = connect(&path).await.unwrap();
        let err = whoami(&client).await.unwrap_err();
        assert_eq!(
            err.downcast_ref::<ServiceError>(),
            Some(&ServiceError::NotAuthenticated)
        );

        let err = post(&client, StatusDraft::new("hello")).await.unwrap_err();
        assert_eq!(
            err.downcast_ref::<ServiceError>(),
            Some(&ServiceError::NotAuthenticated)
        );
    }
}

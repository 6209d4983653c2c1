//! Connect-or-spawn client bootstrap for the session daemon.
//!
//! There is no lock around spawning. When several cold invocations race,
//! each may start a daemon; the first bind wins, the others exit with
//! "socket already in use", and every client's retry loop ends up on the
//! winner.

use crate::daemon_log::daemon_log;
use crate::paths;
use crate::rpc::daemon_service::DaemonServiceClient;
use crate::rpc::{call_context, SessionId};
use crate::session_daemon::server::BUILD_SHA;
use crate::session_daemon::session::Session;
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;
use tarpc::client;
use tarpc::tokio_serde::formats::Bincode;
use tokio::net::UnixStream;
use tokio_util::codec::LengthDelimitedCodec;

/// Connection attempts after spawning a daemon.
const SPAWN_CONNECT_ATTEMPTS: u32 = 3;

/// Fixed delay before each post-spawn attempt (milliseconds).
const SPAWN_CONNECT_DELAY_MS: u64 = 100;

/// How long to keep trying after spawning a daemon.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub attempts: u32,
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempts: SPAWN_CONNECT_ATTEMPTS,
            delay: Duration::from_millis(SPAWN_CONNECT_DELAY_MS),
        }
    }
}

/// Starts a daemon without waiting for it.
pub trait DaemonSpawner {
    fn spawn_daemon(&self) -> Result<()>;
}

/// Re-executes the running binary as `fedi --config-dir <dir> daemon`.
pub struct ProcessSpawner {
    exe: PathBuf,
    config_dir: PathBuf,
}

impl ProcessSpawner {
    pub fn new(exe: PathBuf, config_dir: PathBuf) -> Self {
        Self { exe, config_dir }
    }

    /// Spawner for the currently running executable.
    pub fn current(config_dir: &Path) -> Result<Self> {
        let exe = std::env::current_exe()
            .or_else(|_| which::which("fedi"))
            .context("Failed to find fedi binary")?;
        Ok(Self::new(exe, config_dir.to_path_buf()))
    }
}

impl DaemonSpawner for ProcessSpawner {
    fn spawn_daemon(&self) -> Result<()> {
        use std::os::unix::process::CommandExt;

        daemon_log(
            "bootstrap",
            &format!("Spawning daemon: {} daemon", self.exe.display()),
        );

        // Own process group: a Ctrl-C aimed at the CLI must not reach the daemon.
        std::process::Command::new(&self.exe)
            .arg("--config-dir")
            .arg(&self.config_dir)
            .arg("daemon")
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .process_group(0)
            .spawn()
            .with_context(|| format!("Failed to spawn daemon: {}", self.exe.display()))?;
        Ok(())
    }
}

/// Finds or starts the daemon and hands back an attached session.
pub struct Connector<S> {
    socket_path: PathBuf,
    spawner: S,
    retry: RetryPolicy,
    track_sessions: bool,
}

impl<S: DaemonSpawner> Connector<S> {
    pub fn new(socket_path: impl Into<PathBuf>, spawner: S) -> Self {
        Self {
            socket_path: socket_path.into(),
            spawner,
            retry: RetryPolicy::default(),
            track_sessions: true,
        }
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Whether to register a session after connecting. Enable this when the
    /// daemon is configured with an idle timeout.
    pub fn with_session_tracking(mut self, track_sessions: bool) -> Self {
        self.track_sessions = track_sessions;
        self
    }

    /// Connects (spawning if needed) and performs the session handshake.
    pub async fn connect(&self) -> Result<Session> {
        let client = self.connect_or_spawn().await?;
        check_build(&client).await;

        let id = if self.track_sessions {
            handshake(&client).await?
        } else {
            None
        };
        Ok(Session::new(client, id))
    }

    /// Returns a live client, starting a daemon first if no socket exists.
    ///
    /// An existing socket file gets exactly one attempt: if nothing answers
    /// on it, the error is surfaced rather than spawning over it.
    pub async fn connect_or_spawn(&self) -> Result<DaemonServiceClient> {
        let socket_path = paths::resolve_socket_path(&self.socket_path)?;

        if socket_path.exists() {
            return connect(&socket_path).await;
        }

        self.spawner.spawn_daemon()?;

        for attempt in 1..=self.retry.attempts {
            tokio::time::sleep(self.retry.delay).await;
            match connect(&socket_path).await {
                Ok(client) => return Ok(client),
                Err(e) => daemon_log(
                    "bootstrap",
                    &format!(
                        "Connect attempt {}/{} failed: {:#}",
                        attempt, self.retry.attempts, e
                    ),
                ),
            }
        }

        anyhow::bail!(
            "Failed to connect to daemon at {} after {} attempts",
            socket_path.display(),
            self.retry.attempts
        )
    }
}

/// Connects to a daemon socket without spawning anything.
pub async fn connect(socket_path: &Path) -> Result<DaemonServiceClient> {
    let stream = UnixStream::connect(socket_path)
        .await
        .with_context(|| format!("Failed to connect to daemon at {}", socket_path.display()))?;

    let framed = LengthDelimitedCodec::builder().new_framed(stream);
    let transport = tarpc::serde_transport::new(framed, Bincode::default());
    Ok(DaemonServiceClient::new(client::Config::default(), transport).spawn())
}

/// Registers a fresh session if the daemon tracks sessions.
///
/// RPC failures are returned as-is. A registry rejection only costs the
/// bookkeeping, so it is logged and the session continues untracked.
async fn handshake(client: &DaemonServiceClient) -> Result<Option<SessionId>> {
    let initialised = client
        .is_initialised(call_context())
        .await
        .context("Session handshake failed")?;
    if !initialised {
        return Ok(None);
    }

    let id = client
        .new_session_id(call_context())
        .await
        .context("Session handshake failed")?;

    match client
        .add_session(call_context(), id.clone())
        .await
        .context("Session handshake failed")?
    {
        Ok(()) => Ok(Some(id)),
        Err(e) => {
            daemon_log("bootstrap", &format!("Session not registered: {}", e));
            Ok(None)
        }
    }
}

/// Logs when the daemon was built from a different commit than this binary.
async fn check_build(client: &DaemonServiceClient) {
    match client.daemon_info(call_context()).await {
        Ok(info) if info.build_sha != BUILD_SHA && info.build_sha != "unknown" => daemon_log(
            "bootstrap",
            &format!(
                "Version mismatch detected: client={}, daemon={} (pid {})",
                BUILD_SHA, info.build_sha, info.pid
            ),
        ),
        Ok(_) => {}
        Err(e) => daemon_log("bootstrap", &format!("daemon_info failed: {}", e)),
    }
}

#[cfg(test)]
#[path = "tests/bootstrap_tests.rs"]
mod tests;

//! Daemon accept loop and shutdown coordination.
//!
//! Each accepted connection is framed (length-delimited bincode), wrapped in
//! a tarpc channel and served by its own task until the client hangs up.

use crate::api::{ApiClient, Credentials};
use crate::config::Config;
use crate::daemon_log::daemon_log;
use crate::paths;
use crate::rpc::daemon_service::DaemonService;
use crate::rpc::DaemonInfo;
use crate::session_daemon::idle::{self, IdleTimer, RunMode, ShutdownReason};
use crate::session_daemon::registry::SessionRegistry;
use crate::session_daemon::server::{DaemonServer, BUILD_SHA};
use crate::session_daemon::socket::{self, SocketGuard};
use anyhow::{Context, Result};
use futures::StreamExt;
use std::future::Future;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tarpc::server::{self, Channel};
use tarpc::tokio_serde::formats::Bincode;
use tokio::net::{UnixListener, UnixStream};
use tokio_util::codec::LengthDelimitedCodec;

/// A bound daemon, ready to serve.
pub struct Daemon {
    listener: UnixListener,
    socket: SocketGuard,
    server: DaemonServer,
    registry: Arc<SessionRegistry>,
    mode: RunMode,
}

impl Daemon {
    /// Binds the socket and prepares the service. Fails with
    /// "socket already in use" when another daemon answers on `socket_path`.
    pub async fn bind(socket_path: &Path, api: Arc<ApiClient>, mode: RunMode) -> Result<Self> {
        let registry = Arc::new(match mode {
            RunMode::IdleTimeout(_) => SessionRegistry::new(),
            RunMode::NoIdleTimeout => SessionRegistry::uninitialised(),
        });

        let (listener, socket) = socket::bind_listener(socket_path).await?;

        let info = DaemonInfo {
            pid: std::process::id(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            build_sha: BUILD_SHA.to_string(),
            started_at: chrono::Utc::now().to_rfc3339(),
            idle_timeout_secs: mode.idle_timeout().map(|t| t.as_secs()),
            socket_path: socket_path.display().to_string(),
        };
        let server = DaemonServer::new(api, registry.clone(), info);

        daemon_log(
            "listener",
            &format!("Listening on {} ({:?})", socket_path.display(), mode),
        );

        Ok(Self {
            listener,
            socket,
            server,
            registry,
            mode,
        })
    }

    pub fn registry(&self) -> Arc<SessionRegistry> {
        self.registry.clone()
    }

    pub fn socket_path(&self) -> &Path {
        self.socket.path()
    }

    /// Serves connections until `shutdown` completes or, in idle-timeout
    /// mode, until no connection arrives for the whole timeout.
    ///
    /// Open sessions do not hold the daemon up. The listener is closed and
    /// the socket file removed before this returns, on every path.
    pub async fn run<F>(self, shutdown: F) -> Result<ShutdownReason>
    where
        F: Future<Output = ()>,
    {
        let Daemon {
            listener,
            socket,
            server,
            registry,
            mode,
        } = self;

        let mut idle_timer = IdleTimer::new(mode.idle_timeout());
        tokio::pin!(shutdown);

        let reason = loop {
            tokio::select! {
                _ = &mut shutdown => break ShutdownReason::Signal,
                _ = idle_timer.expired() => break ShutdownReason::IdleTimeout,
                accepted = listener.accept() => {
                    let (stream, _) = accepted.context("Failed to accept connection")?;
                    idle_timer.reset();
                    serve_connection(stream, server.clone());
                }
            }
        };

        drop(listener);
        drop(socket);

        daemon_log(
            "listener",
            &format!(
                "Shutting down ({}), {} session(s) still registered",
                reason,
                registry.num_session_ids()
            ),
        );
        Ok(reason)
    }
}

fn serve_connection(stream: UnixStream, server: DaemonServer) {
    let framed = LengthDelimitedCodec::builder().new_framed(stream);
    let transport = tarpc::serde_transport::new(framed, Bincode::default());
    let channel = server::BaseChannel::with_defaults(transport);

    tokio::spawn(async move {
        channel
            .execute(server.serve())
            .for_each(|response| async {
                tokio::spawn(response);
            })
            .await;
    });
}

/// Main entry point for `fedi daemon`.
///
/// Loads credentials, binds, and serves until SIGINT/SIGTERM or the idle
/// timeout. Returns an error (exit status 1) when the socket is taken or the
/// accept loop fails.
pub async fn run_daemon(config_dir: &Path, config: &Config, mode: RunMode) -> Result<()> {
    crate::daemon_log::init(config_dir);

    let socket_path = config.socket_path()?;
    let credentials_path = paths::credentials_path(config_dir);
    let credentials = Credentials::load(&credentials_path)?;
    let api = Arc::new(
        ApiClient::new(credentials, Duration::from_secs(config.http.timeout_secs))
            .with_credentials_path(credentials_path),
    );

    // Installed before bind: a signal sent once the socket exists is never lost.
    let shutdown = idle::shutdown_signal();

    let daemon = match Daemon::bind(&socket_path, api, mode).await {
        Ok(daemon) => daemon,
        Err(e) => {
            daemon_log("listener", &format!("Startup failed: {:#}", e));
            return Err(e);
        }
    };

    match daemon.run(shutdown).await {
        Ok(_) => Ok(()),
        Err(e) => {
            daemon_log("listener", &format!("Fatal listener error: {:#}", e));
            Err(e)
        }
    }
}

#[cfg(test)]
#[path = "tests/listener_tests.rs"]
mod tests;

//! Idle timeout and OS-signal handling for the daemon.

use crate::daemon_log::daemon_log;
use std::future::Future;
use std::pin::Pin;
use std::time::Duration;
use tokio::signal::unix::{signal, Signal, SignalKind};
use tokio::time::{Instant, Sleep};

/// How the daemon decides to stop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunMode {
    /// Run until SIGINT/SIGTERM. Sessions are not tracked.
    NoIdleTimeout,
    /// Also exit after this long without a new connection.
    IdleTimeout(Duration),
}

impl RunMode {
    pub fn idle_timeout(&self) -> Option<Duration> {
        match self {
            RunMode::NoIdleTimeout => None,
            RunMode::IdleTimeout(timeout) => Some(*timeout),
        }
    }
}

/// Why the accept loop stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownReason {
    Signal,
    IdleTimeout,
}

impl std::fmt::Display for ShutdownReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ShutdownReason::Signal => write!(f, "signal"),
            ShutdownReason::IdleTimeout => write!(f, "idle timeout"),
        }
    }
}

/// Resettable inactivity timer. Never fires when no timeout is set.
pub struct IdleTimer {
    timeout: Option<Duration>,
    sleep: Pin<Box<Sleep>>,
}

impl IdleTimer {
    pub fn new(timeout: Option<Duration>) -> Self {
        let first_deadline = Instant::now() + timeout.unwrap_or(Duration::ZERO);
        Self {
            timeout,
            sleep: Box::pin(tokio::time::sleep_until(first_deadline)),
        }
    }

    /// Pushes the deadline a full timeout into the future.
    pub fn reset(&mut self) {
        if let Some(timeout) = self.timeout {
            self.sleep.as_mut().reset(Instant::now() + timeout);
        }
    }

    /// Completes when the deadline passes. Pending forever without a timeout.
    pub async fn expired(&mut self) {
        match self.timeout {
            Some(_) => self.sleep.as_mut().await,
            None => std::future::pending::<()>().await,
        }
    }
}

/// SIGINT and SIGTERM listeners. Signals arriving after `install` are kept
/// until `recv` is polled.
pub struct ShutdownSignal {
    interrupt: Signal,
    terminate: Signal,
}

impl ShutdownSignal {
    pub fn install() -> std::io::Result<Self> {
        Ok(Self {
            interrupt: signal(SignalKind::interrupt())?,
            terminate: signal(SignalKind::terminate())?,
        })
    }

    /// Completes on the first SIGINT or SIGTERM.
    pub async fn recv(mut self) {
        tokio::select! {
            _ = self.interrupt.recv() => daemon_log("idle", "Received SIGINT"),
            _ = self.terminate.recv() => daemon_log("idle", "Received SIGTERM"),
        }
    }
}

/// Installs the handlers now and returns a future for the first signal.
///
/// If installation fails the error is logged and the future never
/// completes; the daemon then stops only on idle timeout or SIGKILL.
pub fn shutdown_signal() -> impl Future<Output = ()> {
    wait_for(ShutdownSignal::install())
}

async fn wait_for(installed: std::io::Result<ShutdownSignal>) {
    match installed {
        Ok(signals) => signals.recv().await,
        Err(e) => {
            daemon_log("idle", &format!("Failed to install signal handlers: {}", e));
            std::future::pending::<()>().await
        }
    }
}

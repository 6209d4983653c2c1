//! Shared debug logging utility for daemon components.
//!
//! The daemon runs detached with its standard streams pointed at /dev/null,
//! so everything worth knowing about it goes to `<config-dir>/logs/daemon.log`.

use std::io::Write;
use std::path::PathBuf;
use std::sync::OnceLock;

static LOG_PATH: OnceLock<PathBuf> = OnceLock::new();

/// Registers the log directory. Later calls are ignored.
///
/// Messages logged before this is called are only emitted as tracing events.
pub fn init(config_dir: &std::path::Path) {
    if let Ok(logs) = crate::paths::logs_dir(config_dir) {
        let _ = LOG_PATH.set(logs.join("daemon.log"));
    }
}

/// Debug logging utility for daemon components.
///
/// The `tag` parameter identifies the source module (e.g., "listener",
/// "bootstrap", "registry") to aid debugging.
pub fn daemon_log(tag: &str, msg: &str) {
    tracing::debug!(tag = tag, "{}", msg);

    let Some(log_path) = LOG_PATH.get() else {
        return;
    };
    if let Ok(mut file) = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_path)
    {
        let now = chrono::Local::now().format("%H:%M:%S%.3f");
        let _ = writeln!(file, "[{}] [{}] [{}] {}", now, std::process::id(), tag, msg);
    }
}

use crate::paths;
use crate::session_daemon::RunMode;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Shortest idle timeout a daemon accepts; anything lower is raised to this.
pub const MIN_IDLE_TIMEOUT_SECS: u64 = 60;

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub http: HttpConfig,
}

/// Session daemon settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    /// Socket path. May start with `~/` or be relative. Required; a fresh
    /// config gets one with a random suffix when it is first written.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub socket_path: Option<PathBuf>,
    /// Run the daemon until signalled instead of exiting when idle.
    #[serde(default)]
    pub without_idle_timeout: bool,
    /// Seconds without a new connection before the daemon exits. Default: 300
    #[serde(default = "default_idle_timeout_secs")]
    pub idle_timeout_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            socket_path: None,
            without_idle_timeout: false,
            idle_timeout_secs: default_idle_timeout_secs(),
        }
    }
}

impl ServerConfig {
    /// Daemon run mode for these settings, with the idle timeout clamped.
    pub fn run_mode(&self) -> RunMode {
        if self.without_idle_timeout {
            RunMode::NoIdleTimeout
        } else {
            RunMode::IdleTimeout(Duration::from_secs(
                self.idle_timeout_secs.max(MIN_IDLE_TIMEOUT_SECS),
            ))
        }
    }

    /// Whether clients should register sessions with the daemon.
    pub fn tracks_sessions(&self) -> bool {
        !self.without_idle_timeout
    }
}

fn default_idle_timeout_secs() -> u64 {
    300
}

/// Settings for the instance REST client.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct HttpConfig {
    /// Global per-request timeout in seconds. Default: 15
    #[serde(default = "default_http_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_http_timeout_secs(),
        }
    }
}

fn default_http_timeout_secs() -> u64 {
    15
}

impl Config {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        let config: Self = serde_yaml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;
        Ok(config)
    }

    /// Loads `<config_dir>/config.yaml`, writing a default one first if absent.
    ///
    /// The default socket path gets its random suffix here, so it stays
    /// stable for every later invocation using the same config dir.
    pub fn load_or_init(config_dir: &Path) -> Result<Self> {
        let path = paths::config_file_path(config_dir);
        if path.exists() {
            return Self::load(&path);
        }

        std::fs::create_dir_all(config_dir).with_context(|| {
            format!(
                "Failed to create config directory: {}",
                config_dir.display()
            )
        })?;

        let config = Self::initial();
        let content = serde_yaml::to_string(&config).context("Failed to serialize config")?;
        std::fs::write(&path, content)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;
        Ok(config)
    }

    /// Defaults plus a freshly generated socket path, for a new config file.
    pub fn initial() -> Self {
        let mut config = Self::default();
        config.server.socket_path = Some(paths::new_socket_path());
        config
    }

    /// The configured socket path, resolved to an absolute path.
    pub fn socket_path(&self) -> Result<PathBuf> {
        let Some(raw) = &self.server.socket_path else {
            anyhow::bail!("No socket path configured (set server.socket_path in config.yaml)");
        };
        paths::resolve_socket_path(raw)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            http: HttpConfig::default(),
        }
    }
}

#[cfg(test)]
#[path = "tests/config_tests.rs"]
mod tests;

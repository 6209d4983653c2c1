//! Filesystem locations used by fedi.
//!
//! - `<config-dir>/config.yaml` - CLI and daemon configuration
//! - `<config-dir>/credentials.json` - instance URL, token, account id
//! - `<config-dir>/logs/daemon.log` - daemon debug log
//! - `<runtime-dir>/fedi/server.<hex>.socket` - session daemon socket

use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};

/// Application directory name under the platform config and runtime dirs.
const APP_DIR: &str = "fedi";

/// Returns the default configuration directory: `<config-dir>/fedi/`
///
/// The directory is not created here; `Config::load_or_init` does that.
pub fn default_config_dir() -> Result<PathBuf> {
    let base = dirs::config_dir().context("Could not determine the user config directory")?;
    Ok(base.join(APP_DIR))
}

/// Returns the config file path inside a config directory.
pub fn config_file_path(config_dir: &Path) -> PathBuf {
    config_dir.join("config.yaml")
}

/// Returns the credentials file path inside a config directory.
pub fn credentials_path(config_dir: &Path) -> PathBuf {
    config_dir.join("credentials.json")
}

/// Returns the daemon log directory: `<config-dir>/logs/`
///
/// Creates the directory if it doesn't exist.
pub fn logs_dir(config_dir: &Path) -> Result<PathBuf> {
    let dir = config_dir.join("logs");
    fs::create_dir_all(&dir)
        .with_context(|| format!("Failed to create logs directory: {}", dir.display()))?;
    Ok(dir)
}

/// Returns the per-user runtime directory for fedi sockets.
///
/// Prefers `$XDG_RUNTIME_DIR`; falls back to the system temp dir on
/// platforms without one.
pub fn runtime_dir() -> PathBuf {
    dirs::runtime_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join(APP_DIR)
}

/// Builds a fresh default socket path: `<runtime-dir>/fedi/server.<hex>.socket`
///
/// The random suffix keeps separate configurations from colliding.
pub fn new_socket_path() -> PathBuf {
    let suffix: [u8; 8] = rand::random();
    runtime_dir().join(format!("server.{}.socket", hex_encode(&suffix)))
}

/// Resolves a configured socket path to an absolute path.
///
/// A leading `~` expands to the home directory; relative paths resolve
/// against the current directory.
pub fn resolve_socket_path(raw: &Path) -> Result<PathBuf> {
    if raw.as_os_str().is_empty() {
        anyhow::bail!("No socket path configured");
    }

    let expanded = expand_home(raw)?;
    if expanded.is_absolute() {
        return Ok(expanded);
    }

    let cwd = std::env::current_dir().context("Could not resolve the current directory")?;
    Ok(cwd.join(expanded))
}

fn expand_home(path: &Path) -> Result<PathBuf> {
    let mut components = path.components();
    match components.next() {
        Some(first) if first.as_os_str() == "~" => {
            let home = dirs::home_dir().with_context(|| {
                format!(
                    "Could not expand home directory in socket path: {}",
                    path.display()
                )
            })?;
            Ok(home.join(components.as_path()))
        }
        _ => Ok(path.to_path_buf()),
    }
}

/// Lowercase hex encoding.
pub fn hex_encode(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hex_encode() {
        assert_eq!(hex_encode(&[0x00, 0xab, 0x10, 0xff]), "00ab10ff");
        assert_eq!(hex_encode(&[]), "");
    }

    #[test]
    fn test_new_socket_path_has_random_hex_suffix() {
        let a = new_socket_path();
        let b = new_socket_path();
        assert_ne!(a, b);

        let name = a.file_name().unwrap().to_str().unwrap();
        assert!(name.starts_with("server."));
        assert!(name.ends_with(".socket"));
        let hex = name
            .trim_start_matches("server.")
            .trim_end_matches(".socket");
        assert_eq!(hex.len(), 16);
        assert!(hex.chars().all(|c| c.is_ascii_hexdigit()));
        assert_eq!(a.parent().unwrap().file_name().unwrap(), "fedi");
    }

    #[test]
    fn test_resolve_absolute_path_is_unchanged() {
        let path = Path::new("/run/user/1000/fedi/server.socket");
        assert_eq!(resolve_socket_path(path).unwrap(), path);
    }

    #[test]
    fn test_resolve_relative_path_becomes_absolute() {
        let resolved = resolve_socket_path(Path::new("sock/server.socket")).unwrap();
        assert!(resolved.is_absolute());
        assert!(resolved.ends_with("sock/server.socket"));
    }

    #[test]
    fn test_resolve_tilde_expands_home() {
        let Some(home) = dirs::home_dir() else {
            return;
        };
        let resolved = resolve_socket_path(Path::new("~/.fedi/server.socket")).unwrap();
        assert_eq!(resolved, home.join(".fedi/server.socket"));
    }

    #[test]
    fn test_resolve_empty_path_is_an_error() {
        let err = resolve_socket_path(Path::new("")).unwrap_err();
        assert!(err.to_string().contains("No socket path configured"));
    }
}

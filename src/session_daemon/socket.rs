//! Socket file lifecycle: directory setup, stale-file cleanup, exclusive bind,
//! and removal on shutdown.

use crate::daemon_log::daemon_log;
use anyhow::{Context, Result};
use std::io::ErrorKind;
use std::os::unix::fs::{MetadataExt, PermissionsExt};
use std::path::{Path, PathBuf};
use tokio::net::{UnixListener, UnixStream};

/// Whether a daemon currently answers on `path`.
pub async fn is_listening(path: &Path) -> bool {
    UnixStream::connect(path).await.is_ok()
}

/// Binds the daemon listener at `path`.
///
/// Creates the parent directory (0700) if needed. A leftover socket file with
/// nothing behind it is deleted first; a live one is an error, so at most one
/// daemon serves a path at a time.
pub async fn bind_listener(path: &Path) -> Result<(UnixListener, SocketGuard)> {
    ensure_parent_dir(path)?;

    if path.exists() {
        if is_listening(path).await {
            anyhow::bail!("socket already in use: {}", path.display());
        }
        daemon_log(
            "socket",
            &format!("Removing stale socket {}", path.display()),
        );
        // Narrow the window in which another daemon may have just bound here.
        if is_listening(path).await {
            anyhow::bail!("socket already in use: {}", path.display());
        }
        remove_socket_file(path)
            .with_context(|| format!("Failed to remove stale socket: {}", path.display()))?;
    }

    let listener = match UnixListener::bind(path) {
        Ok(listener) => listener,
        // Lost a bind race against another daemon started at the same moment.
        Err(e) if e.kind() == ErrorKind::AddrInUse => {
            anyhow::bail!("socket already in use: {}", path.display())
        }
        Err(e) => {
            return Err(e).with_context(|| format!("Failed to bind socket: {}", path.display()))
        }
    };

    let identity = file_identity(path)
        .with_context(|| format!("Failed to stat bound socket: {}", path.display()))?;

    Ok((
        listener,
        SocketGuard {
            path: path.to_path_buf(),
            identity,
        },
    ))
}

fn ensure_parent_dir(path: &Path) -> Result<()> {
    let Some(parent) = path.parent() else {
        return Ok(());
    };
    if parent.exists() {
        return Ok(());
    }

    std::fs::create_dir_all(parent)
        .with_context(|| format!("Failed to create socket directory: {}", parent.display()))?;
    std::fs::set_permissions(parent, std::fs::Permissions::from_mode(0o700)).with_context(
        || {
            format!(
                "Failed to restrict socket directory permissions: {}",
                parent.display()
            )
        },
    )?;
    Ok(())
}

/// Device and inode of the file at `path`.
fn file_identity(path: &Path) -> std::io::Result<(u64, u64)> {
    let meta = std::fs::symlink_metadata(path)?;
    Ok((meta.dev(), meta.ino()))
}

/// Removes a socket file; a file that is already gone is not an error.
pub fn remove_socket_file(path: &Path) -> std::io::Result<()> {
    match std::fs::remove_file(path) {
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
        other => other,
    }
}

/// Owns the bound socket file and deletes it when dropped.
///
/// The file is only deleted if it is still the one this daemon bound. A
/// daemon whose socket was unlinked and re-bound by another must not remove
/// the newer daemon's socket.
#[derive(Debug)]
pub struct SocketGuard {
    path: PathBuf,
    identity: (u64, u64),
}

impl SocketGuard {
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for SocketGuard {
    fn drop(&mut self) {
        match file_identity(&self.path) {
            Ok(identity) if identity == self.identity => {}
            Ok(_) => {
                daemon_log(
                    "socket",
                    &format!("Socket {} was replaced, leaving it", self.path.display()),
                );
                return;
            }
            Err(_) => return,
        }
        if let Err(e) = remove_socket_file(&self.path) {
            daemon_log(
                "socket",
                &format!("Failed to remove socket {}: {}", self.path.display(), e),
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_bind_creates_private_parent_dir() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("run").join("server.test.socket");

        let (_listener, guard) = bind_listener(&path).await.unwrap();
        assert!(path.exists());
        assert_eq!(guard.path(), path);

        let mode = std::fs::metadata(path.parent().unwrap())
            .unwrap()
            .permissions()
            .mode();
        assert_eq!(mode & 0o777, 0o700);
    }

    #[tokio::test]
    async fn test_bind_replaces_stale_socket_file() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("server.socket");

        // A bound-then-dropped std listener leaves a dead socket file behind.
        drop(std::os::unix::net::UnixListener::bind(&path).unwrap());
        assert!(path.exists());
        assert!(!is_listening(&path).await);

        let (_listener, _guard) = bind_listener(&path).await.unwrap();
        assert!(is_listening(&path).await);
    }

    #[tokio::test]
    async fn test_bind_refuses_live_socket() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("server.socket");

        let (_listener, _guard) = bind_listener(&path).await.unwrap();
        let err = bind_listener(&path).await.unwrap_err();
        assert!(err.to_string().contains("socket already in use"));
        // The live socket survives the failed attempt.
        assert!(is_listening(&path).await);
    }

    #[tokio::test]
    async fn test_guard_removes_socket_on_drop() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("server.socket");

        let (listener, guard) = bind_listener(&path).await.unwrap();
        drop(listener);
        drop(guard);
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn test_guard_leaves_socket_bound_by_another_daemon() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("server.socket");

        let (_orphan_listener, orphan_guard) = bind_listener(&path).await.unwrap();

        // Another daemon unlinks the file and binds the same path.
        std::fs::remove_file(&path).unwrap();
        let (_listener, _guard) = bind_listener(&path).await.unwrap();

        drop(orphan_guard);
        assert!(path.exists());
        assert!(is_listening(&path).await);
    }

    #[test]
    fn test_remove_missing_socket_is_ok() {
        let temp = TempDir::new().unwrap();
        assert!(remove_socket_file(&temp.path().join("absent.socket")).is_ok());
    }
}

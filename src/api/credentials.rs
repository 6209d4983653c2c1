//! On-disk login state: `<config-dir>/credentials.json`.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
    #[serde(default)]
    pub instance: Option<String>,
    #[serde(default)]
    pub access_token: Option<String>,
    #[serde(default)]
    pub account_id: Option<String>,
}

impl Credentials {
    /// Loads credentials; a missing file means "not logged in".
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read credentials file: {}", path.display()))?;
        serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse credentials file: {}", path.display()))
    }

    /// Writes credentials via a temp file and rename, readable only by the owner.
    pub fn save(&self, path: &Path) -> Result<()> {
        use std::io::Write;
        use std::os::unix::fs::OpenOptionsExt;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create directory: {}", parent.display())
            })?;
        }

        let content =
            serde_json::to_string_pretty(self).context("Failed to serialize credentials")?;
        let tmp_path = path.with_extension("json.tmp");
        {
            let mut file = std::fs::OpenOptions::new()
                .write(true)
                .create(true)
                .truncate(true)
                .mode(0o600)
                .open(&tmp_path)
                .with_context(|| format!("Failed to open {}", tmp_path.display()))?;
            file.write_all(content.as_bytes())
                .with_context(|| format!("Failed to write {}", tmp_path.display()))?;
        }
        std::fs::rename(&tmp_path, path)
            .with_context(|| format!("Failed to replace credentials file: {}", path.display()))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_missing_file_is_logged_out() {
        let temp = TempDir::new().unwrap();
        let creds = Credentials::load(&temp.path().join("credentials.json")).unwrap();
        assert_eq!(creds, Credentials::default());
    }

    #[test]
    fn test_save_then_load() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("nested").join("credentials.json");
        let creds = Credentials {
            instance: Some("https://example.social".to_string()),
            access_token: Some("secret".to_string()),
            account_id: Some("42".to_string()),
        };
        creds.save(&path).unwrap();
        assert_eq!(Credentials::load(&path).unwrap(), creds);

        use std::os::unix::fs::PermissionsExt;
        let mode = std::fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }

    #[test]
    fn test_corrupt_file_is_an_error() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("credentials.json");
        std::fs::write(&path, "{ not json").unwrap();
        assert!(Credentials::load(&path).is_err());
    }
}

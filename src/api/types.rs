//! Instance API types shared between the daemon and the CLI.
//!
//! These cross the daemon socket as bincode, so no field may be skipped
//! during serialization.

use serde::{Deserialize, Serialize};

/// What the daemon knows about the current login. Never carries the token.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthInfo {
    pub instance: Option<String>,
    pub account_id: Option<String>,
    pub has_token: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    pub id: String,
    pub username: String,
    /// `user` for local accounts, `user@domain` for remote ones
    pub acct: String,
    #[serde(default)]
    pub display_name: String,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub followers_count: u64,
    #[serde(default)]
    pub following_count: u64,
    #[serde(default)]
    pub statuses_count: u64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Visibility {
    #[default]
    Public,
    Unlisted,
    Private,
    Direct,
}

impl std::fmt::Display for Visibility {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Visibility::Public => write!(f, "public"),
            Visibility::Unlisted => write!(f, "unlisted"),
            Visibility::Private => write!(f, "private"),
            Visibility::Direct => write!(f, "direct"),
        }
    }
}

impl std::str::FromStr for Visibility {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "public" => Ok(Visibility::Public),
            "unlisted" => Ok(Visibility::Unlisted),
            "private" => Ok(Visibility::Private),
            "direct" => Ok(Visibility::Direct),
            other => Err(format!(
                "unknown visibility '{}' (expected public, unlisted, private or direct)",
                other
            )),
        }
    }
}

/// A status to publish.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusDraft {
    pub text: String,
    pub visibility: Visibility,
    pub spoiler_text: Option<String>,
    pub sensitive: bool,
}

impl StatusDraft {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            visibility: Visibility::default(),
            spoiler_text: None,
            sensitive: false,
        }
    }

    /// JSON body for `POST /api/v1/statuses`.
    pub fn to_request_body(&self) -> serde_json::Value {
        let mut body = serde_json::json!({
            "status": self.text,
            "visibility": self.visibility.to_string(),
            "sensitive": self.sensitive,
        });
        if let Some(spoiler) = &self.spoiler_text {
            body["spoiler_text"] = serde_json::Value::String(spoiler.clone());
        }
        body
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Status {
    pub id: String,
    #[serde(default)]
    pub url: Option<String>,
    /// HTML content as returned by the instance
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub created_at: String,
    #[serde(default)]
    pub visibility: Visibility,
}

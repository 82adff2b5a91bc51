use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Represents a Git identity stored in the profiles file
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
    /// Unique profile alias, also the suffix of the SSH host alias
    pub alias: String,
    /// Git username (user.name)
    pub user_name: String,
    /// Git email address (user.email)
    pub user_email: String,
    /// Private key used for this profile
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key_path: Option<PathBuf>,
    /// When the profile was added
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
}

impl Profile {
    pub fn new(alias: &str, user_name: &str, user_email: &str, key_path: PathBuf) -> Self {
        Self {
            alias: alias.to_string(),
            user_name: user_name.to_string(),
            user_email: user_email.to_string(),
            key_path: Some(key_path),
            created_at: Utc::now(),
        }
    }

    /// SSH host alias routing traffic through this profile's key, e.g. `github.com-work`
    pub fn host_alias(&self, host: &str) -> String {
        host_alias(host, &self.alias)
    }

    /// Whether this profile's name and email match the given identity
    pub fn matches(&self, identity: &Identity) -> bool {
        self.user_name == identity.name && self.user_email == identity.email
    }
}

/// Builds the synthetic SSH host name for an alias
pub fn host_alias(host: &str, alias: &str) -> String {
    format!("{host}-{alias}")
}

/// Git author identity (user.name / user.email)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub name: String,
    pub email: String,
}

impl Identity {
    pub fn new(name: &str, email: &str) -> Self {
        Self {
            name: name.to_string(),
            email: email.to_string(),
        }
    }
}

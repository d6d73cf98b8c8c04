//! Configuration System
//!
//! Layered configuration: built-in defaults, a user-level file, a workspace
//! file, then environment variables. The loaded [`SyncConfig`] is passed
//! explicitly to the pipeline; nothing below the entry point reads the
//! environment.

use crate::logging::LoggingConfig;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

mod facade;
mod merge;
mod sources;

pub use facade::ConfigLoader;

/// Root configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SyncConfig {
    #[serde(default)]
    pub metabase: MetabaseConfig,

    #[serde(default)]
    pub repo: RepoConfig,

    #[serde(default)]
    pub git: GitConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Remote service settings
#[derive(Clone, Serialize, Deserialize)]
pub struct MetabaseConfig {
    /// Base URL, e.g. `https://metabase.example.com`
    #[serde(default)]
    pub url: String,

    #[serde(default)]
    pub user: String,

    #[serde(default)]
    pub password: String,

    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,

    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

fn default_connect_timeout_secs() -> u64 {
    10
}

fn default_request_timeout_secs() -> u64 {
    120
}

impl Default for MetabaseConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            user: String::new(),
            password: String::new(),
            connect_timeout_secs: default_connect_timeout_secs(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

impl fmt::Debug for MetabaseConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MetabaseConfig")
            .field("url", &self.url)
            .field("user", &self.user)
            .field("password", &"<redacted>")
            .field("connect_timeout_secs", &self.connect_timeout_secs)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .finish()
    }
}

/// Destination settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RepoConfig {
    /// Mirror root; relative paths resolve against the working directory.
    #[serde(default = "default_repo_path")]
    pub path: PathBuf,

    /// Zip the resulting revision next to the mirror root.
    #[serde(default)]
    pub archive: bool,
}

fn default_repo_path() -> PathBuf {
    PathBuf::from("repo")
}

impl Default for RepoConfig {
    fn default() -> Self {
        Self {
            path: default_repo_path(),
            archive: false,
        }
    }
}

impl RepoConfig {
    /// Absolute mirror root.
    pub fn resolved_path(&self, cwd: &Path) -> PathBuf {
        if self.path.is_absolute() {
            self.path.clone()
        } else {
            cwd.join(&self.path)
        }
    }
}

/// Commit identity
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GitConfig {
    #[serde(default = "default_author_name")]
    pub author_name: String,

    #[serde(default = "default_author_email")]
    pub author_email: String,
}

fn default_author_name() -> String {
    "metabase-git-sync".to_string()
}

fn default_author_email() -> String {
    "metabase-git-sync@localhost".to_string()
}

impl Default for GitConfig {
    fn default() -> Self {
        Self {
            author_name: default_author_name(),
            author_email: default_author_email(),
        }
    }
}

/// Configuration validation errors
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    Metabase(String, String),
    Repo(String),
    Git(String),
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationError::Metabase(field, msg) => write!(f, "metabase.{}: {}", field, msg),
            ValidationError::Repo(msg) => write!(f, "repo: {}", msg),
            ValidationError::Git(msg) => write!(f, "git: {}", msg),
        }
    }
}

impl std::error::Error for ValidationError {}

impl MetabaseConfig {
    fn validate(&self, errors: &mut Vec<ValidationError>) {
        let required = [
            ("url", &self.url, "METABASE_URL"),
            ("user", &self.user, "METABASE_USER"),
            ("password", &self.password, "METABASE_PASSWORD"),
        ];
        for (field, value, env) in required {
            if value.trim().is_empty() {
                errors.push(ValidationError::Metabase(
                    field.to_string(),
                    format!("is required (set {} or metabase.{})", env, field),
                ));
            }
        }
        if !self.url.trim().is_empty()
            && !(self.url.starts_with("http://") || self.url.starts_with("https://"))
        {
            errors.push(ValidationError::Metabase(
                "url".to_string(),
                format!("must start with http:// or https://, got {}", self.url),
            ));
        }
        if self.connect_timeout_secs == 0 || self.request_timeout_secs == 0 {
            errors.push(ValidationError::Metabase(
                "timeouts".to_string(),
                "must be greater than zero".to_string(),
            ));
        }
    }
}

impl SyncConfig {
    /// Validate the entire configuration, reporting every problem at once.
    pub fn validate(&self) -> Result<(), Vec<ValidationError>> {
        let mut errors = Vec::new();

        self.metabase.validate(&mut errors);

        if self.repo.path.as_os_str().is_empty() {
            errors.push(ValidationError::Repo("path cannot be empty".to_string()));
        }
        if self.git.author_name.trim().is_empty() || self.git.author_email.trim().is_empty() {
            errors.push(ValidationError::Git(
                "author_name and author_email cannot be empty".to_string(),
            ));
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    /// TOML rendering with the password masked.
    pub fn to_redacted_toml(&self) -> Result<String, toml::ser::Error> {
        let mut shown = self.clone();
        if !shown.metabase.password.is_empty() {
            shown.metabase.password = "<redacted>".to_string();
        }
        toml::to_string_pretty(&shown)
    }
}

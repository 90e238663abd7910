//! docsync configuration
//!
//! One YAML file describes which repository, branch and directory hold the
//! documents, who commits changes, how hard to pace requests and where the
//! summary index lives. Every section has defaults, so an empty file (or no
//! file) only lacks the repository owner and name.

use std::path::{Path, PathBuf};

use anyhow::Context;
use serde::{Deserialize, Serialize};

use crate::domain::{Committer, Credentials, RepoId};

// ---------------------------------------------------------------------------
// Config struct with sub-sections
// ---------------------------------------------------------------------------

/// Top-level configuration for docsync.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub remote: RemoteConfig,
    pub committer: CommitterConfig,
    pub auth: AuthConfig,
    pub rate_limiting: RateLimitingConfig,
    pub summaries: SummariesConfig,
    pub logging: LoggingConfig,
}

/// Location of the document tree on the remote.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RemoteConfig {
    /// Repository owner (user or organisation).
    pub owner: String,
    /// Repository name.
    pub repository: String,
    /// Branch documents are read from and committed to.
    pub branch: String,
    /// Base path of the document tree inside the repository. Empty means the root.
    pub path: String,
    /// Base URL of the REST API.
    pub api_url: String,
}

/// Identity recorded on commits.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CommitterConfig {
    pub name: String,
    pub email: String,
}

/// Explicit credentials. Both are optional; without a token access is read-only.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    pub username: Option<String>,
    pub token: Option<String>,
}

/// Request pacing settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RateLimitingConfig {
    /// Multiplier applied to the server-reported remaining quota.
    pub speedup_factor: u32,
    /// Window length (seconds) assumed before the first quota query.
    pub window_secs: u64,
}

/// Summary index settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SummariesConfig {
    /// Name of the precomputed summary index file at the tree root.
    pub index_file: String,
    /// Fields never stored in summaries, in addition to the body.
    pub exclude_fields: Vec<String>,
    /// Seconds between polls when waiting on the summary computation.
    pub poll_interval: u64,
}

/// Logging / tracing settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level: `trace`, `debug`, `info`, `warn`, or `error`.
    pub level: String,
}

// ---------------------------------------------------------------------------
// Loading
// ---------------------------------------------------------------------------

impl Config {
    /// Reads and parses the YAML file at `path`
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        serde_yaml::from_str(&content)
            .with_context(|| format!("Invalid config file {}", path.display()))
    }

    /// Like [`Config::load`], but a missing or broken file yields the defaults
    pub fn load_or_default(path: &Path) -> Self {
        Self::load(path).unwrap_or_default()
    }

    /// `$XDG_CONFIG_HOME/docsync/config.yaml`, or `./docsync/config.yaml`
    /// when the platform has no config directory
    pub fn default_path() -> PathBuf {
        let base = dirs::config_dir().unwrap_or_default();
        base.join("docsync").join("config.yaml")
    }

    pub fn repo_id(&self) -> RepoId {
        RepoId::new(&self.remote.owner, &self.remote.repository)
    }

    pub fn committer(&self) -> Committer {
        Committer {
            name: self.committer.name.clone(),
            email: self.committer.email.clone(),
        }
    }

    pub fn credentials(&self) -> Credentials {
        Credentials::new(self.auth.username.clone(), self.auth.token.clone())
    }
}

// ---------------------------------------------------------------------------
// Defaults
// ---------------------------------------------------------------------------

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            owner: String::new(),
            repository: String::new(),
            branch: "main".to_string(),
            path: String::new(),
            api_url: "https://api.github.com".to_string(),
        }
    }
}

impl Default for CommitterConfig {
    fn default() -> Self {
        Self {
            name: "docsync".to_string(),
            email: "no-reply@github.com".to_string(),
        }
    }
}

impl Default for RateLimitingConfig {
    fn default() -> Self {
        Self {
            speedup_factor: 8,
            window_secs: 3600,
        }
    }
}

impl Default for SummariesConfig {
    fn default() -> Self {
        Self {
            index_file: ".summaries.json".to_string(),
            exclude_fields: Vec::new(),
            poll_interval: 60,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    pub field: String,
    pub message: String,
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

const VALID_LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

impl Config {
    pub fn validate(&self) -> Vec<ValidationError> {
        let mut errors = Vec::new();

        // --- remote ---
        for (field, value) in [
            ("remote.owner", &self.remote.owner),
            ("remote.repository", &self.remote.repository),
            ("remote.branch", &self.remote.branch),
        ] {
            if value.trim().is_empty() {
                errors.push(ValidationError {
                    field: field.into(),
                    message: "must not be empty".into(),
                });
            }
        }
        if url::Url::parse(&self.remote.api_url).is_err() {
            errors.push(ValidationError {
                field: "remote.api_url".into(),
                message: format!("invalid URL '{}'", self.remote.api_url),
            });
        }

        // --- rate_limiting ---
        if self.rate_limiting.speedup_factor == 0 {
            errors.push(ValidationError {
                field: "rate_limiting.speedup_factor".into(),
                message: "must be at least 1".into(),
            });
        }
        if self.rate_limiting.window_secs == 0 {
            errors.push(ValidationError {
                field: "rate_limiting.window_secs".into(),
                message: "must be greater than 0".into(),
            });
        }

        // --- summaries ---
        if self.summaries.index_file.trim().is_empty() {
            errors.push(ValidationError {
                field: "summaries.index_file".into(),
                message: "must not be empty".into(),
            });
        }
        if self.summaries.poll_interval == 0 {
            errors.push(ValidationError {
                field: "summaries.poll_interval".into(),
                message: "must be greater than 0".into(),
            });
        }

        // --- logging ---
        if !VALID_LOG_LEVELS.contains(&self.logging.level.as_str()) {
            errors.push(ValidationError {
                field: "logging.level".into(),
                message: format!(
                    "invalid level '{}'; valid options: {}",
                    self.logging.level,
                    VALID_LOG_LEVELS.join(", ")
                ),
            });
        }

        errors
    }
}

// ---------------------------------------------------------------------------
// ConfigBuilder
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: Config::default(),
        }
    }

    // --- remote ---

    pub fn remote_repository(mut self, owner: impl Into<String>, name: impl Into<String>) -> Self {
        self.config.remote.owner = owner.into();
        self.config.remote.repository = name.into();
        self
    }

    pub fn remote_branch(mut self, branch: impl Into<String>) -> Self {
        self.config.remote.branch = branch.into();
        self
    }

    pub fn remote_path(mut self, path: impl Into<String>) -> Self {
        self.config.remote.path = path.into();
        self
    }

    pub fn remote_api_url(mut self, url: impl Into<String>) -> Self {
        self.config.remote.api_url = url.into();
        self
    }

    // --- committer ---

    pub fn committer(mut self, name: impl Into<String>, email: impl Into<String>) -> Self {
        self.config.committer.name = name.into();
        self.config.committer.email = email.into();
        self
    }

    // --- auth ---

    pub fn auth_username(mut self, username: impl Into<String>) -> Self {
        self.config.auth.username = Some(username.into());
        self
    }

    pub fn auth_token(mut self, token: impl Into<String>) -> Self {
        self.config.auth.token = Some(token.into());
        self
    }

    // --- rate_limiting ---

    pub fn rate_limiting_speedup_factor(mut self, factor: u32) -> Self {
        self.config.rate_limiting.speedup_factor = factor;
        self
    }

    pub fn rate_limiting_window_secs(mut self, seconds: u64) -> Self {
        self.config.rate_limiting.window_secs = seconds;
        self
    }

    // --- summaries ---

    pub fn summaries_index_file(mut self, name: impl Into<String>) -> Self {
        self.config.summaries.index_file = name.into();
        self
    }

    pub fn summaries_exclude_field(mut self, field: impl Into<String>) -> Self {
        self.config.summaries.exclude_fields.push(field.into());
        self
    }

    pub fn summaries_poll_interval(mut self, seconds: u64) -> Self {
        self.config.summaries.poll_interval = seconds;
        self
    }

    // --- logging ---

    pub fn logging_level(mut self, level: impl Into<String>) -> Self {
        self.config.logging.level = level.into();
        self
    }

    // --- build ---

    pub fn build(self) -> Config {
        self.config
    }

    pub fn build_validated(self) -> Result<Config, Vec<ValidationError>> {
        let config = self.build();
        let errors = config.validate();
        if errors.is_empty() {
            Ok(config)
        } else {
            Err(errors)
        }
    }
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

//! Configuration
//!
//! Settings come from a TOML file and are then overridden by CLI flags and
//! environment variables (resolved by clap in `main.rs`). A missing default
//! file is not an error; a missing file that was asked for explicitly is.
//!
//! ```toml
//! access_code = "..."
//!
//! [poll]
//! max_attempts = 60
//! interval_secs = 5
//!
//! [http]
//! timeout_secs = 30
//! ```

use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

pub const DEFAULT_MAX_ATTEMPTS: u32 = 60;
pub const DEFAULT_INTERVAL_SECS: u64 = 5;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("invalid setting: {0}")]
    Invalid(String),
}

/// Everything the CLI can read from the config file.
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    /// Deployment secret exchanged for an access token
    pub access_code: Option<String>,
    pub poll: PollSection,
    pub http: HttpSection,
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct PollSection {
    pub max_attempts: u32,
    pub interval_secs: u64,
}

impl Default for PollSection {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            interval_secs: DEFAULT_INTERVAL_SECS,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct HttpSection {
    /// Per-request timeout; the client default applies when unset
    pub timeout_secs: Option<u64>,
}

/// Runtime view of the poll section used by the status poller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollSettings {
    pub max_attempts: u32,
    pub interval: Duration,
}

impl Default for PollSettings {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            interval: Duration::from_secs(DEFAULT_INTERVAL_SECS),
        }
    }
}

impl Settings {
    /// `<config_dir>/tapdata-ci/config.toml`, when the platform has one.
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("tapdata-ci").join("config.toml"))
    }

    /// Load settings from `explicit`, or from the default location if it
    /// exists, or fall back to built-in defaults.
    pub fn load(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        match explicit {
            Some(path) => Self::from_file(path),
            None => match Self::default_path() {
                Some(path) if path.is_file() => Self::from_file(&path),
                _ => Ok(Self::default()),
            },
        }
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let settings = Self::from_toml(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        tracing::debug!(path = %path.display(), "loaded config file");
        Ok(settings)
    }

    pub fn from_toml(text: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(text)
    }

    /// Apply CLI/env overrides on top of the file values.
    pub fn with_overrides(
        mut self,
        access_code: Option<String>,
        max_attempts: Option<u32>,
        interval_secs: Option<u64>,
    ) -> Self {
        if access_code.is_some() {
            self.access_code = access_code;
        }
        if let Some(n) = max_attempts {
            self.poll.max_attempts = n;
        }
        if let Some(s) = interval_secs {
            self.poll.interval_secs = s;
        }
        self
    }

    pub fn poll_settings(&self) -> Result<PollSettings, ConfigError> {
        if self.poll.max_attempts == 0 {
            return Err(ConfigError::Invalid(
                "poll.max_attempts must be at least 1".into(),
            ));
        }
        Ok(PollSettings {
            max_attempts: self.poll.max_attempts,
            interval: Duration::from_secs(self.poll.interval_secs),
        })
    }

    pub fn request_timeout(&self) -> Option<Duration> {
        self.http.timeout_secs.map(Duration::from_secs)
    }

    /// The access code, treating an empty string as unset.
    pub fn access_code(&self) -> Option<&str> {
        self.access_code.as_deref().filter(|c| !c.is_empty())
    }
}

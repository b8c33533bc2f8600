// /////////////////////////////////////////////////////////////////////////////
// File Repo
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Repository configuration
//!
//! The enumerated options from spec.md §6, loaded from a TOML file (or
//! built programmatically for tests) and validated once at startup rather
//! than at every call site.

use std::path::PathBuf;
use std::time::Duration;

use file_repo_domain::RepoError;
use serde::{Deserialize, Serialize};

/// What gets written into `.ind`/`.del` markers besides their existence
/// (spec.md §4.9).
#[derive(Debug, Clone, Copy, Eq, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum MarkerLogging {
    None,
    #[default]
    HumanReadable,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RepositoryConfig {
    pub base_directory: PathBuf,
    #[serde(with = "humantime_secs")]
    pub delete_delay: Duration,
    #[serde(with = "humantime_secs")]
    pub indeterminate_delay: Duration,
    #[serde(with = "humantime_secs")]
    pub health_check_interval: Duration,
    #[serde(with = "humantime_secs")]
    pub max_access_wait_or_retry: Duration,
    pub marker_file_logging: MarkerLogging,
    pub allowed_extensions: Option<Vec<String>>,
}

impl Default for RepositoryConfig {
    fn default() -> Self {
        Self {
            base_directory: PathBuf::from("./repo"),
            delete_delay: Duration::from_secs(0),
            indeterminate_delay: Duration::from_secs(24 * 3600),
            health_check_interval: Duration::from_secs(15),
            max_access_wait_or_retry: Duration::from_secs(10),
            marker_file_logging: MarkerLogging::HumanReadable,
            allowed_extensions: None,
        }
    }
}

impl RepositoryConfig {
    pub fn from_toml_str(s: &str) -> Result<Self, RepoError> {
        let cfg: Self = toml::from_str(s).map_err(|e| RepoError::InvalidConfiguration(e.to_string()))?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn from_file(path: &std::path::Path) -> Result<Self, RepoError> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_toml_str(&contents)
    }

    /// Overlays process environment variables (`FREPO_BASE_DIRECTORY`,
    /// `FREPO_DELETE_DELAY_SECS`, ...) onto a base config, letting
    /// deployment environments override a checked-in file without editing
    /// it.
    pub fn apply_env_overrides(mut self) -> Self {
        if let Ok(v) = std::env::var("FREPO_BASE_DIRECTORY") {
            self.base_directory = PathBuf::from(v);
        }
        if let Some(v) = env_secs("FREPO_DELETE_DELAY_SECS") {
            self.delete_delay = Duration::from_secs(v);
        }
        if let Some(v) = env_secs("FREPO_INDETERMINATE_DELAY_SECS") {
            self.indeterminate_delay = Duration::from_secs(v);
        }
        if let Some(v) = env_secs("FREPO_HEALTH_CHECK_INTERVAL_SECS") {
            self.health_check_interval = Duration::from_secs(v);
        }
        if let Some(v) = env_secs("FREPO_MAX_ACCESS_WAIT_SECS") {
            self.max_access_wait_or_retry = Duration::from_secs(v);
        }
        self
    }

    pub fn validate(&self) -> Result<(), RepoError> {
        if self.base_directory.as_os_str().is_empty() {
            return Err(RepoError::InvalidConfiguration("base_directory must not be empty".into()));
        }
        if self.health_check_interval.is_zero() {
            return Err(RepoError::InvalidConfiguration("health_check_interval must be >= 1s".into()));
        }
        if self.max_access_wait_or_retry.is_zero() {
            return Err(RepoError::InvalidConfiguration("max_access_wait_or_retry must be >= 1s".into()));
        }
        Ok(())
    }
}

fn env_secs(name: &str) -> Option<u64> {
    std::env::var(name).ok().and_then(|v| v.parse().ok())
}

mod humantime_secs {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        d.as_secs().serialize(s)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        let secs = u64::deserialize(d)?;
        Ok(Duration::from_secs(secs))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        assert!(RepositoryConfig::default().validate().is_ok());
    }

    #[test]
    fn parses_from_toml() {
        let toml = r#"
            base_directory = "/tmp/repo"
            delete_delay = 3600
            indeterminate_delay = 86400
            health_check_interval = 15
            max_access_wait_or_retry = 10
            marker_file_logging = "human_readable"
        "#;
        let cfg = RepositoryConfig::from_toml_str(toml).unwrap();
        assert_eq!(cfg.base_directory, PathBuf::from("/tmp/repo"));
        assert_eq!(cfg.delete_delay, Duration::from_secs(3600));
    }

    #[test]
    fn rejects_zero_health_check_interval() {
        let toml = r#"
            base_directory = "/tmp/repo"
            delete_delay = 0
            indeterminate_delay = 0
            health_check_interval = 0
            max_access_wait_or_retry = 10
            marker_file_logging = "none"
        "#;
        assert!(RepositoryConfig::from_toml_str(toml).is_err());
    }

    #[test]
    fn env_override_replaces_base_directory() {
        std::env::set_var("FREPO_BASE_DIRECTORY", "/tmp/overridden");
        let cfg = RepositoryConfig::default().apply_env_overrides();
        assert_eq!(cfg.base_directory, PathBuf::from("/tmp/overridden"));
        std::env::remove_var("FREPO_BASE_DIRECTORY");
    }
}

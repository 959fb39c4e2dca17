//! Configuration loading
//!
//! Settings come from a YAML file, optionally overridden by command-line
//! flags. The bearer token is never stored in the file; it is read from the
//! environment on every request (see [`EnvCredentials`](crate::data::EnvCredentials)).

use directories::ProjectDirs;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

use crate::loader::DEFAULT_CALL_TIMEOUT;

/// File name looked up in the current directory
pub const LOCAL_CONFIG_FILE: &str = "campusdeck.yaml";

/// Errors raised while locating or validating configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Config file not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error(
        "No configuration file found. Create ./campusdeck.yaml or \
         ~/.config/campusdeck/config.yaml, or pass both --tenant and --base-url"
    )]
    Missing,

    #[error("Failed to read config file {}: {source}", path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config file {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        source: serde_yaml::Error,
    },

    #[error("Invalid tenant id '{0}': use letters, digits, '-' or '_'")]
    InvalidTenant(String),

    #[error("api.call_timeout_ms must be greater than zero")]
    InvalidTimeout,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Config {
    pub tenant: String,
    pub api: ApiConfig,
    /// Overrides the platform cache directory
    #[serde(default)]
    pub cache_dir: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ApiConfig {
    pub base_url: String,
    #[serde(default = "default_call_timeout_ms")]
    pub call_timeout_ms: u64,
}

fn default_call_timeout_ms() -> u64 {
    u64::try_from(DEFAULT_CALL_TIMEOUT.as_millis()).unwrap_or(10_000)
}

/// Values supplied on the command line; each one wins over the file
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub tenant: Option<String>,
    pub base_url: Option<String>,
}

impl Config {
    /// Builds a config from flags alone
    pub fn new(tenant: impl Into<String>, base_url: impl Into<String>) -> Self {
        Self {
            tenant: tenant.into(),
            api: ApiConfig {
                base_url: base_url.into(),
                call_timeout_ms: default_call_timeout_ms(),
            },
            cache_dir: None,
        }
    }

    /// Load configuration and apply command-line overrides.
    ///
    /// Search order:
    /// 1. Explicit path if provided
    /// 2. ./campusdeck.yaml (current directory)
    /// 3. `<XDG config dir>/campusdeck/config.yaml`
    ///
    /// With no file at all, `--tenant` and `--base-url` together are enough.
    pub fn load(
        explicit_path: Option<&Path>,
        overrides: &ConfigOverrides,
    ) -> Result<Self, ConfigError> {
        let path = match explicit_path {
            Some(p) if p.exists() => Some(p.to_path_buf()),
            Some(p) => return Err(ConfigError::NotFound(p.to_path_buf())),
            None => Self::find_config_file(),
        };

        let config = match (path, &overrides.tenant, &overrides.base_url) {
            (Some(p), _, _) => Self::load_from_path(&p)?,
            (None, Some(tenant), Some(base_url)) => Self::new(tenant.clone(), base_url.clone()),
            (None, _, _) => return Err(ConfigError::Missing),
        };

        config.with_overrides(overrides).validated()
    }

    fn find_config_file() -> Option<PathBuf> {
        let local = PathBuf::from(LOCAL_CONFIG_FILE);
        if local.exists() {
            return Some(local);
        }

        ProjectDirs::from("", "", "campusdeck")
            .map(|dirs| dirs.config_dir().join("config.yaml"))
            .filter(|path| path.exists())
    }

    pub fn load_from_path(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        serde_yaml::from_str(&contents).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    fn with_overrides(mut self, overrides: &ConfigOverrides) -> Self {
        if let Some(tenant) = &overrides.tenant {
            self.tenant = tenant.clone();
        }
        if let Some(base_url) = &overrides.base_url {
            self.api.base_url = base_url.clone();
        }
        self
    }

    /// Checks values that end up in paths and URLs
    pub fn validated(self) -> Result<Self, ConfigError> {
        if !is_valid_tenant(&self.tenant) {
            return Err(ConfigError::InvalidTenant(self.tenant));
        }
        if self.api.call_timeout_ms == 0 {
            return Err(ConfigError::InvalidTimeout);
        }
        Ok(self)
    }

    pub fn call_timeout(&self) -> Duration {
        Duration::from_millis(self.api.call_timeout_ms)
    }
}

/// Tenant ids become a directory name and a URL path segment
pub fn is_valid_tenant(tenant: &str) -> bool {
    !tenant.is_empty()
        && tenant
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn write_config(dir: &TempDir, contents: &str) -> PathBuf {
        let path = dir.path().join("config.yaml");
        fs::write(&path, contents).expect("write config");
        path
    }

    #[test]
    fn test_load_full_file() {
        let dir = TempDir::new().unwrap();
        let path = write_config(
            &dir,
            concat!(
                "tenant: acme-academy\n",
                "api:\n",
                "  base_url: https://api.example.com\n",
                "  call_timeout_ms: 2500\n",
                "cache_dir: /tmp/cd\n",
            ),
        );

        let config = Config::load(Some(&path), &ConfigOverrides::default()).unwrap();

        assert_eq!(config.tenant, "acme-academy");
        assert_eq!(config.api.base_url, "https://api.example.com");
        assert_eq!(config.call_timeout(), Duration::from_millis(2500));
        assert_eq!(config.cache_dir, Some(PathBuf::from("/tmp/cd")));
    }

    #[test]
    fn test_call_timeout_defaults_to_ten_seconds() {
        let dir = TempDir::new().unwrap();
        let path = write_config(&dir, "tenant: acme\napi:\n  base_url: http://localhost\n");

        let config = Config::load(Some(&path), &ConfigOverrides::default()).unwrap();

        assert_eq!(config.call_timeout(), Duration::from_secs(10));
        assert!(config.cache_dir.is_none());
    }

    #[test]
    fn test_flags_override_file() {
        let dir = TempDir::new().unwrap();
        let path = write_config(&dir, "tenant: acme\napi:\n  base_url: http://localhost\n");
        let overrides = ConfigOverrides {
            tenant: Some("globex".to_string()),
            base_url: None,
        };

        let config = Config::load(Some(&path), &overrides).unwrap();

        assert_eq!(config.tenant, "globex");
        assert_eq!(config.api.base_url, "http://localhost");
    }

    #[test]
    fn test_missing_explicit_file_is_an_error() {
        let dir = TempDir::new().unwrap();
        let missing = dir.path().join("nope.yaml");

        let err = Config::load(Some(&missing), &ConfigOverrides::default()).unwrap_err();

        assert!(matches!(err, ConfigError::NotFound(_)));
        assert!(err.to_string().contains("nope.yaml"));
    }

    #[test]
    fn test_malformed_yaml_is_parse_error() {
        let dir = TempDir::new().unwrap();
        let path = write_config(&dir, "tenant: [unclosed\n");

        let err = Config::load(Some(&path), &ConfigOverrides::default()).unwrap_err();

        assert!(matches!(err, ConfigError::Parse { .. }));
    }

    #[test]
    fn test_invalid_tenant_rejected() {
        let dir = TempDir::new().unwrap();
        let path = write_config(&dir, "tenant: ../other\napi:\n  base_url: http://localhost\n");

        let err = Config::load(Some(&path), &ConfigOverrides::default()).unwrap_err();

        assert!(matches!(err, ConfigError::InvalidTenant(t) if t == "../other"));
    }

    #[test]
    fn test_zero_timeout_rejected() {
        let config = Config {
            api: ApiConfig {
                base_url: "http://localhost".to_string(),
                call_timeout_ms: 0,
            },
            ..Config::new("acme", "http://localhost")
        };
        assert!(matches!(config.validated(), Err(ConfigError::InvalidTimeout)));
    }

    #[test]
    fn test_tenant_validation() {
        assert!(is_valid_tenant("acme"));
        assert!(is_valid_tenant("Acme_Academy-2"));
        assert!(!is_valid_tenant(""));
        assert!(!is_valid_tenant("a/b"));
        assert!(!is_valid_tenant("a b"));
        assert!(!is_valid_tenant("acmé"));
    }
}

//! Configuration loading and persistence.
//!
//! Settings live in a JSON file (by default `webpush/config.json` under the
//! platform config directory) and can be overridden through `WEBPUSH_*`
//! environment variables. The file holds the VAPID private key, so it is
//! written owner-readable only.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
#[cfg(unix)]
use std::os::unix::fs::PermissionsExt;
use std::{
    fs,
    path::{Path, PathBuf},
};

use crate::request::DEFAULT_TTL;
use crate::vapid::DEFAULT_EXPIRATION_SECS;

/// Settings for the push client.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(default)]
pub struct Config {
    /// VAPID subject (`mailto:` or `https:`).
    pub vapid_subject: Option<String>,
    /// VAPID public key (base64url, 65-byte uncompressed point).
    pub vapid_public_key: Option<String>,
    /// VAPID private key (base64url, raw 32-byte scalar).
    pub vapid_private_key: Option<String>,
    /// Legacy GCM API key.
    pub gcm_api_key: Option<String>,
    /// Default message time-to-live in seconds.
    pub default_ttl: u32,
    /// VAPID token lifetime in seconds.
    pub vapid_expiration: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            vapid_subject: None,
            vapid_public_key: None,
            vapid_private_key: None,
            gcm_api_key: None,
            default_ttl: DEFAULT_TTL,
            vapid_expiration: DEFAULT_EXPIRATION_SECS,
        }
    }
}

impl Config {
    /// Default location of the configuration file.
    pub fn default_path() -> Result<PathBuf> {
        Ok(dirs::config_dir()
            .context("Could not determine config directory")?
            .join("webpush")
            .join("config.json"))
    }

    /// Load configuration from `path` (or the default location), falling
    /// back to defaults when the file does not exist, then apply
    /// environment overrides.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = match path {
            Some(path) => path.to_path_buf(),
            None => Self::default_path()?,
        };

        let mut config = if path.exists() {
            let content = fs::read_to_string(&path)
                .with_context(|| format!("Failed to read {}", path.display()))?;
            serde_json::from_str(&content)
                .with_context(|| format!("Invalid config file {}", path.display()))?
        } else {
            log::debug!("[WebPush] No config at {}, using defaults", path.display());
            Self::default()
        };

        config.apply_env_overrides();
        Ok(config)
    }

    fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(subject) = lookup("WEBPUSH_VAPID_SUBJECT") {
            self.vapid_subject = Some(subject);
        }
        if let Some(public_key) = lookup("WEBPUSH_VAPID_PUBLIC_KEY") {
            self.vapid_public_key = Some(public_key);
        }
        if let Some(private_key) = lookup("WEBPUSH_VAPID_PRIVATE_KEY") {
            self.vapid_private_key = Some(private_key);
        }
        if let Some(gcm_api_key) = lookup("WEBPUSH_GCM_API_KEY") {
            self.gcm_api_key = Some(gcm_api_key);
        }

        if let Some(ttl) = lookup("WEBPUSH_TTL") {
            if let Ok(ttl) = ttl.parse::<u32>() {
                self.default_ttl = ttl;
            }
        }

        if let Some(expiration) = lookup("WEBPUSH_VAPID_EXPIRATION") {
            if let Ok(expiration) = expiration.parse::<u64>() {
                self.vapid_expiration = expiration;
            }
        }
    }

    /// Persist the configuration as pretty JSON.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir)
                .with_context(|| format!("Failed to create {}", dir.display()))?;
        }
        fs::write(path, serde_json::to_string_pretty(self)?)
            .with_context(|| format!("Failed to write {}", path.display()))?;

        // Set restrictive permissions (owner read/write only)
        #[cfg(unix)]
        fs::set_permissions(path, fs::Permissions::from_mode(0o600))?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.default_ttl, 2_419_200);
        assert_eq!(config.vapid_expiration, 43_200);
        assert!(config.vapid_subject.is_none());
        assert!(config.gcm_api_key.is_none());
    }

    #[test]
    fn test_load_missing_file_uses_defaults() {
        let dir = tempfile::tempdir().expect("tempdir");
        let config = Config::load(Some(&dir.path().join("absent.json"))).expect("load");
        if std::env::var("WEBPUSH_TTL").is_err() {
            assert_eq!(config.default_ttl, DEFAULT_TTL);
        }
    }

    #[test]
    fn test_save_and_load_roundtrip() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("nested").join("config.json");

        let config = Config {
            vapid_subject: Some("mailto:ops@example.com".to_string()),
            gcm_api_key: Some("teststring".to_string()),
            default_ttl: 60,
            ..Config::default()
        };
        config.save(&path).expect("save");

        let content = fs::read_to_string(&path).expect("read");
        let loaded: Config = serde_json::from_str(&content).expect("parse");
        assert_eq!(loaded, config);

        #[cfg(unix)]
        {
            let mode = fs::metadata(&path).expect("metadata").permissions().mode();
            assert_eq!(mode & 0o777, 0o600);
        }
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let loaded: Config =
            serde_json::from_str(r#"{"vapid_subject":"mailto:a@b.c"}"#).expect("parse");
        assert_eq!(loaded.vapid_subject.as_deref(), Some("mailto:a@b.c"));
        assert_eq!(loaded.default_ttl, DEFAULT_TTL);
    }

    #[test]
    fn test_overrides() {
        let env: HashMap<&str, &str> = HashMap::from([
            ("WEBPUSH_VAPID_SUBJECT", "https://example.com"),
            ("WEBPUSH_GCM_API_KEY", "from-env"),
            ("WEBPUSH_TTL", "120"),
            ("WEBPUSH_VAPID_EXPIRATION", "not-a-number"),
        ]);
        let mut config = Config::default();
        config.apply_overrides(|key| env.get(key).map(ToString::to_string));

        assert_eq!(config.vapid_subject.as_deref(), Some("https://example.com"));
        assert_eq!(config.gcm_api_key.as_deref(), Some("from-env"));
        assert_eq!(config.default_ttl, 120);
        // Unparseable numbers are ignored.
        assert_eq!(config.vapid_expiration, DEFAULT_EXPIRATION_SECS);
    }
}

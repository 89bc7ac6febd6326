//! Cache settings on disk
//!
//! `<config_dir>/dircache/config.toml` holds the defaults a CI image ships
//! with. Command-line flags and `AWS_*` variables are layered on top by the
//! CLI; nothing here reads the environment.

pub mod schema;

pub use schema::{CacheSettings, Config, S3Settings};

use crate::error::{DircacheError, DircacheResult};
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, info, warn};

/// Reads and writes the settings file
pub struct ConfigManager {
    config_path: PathBuf,
}

impl ConfigManager {
    /// Manager for the per-user settings file
    pub fn new() -> Self {
        Self {
            config_path: Self::default_config_path(),
        }
    }

    /// Manager for an explicit file (`--config` / `DIRCACHE_CONFIG`)
    pub fn with_path(path: PathBuf) -> Self {
        Self { config_path: path }
    }

    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("dircache")
            .join("config.toml")
    }

    /// Read settings; a build image without a settings file gets defaults
    pub async fn load(&self) -> DircacheResult<Config> {
        let content = match fs::read_to_string(&self.config_path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("No settings at {}, using defaults", self.config_path.display());
                return Ok(Config::default());
            }
            Err(e) => {
                return Err(DircacheError::io(
                    format!("reading config from {}", self.config_path.display()),
                    e,
                ))
            }
        };

        let config: Config = toml::from_str(&content).map_err(|e| DircacheError::ConfigInvalid {
            path: self.config_path.clone(),
            reason: e.to_string(),
        })?;

        if config.cache.s3.secret_access_key.is_some() {
            self.check_secret_permissions().await;
        }
        Ok(config)
    }

    /// Write settings. Secrets are never written, so a saved file is safe to
    /// bake into an image.
    pub async fn save(&self, config: &Config) -> DircacheResult<()> {
        if let Some(parent) = self.config_path.parent() {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| DircacheError::ConfigDirCreate {
                    path: parent.to_path_buf(),
                    source: e,
                })?;
        }

        let content = toml::to_string_pretty(config)?;
        fs::write(&self.config_path, content).await.map_err(|e| {
            DircacheError::io(
                format!("writing config to {}", self.config_path.display()),
                e,
            )
        })?;

        info!("Configuration saved to {}", self.config_path.display());
        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.config_path
    }

    /// Warn when a file holding a secret key is readable by other users
    #[cfg(unix)]
    async fn check_secret_permissions(&self) {
        use std::os::unix::fs::PermissionsExt;

        if let Ok(meta) = fs::metadata(&self.config_path).await {
            if meta.permissions().mode() & 0o077 != 0 {
                warn!(
                    "{} holds a secret access key but is readable by other users",
                    self.config_path.display()
                );
            }
        }
    }

    #[cfg(not(unix))]
    async fn check_secret_permissions(&self) {}
}

impl Default for ConfigManager {
    fn default() -> Self {
        Self::new()
    }
}

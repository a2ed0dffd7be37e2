//! Locating and layering the SDK configuration
//!
//! A `Settings` value is built from the defaults, an optional TOML file, the
//! `SIMULA_*` environment and finally validation. Command-line flags are
//! applied by the binary on top of the result.

use crate::{Result, config::Settings};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Environment variable naming an explicit config file
pub const CONFIG_ENV_VAR: &str = "SIMULA_CONFIG";

/// Builds validated [`Settings`] from file and environment
#[derive(Debug)]
pub struct ConfigLoader {
    defaults: Settings,
}

impl ConfigLoader {
    pub fn new() -> Self {
        Self {
            defaults: Settings::default(),
        }
    }

    /// `$SIMULA_CONFIG` if it names an existing file, else
    /// `<config dir>/simula-ad/config.toml` if present
    pub fn get_config_path() -> Option<PathBuf> {
        if let Ok(raw) = std::env::var(CONFIG_ENV_VAR) {
            let path = PathBuf::from(raw);
            if path.exists() {
                debug!("Config file from {}: {:?}", CONFIG_ENV_VAR, path);
                return Some(path);
            }
            warn!("{} points to a missing file: {:?}", CONFIG_ENV_VAR, path);
        }

        let candidate = dirs::config_dir()?.join("simula-ad").join("config.toml");
        if candidate.exists() {
            debug!("Config file from the user config dir: {:?}", candidate);
            Some(candidate)
        } else {
            debug!("No SDK config file present");
            None
        }
    }

    /// Defaults, then `config_file` if it exists, then the environment
    ///
    /// A missing file is not an error; a malformed or invalid one is.
    pub fn load(&self, config_file: Option<&Path>) -> Result<Settings> {
        let base = match config_file {
            Some(path) if path.exists() => {
                info!("Reading SDK config {:?}", path);
                Settings::from_file(path)?
            }
            Some(path) => {
                warn!("SDK config {:?} not found, starting from defaults", path);
                self.defaults.clone()
            }
            None => self.defaults.clone(),
        };

        let settings = base.merge_with_env()?;
        settings.validate()?;
        debug!("Resolved settings: {:?}", settings);
        Ok(settings)
    }

    /// Like [`load`](Self::load), discovering the file when none is given
    pub fn load_discovered(&self, config_file: Option<&Path>) -> Result<Settings> {
        match config_file {
            Some(path) => self.load(Some(path)),
            None => self.load(Self::get_config_path().as_deref()),
        }
    }

    /// Settings from the environment alone
    pub fn from_env_only(&self) -> Result<Settings> {
        let settings = Settings::from_env()?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn defaults(&self) -> &Settings {
        &self.defaults
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ENV_TEST_MUTEX;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_defaults() {
        let loader = ConfigLoader::new();
        let defaults = loader.defaults();
        assert_eq!(defaults.viewability.duration_ms, 1000);
        assert_eq!(defaults.fetch.min_interval_ms, 1000);
    }

    #[test]
    fn test_load_from_file() {
        let _lock = ENV_TEST_MUTEX.lock().unwrap_or_else(|e| e.into_inner());

        let mut temp_file = NamedTempFile::new().unwrap();
        writeln!(
            temp_file,
            r#"
[api]
base_url = "http://127.0.0.1:9000"
dev_mode = true

[viewability]
threshold = 0.75
        "#
        )
        .unwrap();

        let loader = ConfigLoader::new();
        let settings = loader.load(Some(temp_file.path())).unwrap();

        assert_eq!(settings.api.base_url, "http://127.0.0.1:9000");
        assert!(settings.api.dev_mode);
        assert_eq!(settings.viewability.threshold, 0.75);
    }

    #[test]
    fn test_missing_file_uses_defaults() {
        let _lock = ENV_TEST_MUTEX.lock().unwrap_or_else(|e| e.into_inner());

        let loader = ConfigLoader::new();
        let settings = loader
            .load(Some(Path::new("/definitely/not/here/config.toml")))
            .unwrap();
        assert_eq!(settings.viewability.threshold, 0.5);
    }

    #[test]
    fn test_invalid_file_is_rejected() {
        let _lock = ENV_TEST_MUTEX.lock().unwrap_or_else(|e| e.into_inner());

        let mut temp_file = NamedTempFile::new().unwrap();
        writeln!(
            temp_file,
            r#"
[viewability]
threshold = 3.0
        "#
        )
        .unwrap();

        let loader = ConfigLoader::new();
        let result = loader.load(Some(temp_file.path()));
        assert!(matches!(result, Err(crate::Error::Config { .. })));
    }
}

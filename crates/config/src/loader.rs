//! Configuration loader for credmount
//!
//! Builds the startup `Settings` from defaults, an optional JSON file and the
//! `CREDMOUNT_*` environment variables, in that order of precedence.

use crate::settings::{
    Settings, OPT_LOG_LEVEL, OPT_STORE_ROOT, OPT_VAULT_DIR, OPT_VERIFY_TLS,
};
use credmount_core::{
    constants::{ENV_LOG_LEVEL, ENV_STORE_ROOT, ENV_VAULT_DIR, ENV_VERIFY_TLS},
    Error, Result,
};
use credmount_utils::XdgPaths;
use std::path::{Path, PathBuf};

/// File name of the settings file inside the config directory
pub const CONFIG_FILENAME: &str = "config.json";

/// Loader that assembles startup settings
pub struct ConfigLoader {
    /// Explicit settings file; must exist when given
    file: Option<PathBuf>,
    /// Whether to read the default settings file when no explicit one is set
    default_file: bool,
    /// Whether `CREDMOUNT_*` variables override file values
    use_env: bool,
}

impl ConfigLoader {
    /// Create a loader that reads the default file and the environment
    pub fn new() -> Self {
        Self {
            file: None,
            default_file: true,
            use_env: true,
        }
    }

    /// Read settings from this file instead of the default location
    pub fn file(mut self, path: impl Into<PathBuf>) -> Self {
        self.file = Some(path.into());
        self
    }

    /// Set whether the default settings file is consulted
    pub fn default_file(mut self, enabled: bool) -> Self {
        self.default_file = enabled;
        self
    }

    /// Set whether environment variables are applied
    pub fn use_env(mut self, enabled: bool) -> Self {
        self.use_env = enabled;
        self
    }

    /// Default settings file location
    pub fn default_path() -> PathBuf {
        XdgPaths::config_dir().join(CONFIG_FILENAME)
    }

    /// Load the settings
    pub fn load(self) -> Result<Settings> {
        let mut settings = match (&self.file, self.default_file) {
            (Some(path), _) => Self::read_file(path)?,
            (None, true) => {
                let path = Self::default_path();
                if path.is_file() {
                    Self::read_file(&path)?
                } else {
                    tracing::trace!(path = %path.display(), "no settings file found");
                    Settings::default()
                }
            }
            (None, false) => Settings::default(),
        };

        if self.use_env {
            Self::apply_env(&mut settings)?;
        }

        Ok(settings)
    }

    fn read_file(path: &Path) -> Result<Settings> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::file_system(path, "read settings file", e))?;
        let raw: serde_json::Map<String, serde_json::Value> = serde_json::from_str(&content)
            .map_err(|e| {
                Error::configuration(format!(
                    "settings file '{}' is not a JSON object: {e}",
                    path.display()
                ))
            })?;

        // Route every key through `set` so paths are expanded and types checked
        let mut settings = Settings::default();
        for (key, value) in raw {
            settings.set(&key, value)?;
        }
        tracing::debug!(path = %path.display(), "loaded settings file");
        Ok(settings)
    }

    fn apply_env(settings: &mut Settings) -> Result<()> {
        for (var, key) in [
            (ENV_STORE_ROOT, OPT_STORE_ROOT),
            (ENV_LOG_LEVEL, OPT_LOG_LEVEL),
            (ENV_VERIFY_TLS, OPT_VERIFY_TLS),
            (ENV_VAULT_DIR, OPT_VAULT_DIR),
        ] {
            if let Ok(value) = std::env::var(var) {
                settings
                    .set(key, serde_json::Value::String(value))
                    .map_err(|e| Error::configuration(format!("invalid {var}: {e}")))?;
            }
        }
        Ok(())
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

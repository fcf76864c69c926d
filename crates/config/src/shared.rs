//! Shared, mutable configuration handle

use crate::settings::{LogLevel, Settings, OPT_LOG_LEVEL};
use credmount_core::Result;
use parking_lot::RwLock;
use serde_json::Value;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

type LogLevelHook = Arc<dyn Fn(LogLevel) + Send + Sync>;

/// Cloneable handle to one process-wide `Settings` value.
///
/// Every clone sees every update. Readers take the lock per access, so a
/// change affects the next operation that reads it and never an operation
/// already holding a value it read earlier.
#[derive(Clone)]
pub struct SharedConfig {
    inner: Arc<RwLock<Settings>>,
    log_hook: Arc<RwLock<Option<LogLevelHook>>>,
}

impl SharedConfig {
    /// Wrap settings in a shared handle
    pub fn new(settings: Settings) -> Self {
        Self {
            inner: Arc::new(RwLock::new(settings)),
            log_hook: Arc::new(RwLock::new(None)),
        }
    }

    /// Register the callback that applies log level changes.
    ///
    /// The callback is invoked once immediately with the current level.
    pub fn on_log_level<F>(&self, hook: F)
    where
        F: Fn(LogLevel) + Send + Sync + 'static,
    {
        let level = self.log_level();
        hook(level);
        *self.log_hook.write() = Some(Arc::new(hook));
    }

    /// Snapshot of the current settings
    pub fn snapshot(&self) -> Settings {
        self.inner.read().clone()
    }

    /// Read a value out of the current settings
    pub fn read<T>(&self, f: impl FnOnce(&Settings) -> T) -> T {
        f(&self.inner.read())
    }

    /// Set one option by key
    pub fn set(&self, key: &str, value: Value) -> Result<()> {
        let level = {
            let mut settings = self.inner.write();
            settings.set(key, value)?;
            settings.log_level
        };
        if key == OPT_LOG_LEVEL {
            self.apply_log_level(level);
        }
        Ok(())
    }

    /// Set one option from its textual form
    pub fn set_str(&self, key: &str, raw: &str) -> Result<()> {
        let level = {
            let mut settings = self.inner.write();
            settings.set_str(key, raw)?;
            settings.log_level
        };
        if key == OPT_LOG_LEVEL {
            self.apply_log_level(level);
        }
        Ok(())
    }

    /// Change the log level, effective for the next log event
    pub fn set_log_level(&self, level: LogLevel) {
        self.inner.write().log_level = level;
        self.apply_log_level(level);
    }

    /// Current log level
    pub fn log_level(&self) -> LogLevel {
        self.inner.read().log_level
    }

    /// Configured store root, if any
    pub fn store_root(&self) -> Option<PathBuf> {
        self.inner.read().store_root.clone()
    }

    /// Whether the vault client verifies TLS certificates
    pub fn verify_tls(&self) -> bool {
        self.inner.read().verify_tls
    }

    /// Directory holding the vault client's configuration
    pub fn vault_dir(&self) -> PathBuf {
        self.inner.read().vault_dir.clone()
    }

    /// Program run to provision the tmpfs store
    pub fn mount_script(&self) -> String {
        self.inner.read().mount_script.clone()
    }

    /// Command line of the command-backed vault client
    pub fn vault_command(&self) -> Vec<String> {
        self.inner.read().vault_command.clone()
    }

    fn apply_log_level(&self, level: LogLevel) {
        let hook = self.log_hook.read().clone();
        if let Some(hook) = hook {
            hook(level);
        }
    }
}

impl Default for SharedConfig {
    fn default() -> Self {
        Self::new(Settings::default())
    }
}

impl fmt::Debug for SharedConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SharedConfig")
            .field("settings", &*self.inner.read())
            .finish_non_exhaustive()
    }
}

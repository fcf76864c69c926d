//! Process-wide settings read by every tier on each operation

use credmount_core::{Error, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

/// Option key for the local-store root directory
pub const OPT_STORE_ROOT: &str = "store_root";
/// Option key for the log verbosity
pub const OPT_LOG_LEVEL: &str = "log_level";
/// Option key for vault TLS verification
pub const OPT_VERIFY_TLS: &str = "verify_tls";
/// Option key for the vault client configuration directory
pub const OPT_VAULT_DIR: &str = "vault_dir";
/// Option key for the tmpfs provisioning program
pub const OPT_MOUNT_SCRIPT: &str = "mount_script";
/// Option key for the command-backed vault client
pub const OPT_VAULT_COMMAND: &str = "vault_command";

/// Log verbosity
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    #[default]
    Info,
    Warn,
    Error,
}

impl LogLevel {
    /// Filter directive understood by `tracing_subscriber::EnvFilter`
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Trace => "trace",
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
        }
    }
}

impl FromStr for LogLevel {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "trace" => Ok(Self::Trace),
            "debug" => Ok(Self::Debug),
            "info" => Ok(Self::Info),
            "warn" | "warning" => Ok(Self::Warn),
            "error" | "critical" => Ok(Self::Error),
            other => Err(Error::configuration(format!("unknown log level '{other}'"))),
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Recognized settings plus any unknown options kept verbatim
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Local-store root; `None` uses the platform backend's default
    pub store_root: Option<PathBuf>,

    /// Verbosity applied to log output
    pub log_level: LogLevel,

    /// Whether the vault client verifies TLS certificates
    pub verify_tls: bool,

    /// Directory holding the vault client's own configuration
    pub vault_dir: PathBuf,

    /// Program run to provision the tmpfs store
    pub mount_script: String,

    /// Program and leading arguments of the command-backed vault client
    pub vault_command: Vec<String>,

    /// Unknown options, stored for forward compatibility
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            store_root: None,
            log_level: LogLevel::default(),
            verify_tls: true,
            vault_dir: std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
            mount_script: credmount_core::TMPFS_MOUNT_SCRIPT.to_string(),
            vault_command: Vec::new(),
            extra: BTreeMap::new(),
        }
    }
}

impl Settings {
    /// Set a single option by key.
    ///
    /// Recognized keys are type-checked; anything else lands in `extra`.
    pub fn set(&mut self, key: &str, value: Value) -> Result<()> {
        match key {
            OPT_STORE_ROOT => {
                self.store_root = match value {
                    Value::Null => None,
                    other => Some(expand_path(key, &expect_string(key, other)?)),
                };
            }
            OPT_LOG_LEVEL => {
                self.log_level = expect_string(key, value)?.parse()?;
            }
            OPT_VERIFY_TLS => {
                self.verify_tls = expect_bool(key, value)?;
            }
            OPT_VAULT_DIR => {
                self.vault_dir = expand_path(key, &expect_string(key, value)?);
            }
            OPT_MOUNT_SCRIPT => {
                self.mount_script = expect_string(key, value)?;
            }
            OPT_VAULT_COMMAND => {
                self.vault_command = match value {
                    Value::String(s) => shell_words::split(&s).map_err(|e| {
                        Error::configuration(format!("option '{key}' is not a valid command line: {e}"))
                    })?,
                    Value::Array(items) => items
                        .into_iter()
                        .map(|item| expect_string(key, item))
                        .collect::<Result<_>>()?,
                    other => {
                        return Err(Error::configuration(format!(
                            "option '{key}' expects a string or a list of strings, got {other}"
                        )))
                    }
                };
            }
            _ => {
                tracing::debug!(option = %key, "storing unrecognized configuration option");
                self.extra.insert(key.to_string(), value);
            }
        }
        Ok(())
    }

    /// Set an option from its textual form, as given on a command line.
    ///
    /// The text is read as JSON when it parses, otherwise as a plain string.
    pub fn set_str(&mut self, key: &str, raw: &str) -> Result<()> {
        let value = serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()));
        self.set(key, value)
    }

    /// Look up an unrecognized option
    pub fn extra(&self, key: &str) -> Option<&Value> {
        self.extra.get(key)
    }
}

fn expect_string(key: &str, value: Value) -> Result<String> {
    match value {
        Value::String(s) => Ok(s),
        other => Err(Error::configuration(format!(
            "option '{key}' expects a string, got {other}"
        ))),
    }
}

fn expect_bool(key: &str, value: Value) -> Result<bool> {
    match value {
        Value::Bool(b) => Ok(b),
        Value::String(s) => match s.to_lowercase().as_str() {
            "true" | "1" | "yes" => Ok(true),
            "false" | "0" | "no" => Ok(false),
            _ => Err(Error::configuration(format!(
                "option '{key}' expects a boolean, got '{s}'"
            ))),
        },
        other => Err(Error::configuration(format!(
            "option '{key}' expects a boolean, got {other}"
        ))),
    }
}

fn expand_path(key: &str, raw: &str) -> PathBuf {
    let expanded = shellexpand::tilde(raw);
    tracing::trace!(option = %key, path = %expanded, "expanded configured path");
    PathBuf::from(expanded.as_ref())
}

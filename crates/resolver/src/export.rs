//! Shell environment files built from secrets

use crate::resolver::{GetOptions, SecretResolver};
use credmount_core::{Error, Result, SecretName, Secrets, ENV_VARS_FILENAME};
use credmount_utils::write_atomic_string;
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Where the values for an environment file come from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EnvMethod {
    /// The vault, through the cache; the local store is not used
    #[default]
    Vault,
    /// The regular tiered lookup, local store included
    Mount,
}

impl FromStr for EnvMethod {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "vault" => Ok(EnvMethod::Vault),
            "mount" | "mounted" | "tmpfs" => Ok(EnvMethod::Mount),
            other => Err(Error::configuration(format!(
                "env method '{other}' is not one of 'vault', 'mount'"
            ))),
        }
    }
}

/// One exported variable: `name` gets the value at `path` inside `secret`.
///
/// The first path element is a field name. Further elements walk into a
/// field whose value is a JSON object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnvVar {
    pub name: String,
    pub secret: SecretName,
    pub path: Vec<String>,
}

impl EnvVar {
    pub fn new<P, S>(name: impl Into<String>, secret: impl Into<SecretName>, path: P) -> Self
    where
        P: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name: name.into(),
            secret: secret.into(),
            path: path.into_iter().map(Into::into).collect(),
        }
    }
}

/// Parses `NAME=secret:field[.key...]`
impl FromStr for EnvVar {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let invalid = || {
            Error::configuration(format!(
                "invalid variable '{s}'; expected NAME=secret:field[.key...]"
            ))
        };
        let (name, target) = s.split_once('=').ok_or_else(invalid)?;
        let (secret, path) = target.rsplit_once(':').ok_or_else(invalid)?;
        if name.is_empty() || secret.is_empty() || path.is_empty() {
            return Err(invalid());
        }
        Ok(Self::new(name, secret, path.split('.')))
    }
}

impl SecretResolver {
    /// Write `export NAME='value'` lines for `vars` to `path`.
    ///
    /// `path` defaults to `credmount_env_vars.bash` in the current directory.
    /// Returns the absolute path of the written file.
    pub fn write_env_file(
        &self,
        method: EnvMethod,
        vars: &[EnvVar],
        path: Option<&Path>,
    ) -> Result<PathBuf> {
        if vars.is_empty() {
            return Err(Error::configuration(
                "no environment variables requested for the env file",
            ));
        }

        let names = vars.iter().map(|v| v.secret.clone());
        let secrets = match method {
            EnvMethod::Vault => self.resolve(names, false, true)?,
            EnvMethod::Mount => self.get_secrets(names, GetOptions::default())?,
        };

        let mut content = String::new();
        for var in vars {
            let value = lookup(&secrets, var)?;
            content.push_str(&format!("export {}={}\n", var.name, escape_shell_value(&value)));
        }

        let path = match path {
            Some(path) => path.to_path_buf(),
            None => std::env::current_dir()
                .map_err(|e| Error::file_system(".", "resolve current directory", e))?
                .join(ENV_VARS_FILENAME),
        };
        write_atomic_string(&path, &content)?;
        let path = std::fs::canonicalize(&path)
            .map_err(|e| Error::file_system(&path, "resolve env file path", e))?;

        tracing::info!(path = %path.display(), "created env file");
        tracing::info!(
            "source it from a shell script, then remove it: \
             ENV_VARS_FILE=\"{0}\"; source $ENV_VARS_FILE; rm $ENV_VARS_FILE",
            path.display()
        );
        tracing::warn!(path = %path.display(), "do not commit the env file; add it to .gitignore");
        if method == EnvMethod::Mount {
            tracing::warn!(
                "environment variables taken from the local store are not refreshed when a \
                 connection fails"
            );
        }
        Ok(path)
    }
}

fn lookup(secrets: &Secrets, var: &EnvVar) -> Result<String> {
    let missing = || {
        Error::configuration(format!(
            "variable '{}': secret '{}' has no value at '{}'",
            var.name,
            var.secret,
            var.path.join(".")
        ))
    };

    let (field, rest) = var.path.split_first().ok_or_else(missing)?;
    let value = secrets
        .field(var.secret.as_str(), field)
        .ok_or_else(missing)?;
    if rest.is_empty() {
        return Ok(value.to_string());
    }

    let mut current: Value = serde_json::from_str(value).map_err(|_| missing())?;
    for key in rest {
        current = current.get(key.as_str()).cloned().ok_or_else(missing)?;
    }
    Ok(match current {
        Value::String(s) => s,
        other => other.to_string(),
    })
}

/// Single-quote `value` for POSIX shells
fn escape_shell_value(value: &str) -> String {
    // Escape single quotes by replacing ' with '\''
    format!("'{}'", value.replace('\'', "'\\''"))
}

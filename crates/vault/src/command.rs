//! Vault client backed by an external program
//!
//! The program is given as `vault_command` in the configuration and is
//! invoked as:
//!
//! - `<program> <args..> find <name>`: prints a JSON array of records
//! - `<program> <args..> save`: reads one JSON record on stdin and prints the
//!   saved record
//!
//! The vault configuration directory and TLS verification flag are passed
//! through `CREDMOUNT_VAULT_DIR` and `CREDMOUNT_VERIFY_TLS`.

use crate::client::VaultClient;
use crate::record::RawRecord;
use credmount_config::SharedConfig;
use credmount_core::{Error, Result, SecretName, ENV_VAULT_DIR, ENV_VERIFY_TLS};
use credmount_utils::CommandExecutor;
use serde::de::DeserializeOwned;

pub struct CommandVault {
    config: SharedConfig,
    executor: Box<dyn CommandExecutor>,
}

impl CommandVault {
    pub fn new(config: SharedConfig, executor: Box<dyn CommandExecutor>) -> Self {
        Self { config, executor }
    }

    fn run<T: DeserializeOwned>(&self, operation: &[&str], input: Option<&[u8]>) -> Result<T> {
        let mut command_line = self.config.vault_command();
        if command_line.is_empty() {
            return Err(Error::configuration(
                "vault_command is not set; configure the vault client program",
            ));
        }
        let program = command_line.remove(0);
        let mut args = command_line;
        args.extend(operation.iter().map(|s| (*s).to_string()));

        let env = vec![
            (
                ENV_VAULT_DIR.to_string(),
                self.config.vault_dir().display().to_string(),
            ),
            (
                ENV_VERIFY_TLS.to_string(),
                self.config.verify_tls().to_string(),
            ),
        ];

        tracing::debug!(program = %program, operation = operation[0], "calling vault client");
        let output = self.executor.execute_with(&program, &args, &env, input)?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(Error::command_execution(
                program,
                args,
                stderr.trim().to_string(),
                output.status.code(),
            ));
        }

        serde_json::from_slice(&output.stdout).map_err(|e| {
            Error::vault(format!(
                "'{program}' returned an unreadable response to {}: {e}",
                operation[0]
            ))
        })
    }
}

impl VaultClient for CommandVault {
    fn find_by_name(&self, name: &SecretName) -> Result<Vec<RawRecord>> {
        self.run(&["find", name.as_str()], None)
    }

    fn save(&self, record: RawRecord) -> Result<RawRecord> {
        let body = serde_json::to_vec(&record)?;
        let saved: RawRecord = self.run(&["save"], Some(&body))?;
        tracing::info!(secret = %saved.title, "updated secret record in the vault");
        Ok(saved)
    }
}

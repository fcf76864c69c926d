//! One-file-per-secret local store

use crate::backend::{platform_backend, MountBackend, ProvisionResult};
use credmount_config::SharedConfig;
use credmount_core::{AccessState, Error, Result, SecretName, SecretRecord};
use credmount_utils::{write_atomic_string, CommandExecutor};
use std::path::PathBuf;

/// Persistent directory of `<name>.json` secret files.
///
/// The directory is shared with other processes and users. Writes replace
/// whole files, the last writer wins, and nothing here takes a lock.
pub struct LocalStore {
    backend: Box<dyn MountBackend>,
    config: SharedConfig,
}

impl LocalStore {
    /// Create a store over an explicit backend
    pub fn new(backend: Box<dyn MountBackend>, config: SharedConfig) -> Self {
        Self { backend, config }
    }

    /// Create a store over this platform's backend
    pub fn platform(config: SharedConfig, executor: Box<dyn CommandExecutor>) -> Self {
        let backend = platform_backend(config.clone(), executor);
        Self::new(backend, config)
    }

    /// Name of the backend in use
    pub fn backend_name(&self) -> &'static str {
        self.backend.name()
    }

    /// Current store root: the configured one or the backend default
    pub fn root(&self) -> PathBuf {
        self.config
            .store_root()
            .unwrap_or_else(|| self.backend.default_root())
    }

    /// File that holds `name`
    pub fn secret_path(&self, name: &SecretName) -> PathBuf {
        self.backend.secret_path_for(&self.root(), name)
    }

    /// Probe existence, then access
    pub fn probe(&self) -> Result<AccessState> {
        let root = self.root();
        if !self.backend.determine_exists(&root) {
            tracing::info!(root = %root.display(), "local store does not exist");
            return Ok(AccessState::Absent);
        }

        tracing::info!(root = %root.display(), "local store located");
        let state = if self.backend.determine_access(&root)? {
            tracing::info!(user = %current_user(), "user has permission to access local store");
            AccessState::PresentWithAccess
        } else {
            tracing::info!(
                user = %current_user(),
                "user does not have permission to access local store"
            );
            AccessState::PresentNoAccess
        };
        Ok(state)
    }

    /// Make sure the store exists when `build` is set, then report its state.
    ///
    /// Provisioning runs at most once per call and only when the store is
    /// absent. A permission refusal is logged and leaves the store absent;
    /// any other provisioning failure is returned as is.
    pub fn ensure_store(&self, build: bool) -> Result<AccessState> {
        let root = self.root();
        if !build || self.backend.determine_exists(&root) {
            return self.probe();
        }

        match self.backend.provision(&root) {
            ProvisionResult::Success => {
                tracing::debug!(backend = self.backend.name(), "local store provisioned");
            }
            ProvisionResult::PermissionDenied => {
                tracing::info!(
                    backend = self.backend.name(),
                    "no permission to build local store; using the vault only"
                );
            }
            ProvisionResult::Fatal(e) => return Err(e),
        }

        self.probe()
    }

    /// Read the stored record for `name`, if there is one.
    ///
    /// A file that does not parse as a flat string map is reported as
    /// malformed, which also covers a file caught mid-write by another
    /// process.
    pub fn read(&self, name: &SecretName) -> Result<Option<SecretRecord>> {
        let path = self.secret_path(name);
        let content = match std::fs::read(&path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(Error::file_system(&path, "read secret", e)),
        };

        let record = serde_json::from_slice::<SecretRecord>(&content)
            .map_err(|e| Error::malformed_store_record(name.as_str(), &path, e))?;
        Ok(Some(record))
    }

    /// Write `record` as the stored value of `name`
    pub fn write(&self, name: &SecretName, record: &SecretRecord) -> Result<()> {
        let path = self.secret_path(name);
        let mut content = serde_json::to_string(record)?;
        content.push('\n');
        write_atomic_string(&path, &content)?;
        tracing::debug!(path = %path.display(), "wrote secret to local store");
        Ok(())
    }
}

fn current_user() -> String {
    std::env::var("USER")
        .or_else(|_| std::env::var("USERNAME"))
        .unwrap_or_else(|_| "unknown".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hidden_dir::HiddenDirectory;
    use crate::testing::{ScriptedBackend, ScriptedOutcome};
    use credmount_config::OPT_STORE_ROOT;
    use credmount_utils::TestCommandExecutor;
    use serde_json::json;
    use tempfile::TempDir;

    fn hidden_store(root: &std::path::Path) -> LocalStore {
        let config = SharedConfig::default();
        config
            .set(OPT_STORE_ROOT, json!(root.to_string_lossy()))
            .unwrap();
        LocalStore::new(
            Box::new(HiddenDirectory::new(Box::new(TestCommandExecutor::new()))),
            config,
        )
    }

    fn record(pairs: &[(&str, &str)]) -> SecretRecord {
        pairs.iter().copied().collect()
    }

    #[test]
    fn test_write_then_read() {
        let dir = TempDir::new().unwrap();
        let store = hidden_store(dir.path());
        let name = SecretName::new("databridge-v2/postgres");
        let secret = record(&[("login", "svc"), ("password", "pw")]);

        assert!(store.read(&name).unwrap().is_none());
        store.write(&name, &secret).unwrap();

        assert_eq!(store.read(&name).unwrap(), Some(secret));
        assert!(dir.path().join("databridge-v2_postgres.json").is_file());
    }

    #[test]
    fn test_file_format_is_flat_json_with_newline() {
        let dir = TempDir::new().unwrap();
        let store = hidden_store(dir.path());
        let name = SecretName::new("api");

        store
            .write(&name, &record(&[("token", "abc"), ("host", "example.org")]))
            .unwrap();

        let content = std::fs::read_to_string(dir.path().join("api.json")).unwrap();
        assert_eq!(content, "{\"token\":\"abc\",\"host\":\"example.org\"}\n");
    }

    #[test]
    fn test_overwrite_replaces_file() {
        let dir = TempDir::new().unwrap();
        let store = hidden_store(dir.path());
        let name = SecretName::new("api");

        store.write(&name, &record(&[("token", "old")])).unwrap();
        store.write(&name, &record(&[("token", "new")])).unwrap();

        assert_eq!(store.read(&name).unwrap().unwrap().get("token"), Some("new"));
    }

    #[test]
    fn test_malformed_file_is_reported() {
        let dir = TempDir::new().unwrap();
        let store = hidden_store(dir.path());
        std::fs::write(dir.path().join("api.json"), "{\"token\": \"ab").unwrap();

        let err = store.read(&SecretName::new("api")).unwrap_err();
        match err {
            Error::MalformedStoreRecord { name, path, .. } => {
                assert_eq!(name, "api");
                assert_eq!(path, dir.path().join("api.json"));
            }
            other => panic!("expected malformed record error, got {other}"),
        }
    }

    #[test]
    fn test_empty_file_is_malformed() {
        let dir = TempDir::new().unwrap();
        let store = hidden_store(dir.path());
        std::fs::write(dir.path().join("api.json"), "").unwrap();

        assert!(matches!(
            store.read(&SecretName::new("api")),
            Err(Error::MalformedStoreRecord { .. })
        ));
    }

    #[test]
    fn test_non_utf8_file_is_malformed() {
        let dir = TempDir::new().unwrap();
        let store = hidden_store(dir.path());
        std::fs::write(dir.path().join("api.json"), [0xff, 0xfe, b'{']).unwrap();

        assert!(matches!(
            store.read(&SecretName::new("api")),
            Err(Error::MalformedStoreRecord { .. })
        ));
    }

    #[test]
    fn test_root_follows_configuration_changes() {
        let first = TempDir::new().unwrap();
        let second = TempDir::new().unwrap();
        let store = hidden_store(first.path());
        let name = SecretName::new("api");

        store.write(&name, &record(&[("token", "one")])).unwrap();
        store
            .config
            .set(OPT_STORE_ROOT, json!(second.path().to_string_lossy()))
            .unwrap();

        assert_eq!(store.root(), second.path());
        assert!(store.read(&name).unwrap().is_none());
    }

    #[test]
    fn test_probe_states() {
        let dir = TempDir::new().unwrap();
        let backend = ScriptedBackend::absent(dir.path().join("store"));
        let handle = backend.clone();
        let store = LocalStore::new(Box::new(backend), SharedConfig::default());

        assert_eq!(store.probe().unwrap(), AccessState::Absent);
        handle.make_present(false);
        assert_eq!(store.probe().unwrap(), AccessState::PresentNoAccess);
        handle.make_present(true);
        assert_eq!(store.probe().unwrap(), AccessState::PresentWithAccess);
    }

    #[test]
    fn test_ensure_store_without_build_never_provisions() {
        let dir = TempDir::new().unwrap();
        let backend = ScriptedBackend::absent(dir.path().join("store"));
        let handle = backend.clone();
        let store = LocalStore::new(Box::new(backend), SharedConfig::default());

        assert_eq!(store.ensure_store(false).unwrap(), AccessState::Absent);
        assert_eq!(handle.provision_calls(), 0);
    }

    #[test]
    fn test_ensure_store_builds_once_and_is_idempotent() {
        let dir = TempDir::new().unwrap();
        let backend = ScriptedBackend::absent(dir.path().join("store"));
        let handle = backend.clone();
        let store = LocalStore::new(Box::new(backend), SharedConfig::default());

        assert_eq!(
            store.ensure_store(true).unwrap(),
            AccessState::PresentWithAccess
        );
        assert_eq!(
            store.ensure_store(true).unwrap(),
            AccessState::PresentWithAccess
        );
        assert_eq!(handle.provision_calls(), 1);
    }

    #[test]
    fn test_ensure_store_permission_denied_is_soft() {
        let dir = TempDir::new().unwrap();
        let backend = ScriptedBackend::absent(dir.path().join("store"));
        backend.set_outcome(ScriptedOutcome::PermissionDenied);
        let handle = backend.clone();
        let store = LocalStore::new(Box::new(backend), SharedConfig::default());

        assert_eq!(store.ensure_store(true).unwrap(), AccessState::Absent);
        assert_eq!(handle.provision_calls(), 1);
    }

    #[test]
    fn test_ensure_store_fatal_propagates_unmodified() {
        let dir = TempDir::new().unwrap();
        let backend = ScriptedBackend::absent(dir.path().join("store"));
        backend.set_outcome(ScriptedOutcome::Fatal("mount helper missing".into()));
        let store = LocalStore::new(Box::new(backend), SharedConfig::default());

        match store.ensure_store(true).unwrap_err() {
            Error::ProvisioningFatal { backend, message } => {
                assert_eq!(backend, "scripted");
                assert_eq!(message, "mount helper missing");
            }
            other => panic!("expected fatal provisioning error, got {other}"),
        }
    }
}

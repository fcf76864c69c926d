#![allow(dead_code)]

use credmount_config::SharedConfig;
use credmount_resolver::{SecretName, SecretRecord, SecretResolver};
use credmount_store::testing::ScriptedBackend;
use credmount_store::LocalStore;
use credmount_vault::MemoryVault;
use std::path::PathBuf;
use tempfile::TempDir;

/// A resolver over an in-memory vault and a scripted local store
pub struct Harness {
    pub dir: TempDir,
    pub vault: MemoryVault,
    pub backend: ScriptedBackend,
    pub resolver: SecretResolver,
}

impl Harness {
    /// Local store present, with or without access
    pub fn with_store(access: bool) -> Self {
        let dir = TempDir::new().unwrap();
        let backend = ScriptedBackend::present(dir.path().join("store"), access).unwrap();
        Self::build(dir, backend)
    }

    /// Local store absent; provisioning creates it unless scripted otherwise
    pub fn without_store() -> Self {
        let dir = TempDir::new().unwrap();
        let backend = ScriptedBackend::absent(dir.path().join("store"));
        Self::build(dir, backend)
    }

    fn build(dir: TempDir, backend: ScriptedBackend) -> Self {
        let vault = MemoryVault::new();
        let config = SharedConfig::default();
        let store = LocalStore::new(Box::new(backend.clone()), config.clone());
        let resolver = SecretResolver::new(Box::new(vault.clone()), store, config).unwrap();
        Self {
            dir,
            vault,
            backend,
            resolver,
        }
    }

    pub fn store_path(&self, name: &str) -> PathBuf {
        self.resolver.store().secret_path(&SecretName::new(name))
    }

    /// Place a record in the local store directly
    pub fn seed_store(&self, name: &str, pairs: &[(&str, &str)]) {
        self.resolver
            .store()
            .write(&SecretName::new(name), &record(pairs))
            .unwrap();
    }

    pub fn stored(&self, name: &str) -> Option<SecretRecord> {
        self.resolver.store().read(&SecretName::new(name)).unwrap()
    }

    pub fn cached(&self, name: &str) -> Option<SecretRecord> {
        self.resolver.cache().get(&SecretName::new(name))
    }
}

pub fn record(pairs: &[(&str, &str)]) -> SecretRecord {
    pairs.iter().copied().collect()
}

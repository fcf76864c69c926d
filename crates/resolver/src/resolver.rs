//! Tiered secret resolution
//!
//! Each requested name is looked up in the cache, then the local store, then
//! the vault, stopping at the first tier that has it. Hits below the cache
//! are written back up:
//!
//! | found in | cache | local store      |
//! |----------|-------|------------------|
//! | cache    | -     | -                |
//! | store    | write | -                |
//! | vault    | write | write if usable  |

use crate::cache::SecretCache;
use credmount_config::{LogLevel, Settings, SharedConfig, OPT_STORE_ROOT};
use credmount_core::{AccessState, Result, SecretName, SecretRecord, Secrets};
use credmount_store::LocalStore;
use credmount_vault::{fetch_unique, RawRecord, VaultClient};
use indexmap::IndexSet;
use parking_lot::Mutex;
use serde_json::Value;
use std::path::PathBuf;

/// Options for [`SecretResolver::get_secrets`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GetOptions {
    /// Provision the local store when it is absent, and use it when usable
    pub build: bool,
    /// Consult the cache before the other tiers
    pub search_cache: bool,
}

impl Default for GetOptions {
    fn default() -> Self {
        Self {
            build: true,
            search_cache: true,
        }
    }
}

/// Access state together with the store root it was probed for
#[derive(Debug, Clone)]
struct Probe {
    root: PathBuf,
    state: AccessState,
}

/// Resolves secrets through cache, local store and vault
pub struct SecretResolver {
    vault: Box<dyn VaultClient>,
    store: LocalStore,
    config: SharedConfig,
    cache: SecretCache,
    access: Mutex<Probe>,
}

impl SecretResolver {
    /// Create a resolver and probe the local store once
    pub fn new(
        vault: Box<dyn VaultClient>,
        store: LocalStore,
        config: SharedConfig,
    ) -> Result<Self> {
        let root = store.root();
        let state = store.probe()?;
        tracing::debug!(access = %state, backend = store.backend_name(), "resolver ready");
        Ok(Self {
            vault,
            store,
            config,
            cache: SecretCache::new(),
            access: Mutex::new(Probe { root, state }),
        })
    }

    /// Access state as of the last probe
    pub fn access_state(&self) -> AccessState {
        self.access.lock().state
    }

    /// Access state for the current store root, probing again if the root
    /// changed since the last probe
    pub(crate) fn current_access(&self) -> Result<AccessState> {
        {
            let probe = self.access.lock();
            if probe.root == self.store.root() {
                return Ok(probe.state);
            }
        }
        tracing::debug!(root = %self.store.root().display(), "store root changed; probing again");
        self.ensure_store(false)
    }

    pub fn store(&self) -> &LocalStore {
        &self.store
    }

    pub fn cache(&self) -> &SecretCache {
        &self.cache
    }

    pub(crate) fn vault(&self) -> &dyn VaultClient {
        self.vault.as_ref()
    }

    /// Provision the local store if asked and absent, then re-probe
    pub fn ensure_store(&self, build: bool) -> Result<AccessState> {
        let root = self.store.root();
        let state = self.store.ensure_store(build)?;
        *self.access.lock() = Probe { root, state };
        Ok(state)
    }

    /// Resolve `names` with explicit tier switches.
    ///
    /// Duplicate names are resolved once; the result keeps first-occurrence
    /// order. Any failure fails the whole call.
    pub fn resolve<I, N>(&self, names: I, use_store: bool, use_cache: bool) -> Result<Secrets>
    where
        I: IntoIterator<Item = N>,
        N: Into<SecretName>,
    {
        distinct(names)
            .into_iter()
            .map(|name| {
                let record = self.resolve_one(&name, use_store, use_cache)?;
                Ok((name, record))
            })
            .collect()
    }

    /// Resolve `names`, provisioning and using the local store per `options`
    pub fn get_secrets<I, N>(&self, names: I, options: GetOptions) -> Result<Secrets>
    where
        I: IntoIterator<Item = N>,
        N: Into<SecretName>,
    {
        let use_store = if options.build {
            let mut state = self.current_access()?;
            if state == AccessState::Absent {
                state = self.ensure_store(true)?;
            }
            state.is_usable()
        } else {
            false
        };

        self.resolve(names, use_store, options.search_cache)
    }

    /// Fetch the raw vault record for `name`
    pub fn vault_record(&self, name: impl Into<SecretName>) -> Result<RawRecord> {
        fetch_unique(self.vault(), &name.into())
    }

    /// Set fields of the vault record `name` and save it.
    ///
    /// Each update overwrites a standard field of that name, else a custom
    /// one, else appends a custom text field. The vault's saved copy is
    /// parsed, cached and, when the local store is usable, written there.
    pub fn update_secret<I, K, V>(
        &self,
        name: impl Into<SecretName>,
        updates: I,
    ) -> Result<SecretRecord>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let name = name.into();
        let mut raw = fetch_unique(self.vault(), &name)?;
        for (field, value) in updates {
            let section = raw.apply_update(field.as_ref(), value.as_ref());
            tracing::debug!(
                secret = %name,
                field = field.as_ref(),
                section = section.as_str(),
                "field updated"
            );
        }

        // Refuse to save a record that could not be read back
        raw.parse()?;
        let saved = self.vault.save(raw)?;
        let record = saved.parse()?;
        tracing::info!(secret = %name, "updated secret record in the vault");

        self.cache.insert(name.clone(), record.clone());
        if self.current_access()?.is_usable() {
            self.store.write(&name, &record)?;
        }
        Ok(record)
    }

    /// Snapshot of the current settings
    pub fn config(&self) -> Settings {
        self.config.snapshot()
    }

    pub fn shared_config(&self) -> &SharedConfig {
        &self.config
    }

    /// Set one option; it applies from the next operation on.
    ///
    /// Changing `store_root` probes the new root straight away.
    pub fn set_config(&self, key: &str, value: Value) -> Result<()> {
        self.config.set(key, value)?;
        if key == OPT_STORE_ROOT {
            self.ensure_store(false)?;
        }
        Ok(())
    }

    pub fn set_log_level(&self, level: LogLevel) {
        self.config.set_log_level(level);
    }

    fn resolve_one(
        &self,
        name: &SecretName,
        use_store: bool,
        use_cache: bool,
    ) -> Result<SecretRecord> {
        if use_cache {
            if let Some(record) = self.cache.get(name) {
                tracing::debug!(secret = %name, "secret found in cache");
                return Ok(record);
            }
        }

        if use_store {
            if let Some(record) = self.store.read(name)? {
                tracing::debug!(secret = %name, "secret found in local store");
                self.cache.insert(name.clone(), record.clone());
                return Ok(record);
            }
        }

        let record = self.fetch_from_vault(name)?;
        self.cache.insert(name.clone(), record.clone());
        if use_store {
            self.store.write(name, &record)?;
        }
        Ok(record)
    }

    /// Fetch and parse `name` from the vault without touching other tiers
    pub(crate) fn fetch_from_vault(&self, name: &SecretName) -> Result<SecretRecord> {
        fetch_unique(self.vault(), name)?.parse()
    }
}

/// Convert and de-duplicate names, keeping first occurrences in order
pub(crate) fn distinct<I, N>(names: I) -> IndexSet<SecretName>
where
    I: IntoIterator<Item = N>,
    N: Into<SecretName>,
{
    names.into_iter().map(Into::into).collect()
}

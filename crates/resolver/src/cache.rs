//! Process-lifetime secret cache

use credmount_core::{SecretName, SecretRecord};
use indexmap::IndexMap;
use parking_lot::Mutex;

/// Resolved records keyed by secret name.
///
/// Entries are written through from the store and vault tiers and never
/// expire; the cache lives exactly as long as its resolver.
#[derive(Debug, Default)]
pub struct SecretCache {
    entries: Mutex<IndexMap<SecretName, SecretRecord>>,
}

impl SecretCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &SecretName) -> Option<SecretRecord> {
        self.entries.lock().get(name).cloned()
    }

    /// Insert or replace the entry for `name`
    pub fn insert(&self, name: SecretName, record: SecretRecord) {
        self.entries.lock().insert(name, record);
    }

    pub fn contains(&self, name: &SecretName) -> bool {
        self.entries.lock().contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_replaces() {
        let cache = SecretCache::new();
        let name = SecretName::new("api");
        assert!(cache.get(&name).is_none());

        cache.insert(name.clone(), [("token", "one")].into_iter().collect());
        cache.insert(name.clone(), [("token", "two")].into_iter().collect());

        assert_eq!(cache.len(), 1);
        assert_eq!(cache.get(&name).unwrap().get("token"), Some("two"));
    }
}

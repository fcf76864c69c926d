//! Vault client seam

use crate::record::RawRecord;
use credmount_core::{Error, Result, SecretName};

/// System of record for secrets.
///
/// Implementations look records up by exact title and persist edited
/// records, returning the vault's canonical copy.
pub trait VaultClient: Send + Sync {
    /// Every record whose title is exactly `name`
    fn find_by_name(&self, name: &SecretName) -> Result<Vec<RawRecord>>;

    /// Persist `record` and return it as the vault now holds it
    fn save(&self, record: RawRecord) -> Result<RawRecord>;
}

/// Fetch the single record titled `name`.
///
/// Zero matches and several matches are both `NotFound`, carrying the
/// match count so the two cases read differently.
pub fn fetch_unique(vault: &dyn VaultClient, name: &SecretName) -> Result<RawRecord> {
    let mut records = vault.find_by_name(name)?;
    if records.len() != 1 {
        return Err(Error::not_found(name.as_str(), records.len()));
    }
    let record = records.remove(0);
    tracing::info!(secret = %name, "retrieved secret record from the vault");
    Ok(record)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryVault;

    fn record(uid: &str, title: &str) -> RawRecord {
        RawRecord {
            uid: uid.to_string(),
            title: title.to_string(),
            fields: Vec::new(),
            custom: Vec::new(),
        }
    }

    #[test]
    fn test_fetch_unique_single_match() {
        let vault = MemoryVault::new();
        vault.insert(record("1", "api"));

        let found = fetch_unique(&vault, &SecretName::new("api")).unwrap();
        assert_eq!(found.uid, "1");
    }

    #[test]
    fn test_fetch_unique_missing() {
        let vault = MemoryVault::new();
        let err = fetch_unique(&vault, &SecretName::new("api")).unwrap_err();

        assert!(matches!(err, Error::NotFound { matches: 0, .. }));
        assert!(err.to_string().contains("'api'"));
        assert!(err.to_string().contains("not found"));
    }

    #[test]
    fn test_fetch_unique_ambiguous() {
        let vault = MemoryVault::new();
        vault.insert(record("1", "api"));
        vault.insert(record("2", "api"));

        let err = fetch_unique(&vault, &SecretName::new("api")).unwrap_err();
        assert!(matches!(err, Error::NotFound { matches: 2, .. }));
        assert!(err.to_string().contains("'api'"));
        assert!(err.to_string().contains("2 records"));
    }

    #[test]
    fn test_title_match_is_exact() {
        let vault = MemoryVault::new();
        vault.insert(record("1", "api-prod"));

        let err = fetch_unique(&vault, &SecretName::new("api")).unwrap_err();
        assert!(err.is_not_found());
    }
}

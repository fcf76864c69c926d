use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::borrow::Borrow;
use std::fmt;
use std::ops::Deref;
use zeroize::Zeroize;

/// Identifier shared by the vault, the cache and the local store
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SecretName(String);

impl SecretName {
    /// Create a new secret name
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Borrow the name as a string slice
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// File stem used for this secret in a local store.
    ///
    /// Every character in `separators` is replaced with `_` so the name can
    /// never escape the store root.
    #[must_use]
    pub fn storage_name(&self, separators: &[char]) -> String {
        self.0
            .chars()
            .map(|c| if separators.contains(&c) { '_' } else { c })
            .collect()
    }
}

impl fmt::Display for SecretName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for SecretName {
    fn from(name: &str) -> Self {
        Self(name.to_string())
    }
}

impl From<String> for SecretName {
    fn from(name: String) -> Self {
        Self(name)
    }
}

impl From<&String> for SecretName {
    fn from(name: &String) -> Self {
        Self(name.clone())
    }
}

impl Borrow<str> for SecretName {
    fn borrow(&self) -> &str {
        &self.0
    }
}

/// Resolved credential fields of one secret.
///
/// Each field holds exactly one value. Field order follows the vault record
/// (or the stored file) and values are wiped from memory on drop.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SecretRecord(IndexMap<String, String>);

impl SecretRecord {
    /// Create an empty record
    #[must_use]
    pub fn new() -> Self {
        Self(IndexMap::new())
    }

    /// Insert a field, returning the previous value if any
    pub fn insert(&mut self, field: impl Into<String>, value: impl Into<String>) -> Option<String> {
        self.0.insert(field.into(), value.into())
    }

    /// Get a field value
    #[must_use]
    pub fn get(&self, field: &str) -> Option<&str> {
        self.0.get(field).map(String::as_str)
    }

    /// Number of fields
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Check if the record has no fields
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterate over `(field, value)` pairs in record order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Field names in record order
    pub fn fields(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }
}

impl fmt::Debug for SecretRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Field names only, values never reach logs
        f.debug_set().entries(self.0.keys()).finish()
    }
}

impl Drop for SecretRecord {
    fn drop(&mut self) {
        for value in self.0.values_mut() {
            value.zeroize();
        }
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for SecretRecord {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

/// Batch of resolved secrets keyed by name, in request order
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Secrets(IndexMap<SecretName, SecretRecord>);

impl Secrets {
    /// Create an empty batch
    #[must_use]
    pub fn new() -> Self {
        Self(IndexMap::new())
    }

    /// Insert a resolved secret
    pub fn insert(&mut self, name: SecretName, record: SecretRecord) -> Option<SecretRecord> {
        self.0.insert(name, record)
    }

    /// Look up a resolved secret by name
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&SecretRecord> {
        self.0.get(name)
    }

    /// Look up a single field of a resolved secret
    #[must_use]
    pub fn field(&self, name: &str, field: &str) -> Option<&str> {
        self.get(name).and_then(|record| record.get(field))
    }

    /// Consume the batch into its map
    #[must_use]
    pub fn into_inner(self) -> IndexMap<SecretName, SecretRecord> {
        self.0
    }
}

impl Deref for Secrets {
    type Target = IndexMap<SecretName, SecretRecord>;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl IntoIterator for Secrets {
    type Item = (SecretName, SecretRecord);
    type IntoIter = indexmap::map::IntoIter<SecretName, SecretRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl FromIterator<(SecretName, SecretRecord)> for Secrets {
    fn from_iter<I: IntoIterator<Item = (SecretName, SecretRecord)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Whether the local store exists and is usable by this process
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccessState {
    /// The store does not exist
    Absent,
    /// The store exists but listing it was refused
    PresentNoAccess,
    /// The store exists and can be read and written
    PresentWithAccess,
}

impl AccessState {
    /// Whether the store may be consulted and written
    #[must_use]
    pub const fn is_usable(&self) -> bool {
        matches!(self, Self::PresentWithAccess)
    }

    /// Whether the store exists, accessible or not
    #[must_use]
    pub const fn exists(&self) -> bool {
        !matches!(self, Self::Absent)
    }

    /// Stable lowercase label
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Absent => "absent",
            Self::PresentNoAccess => "present_no_access",
            Self::PresentWithAccess => "present_with_access",
        }
    }
}

impl fmt::Display for AccessState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_storage_name_replaces_separators() {
        let name = SecretName::new("databridge-v2/rds\\hostname");
        assert_eq!(name.storage_name(&['/']), "databridge-v2_rds\\hostname");
        assert_eq!(name.storage_name(&['/', '\\']), "databridge-v2_rds_hostname");
    }

    #[test]
    fn test_storage_name_never_contains_separators() {
        use proptest::prelude::*;

        proptest!(|(raw in "[a-zA-Z0-9 _./\\\\-]{0,40}")| {
            let stored = SecretName::new(raw.clone()).storage_name(&['/', '\\']);
            prop_assert!(!stored.contains('/'));
            prop_assert!(!stored.contains('\\'));
            prop_assert_eq!(stored.chars().count(), raw.chars().count());
        });
    }

    #[test]
    fn test_record_serializes_as_flat_object_in_order() {
        let record: SecretRecord = [("login", "svc"), ("password", "hunter2"), ("host", "db")]
            .into_iter()
            .collect();
        let json = serde_json::to_string(&record).unwrap();
        assert_eq!(json, r#"{"login":"svc","password":"hunter2","host":"db"}"#);

        let parsed: SecretRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, record);
        assert_eq!(parsed.fields().collect::<Vec<_>>(), ["login", "password", "host"]);
    }

    #[test]
    fn test_record_rejects_non_string_values() {
        assert!(serde_json::from_str::<SecretRecord>(r#"{"port": 5432}"#).is_err());
        assert!(serde_json::from_str::<SecretRecord>(r#"["a"]"#).is_err());
    }

    #[test]
    fn test_record_debug_hides_values() {
        let record: SecretRecord = [("password", "hunter2")].into_iter().collect();
        let debug = format!("{record:?}");
        assert!(debug.contains("password"));
        assert!(!debug.contains("hunter2"));
    }

    #[test]
    fn test_secrets_lookup_by_str() {
        let mut secrets = Secrets::new();
        secrets.insert(
            SecretName::from("db"),
            [("login", "svc")].into_iter().collect(),
        );
        assert_eq!(secrets.field("db", "login"), Some("svc"));
        assert_eq!(secrets.field("db", "password"), None);
        assert!(secrets.get("api").is_none());
    }

    #[test]
    fn test_access_state_predicates() {
        assert!(AccessState::PresentWithAccess.is_usable());
        assert!(!AccessState::PresentNoAccess.is_usable());
        assert!(AccessState::PresentNoAccess.exists());
        assert!(!AccessState::Absent.exists());
        assert_eq!(AccessState::Absent.to_string(), "absent");
    }
}

//! In-memory vault for tests

use crate::client::VaultClient;
use crate::record::{RawField, RawRecord, CUSTOM_FIELD_TYPE};
use credmount_core::{Error, Result, SecretName};
use parking_lot::Mutex;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;

#[derive(Debug, Default)]
struct State {
    records: Vec<RawRecord>,
    find_calls: HashMap<String, usize>,
    save_calls: usize,
    save_error: Option<String>,
    next_uid: usize,
}

/// Vault holding records in memory and counting every call.
///
/// Clones share the same records and counters.
#[derive(Debug, Clone, Default)]
pub struct MemoryVault {
    state: Arc<Mutex<State>>,
}

impl MemoryVault {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `record` as given
    pub fn insert(&self, record: RawRecord) {
        self.state.lock().records.push(record);
    }

    /// Store a record titled `title` with one labelled text field per pair
    pub fn add_secret(&self, title: &str, pairs: &[(&str, &str)]) -> String {
        let mut state = self.state.lock();
        state.next_uid += 1;
        let uid = format!("memory-{}", state.next_uid);
        state.records.push(RawRecord {
            uid: uid.clone(),
            title: title.to_string(),
            fields: Vec::new(),
            custom: pairs
                .iter()
                .map(|(label, value)| RawField {
                    field_type: CUSTOM_FIELD_TYPE.to_string(),
                    label: Some((*label).to_string()),
                    value: vec![Value::String((*value).to_string())],
                })
                .collect(),
        });
        uid
    }

    /// Change one field of every record titled `title`, as a rotation would
    pub fn rotate(&self, title: &str, field: &str, value: &str) {
        let mut state = self.state.lock();
        for record in state.records.iter_mut().filter(|r| r.title == title) {
            record.apply_update(field, value);
        }
    }

    /// Make every later `save` fail with `message`
    pub fn fail_saves(&self, message: &str) {
        self.state.lock().save_error = Some(message.to_string());
    }

    /// Lookups made for `name`
    pub fn find_calls(&self, name: &str) -> usize {
        self.state.lock().find_calls.get(name).copied().unwrap_or(0)
    }

    /// Lookups made for any name
    pub fn total_find_calls(&self) -> usize {
        self.state.lock().find_calls.values().sum()
    }

    pub fn save_calls(&self) -> usize {
        self.state.lock().save_calls
    }

    /// Current copy of the record with `uid`
    pub fn record(&self, uid: &str) -> Option<RawRecord> {
        self.state
            .lock()
            .records
            .iter()
            .find(|r| r.uid == uid)
            .cloned()
    }
}

impl VaultClient for MemoryVault {
    fn find_by_name(&self, name: &SecretName) -> Result<Vec<RawRecord>> {
        let mut state = self.state.lock();
        *state.find_calls.entry(name.as_str().to_string()).or_default() += 1;
        Ok(state
            .records
            .iter()
            .filter(|r| r.title == name.as_str())
            .cloned()
            .collect())
    }

    fn save(&self, record: RawRecord) -> Result<RawRecord> {
        let mut state = self.state.lock();
        state.save_calls += 1;
        if let Some(message) = &state.save_error {
            return Err(Error::vault(message.clone()));
        }
        let Some(slot) = state.records.iter_mut().find(|r| r.uid == record.uid) else {
            return Err(Error::vault(format!("no record with uid '{}'", record.uid)));
        };
        *slot = record;
        Ok(slot.clone())
    }
}

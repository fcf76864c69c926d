//! Vault record shapes and their flattening into `SecretRecord`

use credmount_core::{Error, Result, SecretRecord};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Type given to custom fields appended by an update
pub const CUSTOM_FIELD_TYPE: &str = "text";

/// One field of a vault record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawField {
    #[serde(rename = "type")]
    pub field_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(default)]
    pub value: Vec<Value>,
}

impl RawField {
    /// Name under which the field is exposed: the label, else the type
    pub fn name(&self) -> &str {
        self.label.as_deref().unwrap_or(&self.field_type)
    }
}

/// A record as the vault stores it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawRecord {
    pub uid: String,
    pub title: String,
    #[serde(default)]
    pub fields: Vec<RawField>,
    #[serde(default)]
    pub custom: Vec<RawField>,
}

/// Which list a field lives in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Section {
    Fields,
    Custom,
}

impl Section {
    pub fn as_str(self) -> &'static str {
        match self {
            Section::Fields => "fields",
            Section::Custom => "custom",
        }
    }
}

impl RawRecord {
    /// Flatten into a field-name to value map.
    ///
    /// Standard fields come first, then custom ones; a later field with the
    /// same name replaces an earlier one. Fields without a value are skipped
    /// and a field with more than one value fails the whole record.
    pub fn parse(&self) -> Result<SecretRecord> {
        let mut record = SecretRecord::new();
        for (section, fields) in [(Section::Fields, &self.fields), (Section::Custom, &self.custom)] {
            for field in fields {
                match field.value.as_slice() {
                    [] => {}
                    [value] => {
                        record.insert(field.name(), value_text(value));
                    }
                    _ => {
                        return Err(Error::multi_value(
                            &self.title,
                            section.as_str(),
                            field.name(),
                        ))
                    }
                }
            }
        }
        Ok(record)
    }

    /// Set `name` to `value`.
    ///
    /// A standard field with that name is overwritten first, then a custom
    /// one; otherwise a new custom text field is appended.
    pub fn apply_update(&mut self, name: &str, value: &str) -> Section {
        let value = vec![Value::String(value.to_string())];
        if let Some(field) = self.fields.iter_mut().find(|f| f.name() == name) {
            field.value = value;
            return Section::Fields;
        }
        if let Some(field) = self.custom.iter_mut().find(|f| f.name() == name) {
            field.value = value;
            return Section::Custom;
        }
        self.custom.push(RawField {
            field_type: CUSTOM_FIELD_TYPE.to_string(),
            label: Some(name.to_string()),
            value,
        });
        Section::Custom
    }
}

fn value_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        // Scalars print bare; objects and arrays as compact JSON
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn field(field_type: &str, label: Option<&str>, value: Value) -> RawField {
        RawField {
            field_type: field_type.to_string(),
            label: label.map(str::to_string),
            value: match value {
                Value::Array(values) => values,
                other => vec![other],
            },
        }
    }

    fn sample() -> RawRecord {
        RawRecord {
            uid: "uid-1".to_string(),
            title: "databridge".to_string(),
            fields: vec![
                field("login", None, json!(["svc_user"])),
                field("password", None, json!(["hunter2"])),
                field("url", None, json!([])),
            ],
            custom: vec![field("text", Some("database"), json!(["prod"]))],
        }
    }

    #[test]
    fn test_parse_uses_label_or_type() {
        let record = sample().parse().unwrap();
        let fields: Vec<_> = record.fields().collect();
        assert_eq!(fields, vec!["login", "password", "database"]);
        assert_eq!(record.get("login"), Some("svc_user"));
        assert_eq!(record.get("database"), Some("prod"));
    }

    #[test]
    fn test_parse_skips_empty_values() {
        assert!(sample().parse().unwrap().get("url").is_none());
    }

    #[test]
    fn test_parse_stringifies_scalars_and_objects() {
        let mut raw = sample();
        raw.custom = vec![
            field("text", Some("port"), json!([5432])),
            field("checkbox", Some("enabled"), json!([true])),
            field("host", None, json!([{"hostName": "db.local", "port": "5432"}])),
        ];

        let record = raw.parse().unwrap();
        assert_eq!(record.get("port"), Some("5432"));
        assert_eq!(record.get("enabled"), Some("true"));
        assert_eq!(
            record.get("host"),
            Some("{\"hostName\":\"db.local\",\"port\":\"5432\"}")
        );
    }

    #[test]
    fn test_parse_rejects_multiple_values() {
        let mut raw = sample();
        raw.custom.push(field("text", Some("replicas"), json!(["a", "b"])));

        match raw.parse().unwrap_err() {
            Error::MultiValue {
                record,
                section,
                field,
            } => {
                assert_eq!(record, "databridge");
                assert_eq!(section, "custom");
                assert_eq!(field, "replicas");
            }
            other => panic!("expected multi-value error, got {other}"),
        }
    }

    #[test]
    fn test_update_overwrites_standard_field() {
        let mut raw = sample();
        assert_eq!(raw.apply_update("password", "new"), Section::Fields);
        assert_eq!(raw.parse().unwrap().get("password"), Some("new"));
        assert_eq!(raw.custom.len(), 1);
    }

    #[test]
    fn test_update_overwrites_custom_field() {
        let mut raw = sample();
        assert_eq!(raw.apply_update("database", "staging"), Section::Custom);
        assert_eq!(raw.custom.len(), 1);
        assert_eq!(raw.parse().unwrap().get("database"), Some("staging"));
    }

    #[test]
    fn test_update_appends_text_field() {
        let mut raw = sample();
        assert_eq!(raw.apply_update("schema", "gis"), Section::Custom);

        let added = raw.custom.last().unwrap();
        assert_eq!(added.field_type, CUSTOM_FIELD_TYPE);
        assert_eq!(added.label.as_deref(), Some("schema"));
        assert_eq!(raw.parse().unwrap().get("schema"), Some("gis"));
    }

    #[test]
    fn test_wire_shape() {
        let raw: RawRecord = serde_json::from_value(json!({
            "uid": "abc",
            "title": "api",
            "fields": [{"type": "password", "value": ["pw"]}],
        }))
        .unwrap();

        assert!(raw.custom.is_empty());
        assert_eq!(raw.fields[0].name(), "password");
        let back = serde_json::to_value(&raw).unwrap();
        assert_eq!(back["fields"][0]["type"], "password");
        assert!(back["fields"][0].get("label").is_none());
    }
}

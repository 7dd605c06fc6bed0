//! Record types flowing through the ingestion pipeline

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One decoded input row before normalization
///
/// Keys come straight from the source file and vary freely in case and
/// punctuation (`Tower Name`, `towerName`, `tower_name`). Lookup is done
/// through [`RawRecord::get`], which folds both sides to lowercase
/// alphanumerics, so the alias tables match all spellings of a header.
/// Insertion order is preserved for diagnostics.
#[derive(Debug, Clone, Default)]
pub struct RawRecord {
    fields: Vec<(String, Value)>,
}

impl RawRecord {
    pub fn new() -> Self {
        Self { fields: Vec::new() }
    }

    /// Build from a JSON object's entries
    pub fn from_object(map: &serde_json::Map<String, Value>) -> Self {
        Self {
            fields: map.iter().map(|(k, v)| (k.clone(), v.clone())).collect(),
        }
    }

    pub fn insert(&mut self, key: impl Into<String>, value: Value) {
        self.fields.push((key.into(), value));
    }

    /// Look up a value by alias, tolerant of case and punctuation
    pub fn get(&self, alias: &str) -> Option<&Value> {
        let wanted = canon_key(alias);
        self.fields
            .iter()
            .find(|(k, _)| canon_key(k) == wanted)
            .map(|(_, v)| v)
    }

    /// True when every value is null, blank, or a "nan" sentinel
    ///
    /// Blank rows are common at the tail of exported spreadsheets and are
    /// skipped without a warning.
    pub fn is_blank(&self) -> bool {
        self.fields.iter().all(|(_, v)| value_to_text(v).is_none())
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

/// Fold a field name to lowercase alphanumerics for alias comparison
pub fn canon_key(s: &str) -> String {
    s.chars()
        .filter(|c| c.is_alphanumeric())
        .flat_map(|c| c.to_lowercase())
        .collect()
}

/// Usable text form of a scalar cell value
///
/// Returns None for null, empty/whitespace strings, and the textual
/// not-a-number sentinels spreadsheet exports produce for empty numeric
/// cells.
pub fn value_to_text(value: &Value) -> Option<String> {
    let text = match value {
        Value::Null => return None,
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        // Nested structures are not meaningful as a scalar field
        Value::Array(_) | Value::Object(_) => return None,
    };

    if text.is_empty() || text == "nan" || text == "NaN" {
        None
    } else {
        Some(text)
    }
}

/// Canonical component status
///
/// The source data carries two vocabularies (a 5-value and a 3-value
/// one); both normalize into this triple. See `normalize::STATUS_SYNONYMS`
/// for the full mapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Status {
    Planned,
    #[serde(rename = "In Development")]
    InDevelopment,
    Released,
}

impl Status {
    /// Storage / wire form
    pub fn as_str(&self) -> &'static str {
        match self {
            Status::Planned => "Planned",
            Status::InDevelopment => "In Development",
            Status::Released => "Released",
        }
    }
}

impl std::fmt::Display for Status {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Canonical component complexity
///
/// The legacy Simple/Medium/Complex naming folds into Low/Medium/High.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Complexity {
    Low,
    Medium,
    High,
}

impl Complexity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Complexity::Low => "Low",
            Complexity::Medium => "Medium",
            Complexity::High => "High",
        }
    }
}

impl std::fmt::Display for Complexity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Normalized representation of one component, guaranteed schema-valid
///
/// Every field except `external_key` is non-empty after validation; the
/// business key is left absent when the source row carried none and is
/// generated during reconciliation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CanonicalComponentRecord {
    /// Business identifier, None when the source supplied no key
    pub external_key: Option<String>,
    /// Display name
    pub label: String,
    pub version: String,
    pub description: String,
    /// Business domain grouping
    pub tower: String,
    /// Owning team / application group
    pub app_group: String,
    pub component_type: String,
    pub status: Status,
    pub complexity: Complexity,
    /// Free string, e.g. "New" / "Update"
    pub change_type: String,
    /// 1-12
    pub release_month: u32,
    pub release_year: i32,
    pub release_date: Option<NaiveDate>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_canon_key_folds_case_and_punctuation() {
        assert_eq!(canon_key("Tower Name"), "towername");
        assert_eq!(canon_key("towerName"), "towername");
        assert_eq!(canon_key("tower_name"), "towername");
        assert_eq!(canon_key("TOWER-NAME"), "towername");
    }

    #[test]
    fn test_get_matches_any_header_spelling() {
        let mut record = RawRecord::new();
        record.insert("Tower Name", json!("Security"));

        assert_eq!(record.get("tower_name"), Some(&json!("Security")));
        assert_eq!(record.get("towerName"), Some(&json!("Security")));
        assert_eq!(record.get("owner"), None);
    }

    #[test]
    fn test_value_to_text_rejects_sentinels() {
        assert_eq!(value_to_text(&json!("  Claims  ")), Some("Claims".into()));
        assert_eq!(value_to_text(&json!(2024)), Some("2024".into()));
        assert_eq!(value_to_text(&json!("nan")), None);
        assert_eq!(value_to_text(&json!("NaN")), None);
        assert_eq!(value_to_text(&json!("   ")), None);
        assert_eq!(value_to_text(&Value::Null), None);
    }

    #[test]
    fn test_blank_row_detection() {
        let mut record = RawRecord::new();
        record.insert("name", Value::Null);
        record.insert("tower", json!(""));
        record.insert("status", json!("nan"));
        assert!(record.is_blank());

        record.insert("owner", json!("Platform"));
        assert!(!record.is_blank());
    }

    #[test]
    fn test_status_wire_form() {
        assert_eq!(Status::InDevelopment.as_str(), "In Development");
        let json = serde_json::to_value(Status::InDevelopment).unwrap();
        assert_eq!(json, json!("In Development"));
    }
}

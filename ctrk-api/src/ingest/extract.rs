//! Field extraction against ordered alias tables
//!
//! Uploaded files name the same logical field many different ways; each
//! canonical field has a fixed, ordered list of acceptable source keys.
//! The first alias with a usable value wins. The same tables apply to
//! every input format, so a CSV export and a JSON export of the same
//! sheet extract identically.

use super::types::{value_to_text, RawRecord};

// Alias tables ported from the original upload mapping tables. Order is
// priority order and must stay stable across releases: reordering changes
// which column wins when a file carries several spellings.

pub const KEY_ALIASES: &[&str] = &["componentId", "component_id", "slug", "identifier", "id"];

pub const LABEL_ALIASES: &[&str] = &[
    "name",
    "component_name",
    "componentName",
    "Component Name",
    "title",
];

pub const TOWER_ALIASES: &[&str] = &["tower", "tower_name", "towerName", "Tower", "domain", "area"];

pub const APP_GROUP_ALIASES: &[&str] = &["owner", "app_group", "appGroup", "team", "group"];

pub const COMPONENT_TYPE_ALIASES: &[&str] =
    &["type", "component_type", "componentType", "category", "kind"];

pub const STATUS_ALIASES: &[&str] = &["status", "state", "phase", "stage"];

pub const COMPLEXITY_ALIASES: &[&str] = &["complexity", "level", "difficulty", "size"];

pub const CHANGE_TYPE_ALIASES: &[&str] = &["change_type", "changeType", "change", "action"];

pub const DESCRIPTION_ALIASES: &[&str] = &["description", "desc", "details", "summary"];

pub const VERSION_ALIASES: &[&str] = &["version", "ver", "release_version"];

pub const RELEASE_DATE_ALIASES: &[&str] =
    &["release_date", "releaseDate", "date", "released", "release"];

pub const MONTH_ALIASES: &[&str] = &["month", "release_month", "releaseMonth"];

pub const YEAR_ALIASES: &[&str] = &["year", "release_year", "releaseYear"];

/// Extract a field value, falling back to `default`
///
/// Tries `aliases` in declared priority order; the first key present with
/// a non-null, non-blank, non-"nan" value is returned trimmed. Pure
/// function of its inputs.
pub fn extract(record: &RawRecord, aliases: &[&str], default: &str) -> String {
    extract_opt(record, aliases).unwrap_or_else(|| default.to_string())
}

/// Extract a field value without a default
pub fn extract_opt(record: &RawRecord, aliases: &[&str]) -> Option<String> {
    aliases
        .iter()
        .find_map(|alias| record.get(alias).and_then(value_to_text))
}

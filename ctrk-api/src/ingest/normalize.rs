//! Free-text value normalization
//!
//! Upload sources are uncontrolled business spreadsheets; a typo in a
//! status cell must never reject a row. Unrecognized values degrade
//! silently to the component-wide default and the caller decides whether
//! that deserves a warning.

use super::types::{Complexity, Status};
use chrono::NaiveDate;

/// Status synonym table, checked in order
///
/// Resolves the two historical vocabularies (planning/development/testing/
/// deployed/deprecated and Planning/In Progress/Completed/...) into the
/// canonical triple. Exhaustive: any synonym not listed here falls back
/// to [`DEFAULT_STATUS`].
pub const STATUS_SYNONYMS: &[(&str, Status)] = &[
    ("planned", Status::Planned),
    ("planning", Status::Planned),
    ("plan", Status::Planned),
    ("backlog", Status::Planned),
    ("proposed", Status::Planned),
    ("in development", Status::InDevelopment),
    ("in-development", Status::InDevelopment),
    ("indevelopment", Status::InDevelopment),
    ("development", Status::InDevelopment),
    ("dev", Status::InDevelopment),
    ("in progress", Status::InDevelopment),
    ("in-progress", Status::InDevelopment),
    ("inprogress", Status::InDevelopment),
    ("progress", Status::InDevelopment),
    ("testing", Status::InDevelopment),
    ("test", Status::InDevelopment),
    ("qa", Status::InDevelopment),
    ("released", Status::Released),
    ("release", Status::Released),
    ("completed", Status::Released),
    ("complete", Status::Released),
    ("done", Status::Released),
    ("finished", Status::Released),
    ("deployed", Status::Released),
    ("deploy", Status::Released),
    ("production", Status::Released),
    ("prod", Status::Released),
    ("live", Status::Released),
];

/// Complexity synonym table, checked in order
///
/// Folds the legacy Simple/Medium/Complex naming and 1/2/3 ratings into
/// Low/Medium/High.
pub const COMPLEXITY_SYNONYMS: &[(&str, Complexity)] = &[
    ("low", Complexity::Low),
    ("simple", Complexity::Low),
    ("easy", Complexity::Low),
    ("minor", Complexity::Low),
    ("1", Complexity::Low),
    ("medium", Complexity::Medium),
    ("moderate", Complexity::Medium),
    ("med", Complexity::Medium),
    ("2", Complexity::Medium),
    ("high", Complexity::High),
    ("complex", Complexity::High),
    ("hard", Complexity::High),
    ("difficult", Complexity::High),
    ("major", Complexity::High),
    ("3", Complexity::High),
];

/// Fallback when a status value is missing or unrecognized
pub const DEFAULT_STATUS: Status = Status::Planned;

/// Fallback when a complexity value is missing or unrecognized
pub const DEFAULT_COMPLEXITY: Complexity = Complexity::Medium;

/// Date patterns tried in order during date normalization
pub const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%m/%d/%Y", "%d-%m-%Y"];

/// Whole-word containment: "currently in development" matches
/// "development", but "donezo" does not match "done"
fn contains_synonym(needle: &str, synonym: &str) -> bool {
    if synonym.contains(' ') {
        needle.contains(synonym)
    } else {
        needle
            .split(|c: char| !c.is_alphanumeric())
            .any(|token| token == synonym)
    }
}

/// Look up a status value, None when unrecognized
///
/// Lowercases and trims, then tries an exact table hit followed by a
/// word-boundary substring scan in table order ("currently in
/// development" still resolves).
pub fn lookup_status(raw: &str) -> Option<Status> {
    let needle = raw.trim().to_lowercase();
    if needle.is_empty() {
        return None;
    }
    STATUS_SYNONYMS
        .iter()
        .find(|(syn, _)| *syn == needle)
        .or_else(|| {
            STATUS_SYNONYMS
                .iter()
                .find(|(syn, _)| contains_synonym(&needle, syn))
        })
        .map(|(_, status)| *status)
}

/// Normalize a status value, defaulting when unrecognized
pub fn normalize_status(raw: &str) -> Status {
    lookup_status(raw).unwrap_or(DEFAULT_STATUS)
}

/// Look up a complexity value, None when unrecognized
pub fn lookup_complexity(raw: &str) -> Option<Complexity> {
    let needle = raw.trim().to_lowercase();
    if needle.is_empty() {
        return None;
    }
    COMPLEXITY_SYNONYMS
        .iter()
        .find(|(syn, _)| *syn == needle)
        .or_else(|| {
            COMPLEXITY_SYNONYMS
                .iter()
                .find(|(syn, _)| contains_synonym(&needle, syn))
        })
        .map(|(_, complexity)| *complexity)
}

/// Normalize a complexity value, defaulting when unrecognized
pub fn normalize_complexity(raw: &str) -> Complexity {
    lookup_complexity(raw).unwrap_or(DEFAULT_COMPLEXITY)
}

/// Parse a date trying each candidate format in order
///
/// Returns None when every format fails; the caller decides the fallback.
pub fn normalize_date(raw: &str, formats: &[&str]) -> Option<NaiveDate> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    formats
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(trimmed, fmt).ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exact_status_synonyms() {
        assert_eq!(normalize_status("done"), Status::Released);
        assert_eq!(normalize_status("DEPLOYED"), Status::Released);
        assert_eq!(normalize_status("  planning "), Status::Planned);
        assert_eq!(normalize_status("testing"), Status::InDevelopment);
        assert_eq!(normalize_status("in progress"), Status::InDevelopment);
    }

    #[test]
    fn test_substring_status_match() {
        assert_eq!(
            normalize_status("currently in development"),
            Status::InDevelopment
        );
        assert_eq!(normalize_status("was deployed last week"), Status::Released);
    }

    #[test]
    fn test_unrecognized_status_defaults() {
        // Word-boundary matching: "donezo" is not "done"
        assert_eq!(normalize_status("donezo"), DEFAULT_STATUS);
        assert_eq!(lookup_status("donezo"), None);
        assert_eq!(normalize_status("zzz"), DEFAULT_STATUS);
        assert_eq!(lookup_status(""), None);
    }

    #[test]
    fn test_complexity_legacy_vocabulary() {
        assert_eq!(normalize_complexity("Simple"), Complexity::Low);
        assert_eq!(normalize_complexity("complex"), Complexity::High);
        assert_eq!(normalize_complexity("3"), Complexity::High);
        assert_eq!(normalize_complexity("moderate"), Complexity::Medium);
    }

    #[test]
    fn test_unrecognized_complexity_defaults() {
        assert_eq!(normalize_complexity("galactic"), DEFAULT_COMPLEXITY);
        assert_eq!(lookup_complexity("galactic"), None);
    }

    #[test]
    fn test_date_format_order() {
        assert_eq!(
            normalize_date("2024-03-15", DATE_FORMATS),
            NaiveDate::from_ymd_opt(2024, 3, 15)
        );
        assert_eq!(
            normalize_date("03/15/2024", DATE_FORMATS),
            NaiveDate::from_ymd_opt(2024, 3, 15)
        );
        assert_eq!(
            normalize_date("15-03-2024", DATE_FORMATS),
            NaiveDate::from_ymd_opt(2024, 3, 15)
        );
        assert_eq!(normalize_date("March 15", DATE_FORMATS), None);
        assert_eq!(normalize_date("", DATE_FORMATS), None);
    }
}

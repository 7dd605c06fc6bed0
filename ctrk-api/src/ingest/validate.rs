//! Record validation and auto-fixing
//!
//! Every row yields a usable canonical record plus zero or more warnings;
//! this stage never rejects input. Missing required fields get documented
//! defaults, unrecognized enum values coerce to the component default, and
//! out-of-range numerics coerce to the current calendar month/year. The
//! one thing never invented here is the business key: create-vs-update
//! identity is decided during reconciliation.

use super::extract::{
    extract_opt, APP_GROUP_ALIASES, CHANGE_TYPE_ALIASES, COMPLEXITY_ALIASES,
    COMPONENT_TYPE_ALIASES, DESCRIPTION_ALIASES, KEY_ALIASES, LABEL_ALIASES, MONTH_ALIASES,
    RELEASE_DATE_ALIASES, STATUS_ALIASES, TOWER_ALIASES, VERSION_ALIASES, YEAR_ALIASES,
};
use super::normalize::{
    lookup_complexity, lookup_status, normalize_date, DATE_FORMATS, DEFAULT_COMPLEXITY,
    DEFAULT_STATUS,
};
use super::types::{CanonicalComponentRecord, RawRecord};
use chrono::{Datelike, Utc};

/// Substitute when a row names no tower
pub const DEFAULT_TOWER: &str = "General";

/// Substitute when a row names no owning team
pub const DEFAULT_APP_GROUP: &str = "Default Team";

/// Substitute when a row names no component type
pub const DEFAULT_COMPONENT_TYPE: &str = "Service";

/// Substitute when a row carries no change type
pub const DEFAULT_CHANGE_TYPE: &str = "New";

/// Substitute when a row carries no version
pub const DEFAULT_VERSION: &str = "1.0.0";

/// Accepted release-year window; values outside coerce to the current year
pub const YEAR_RANGE: std::ops::RangeInclusive<i32> = 2020..=2030;

/// Validate one raw record into a canonical record plus warnings
///
/// `row` is the 1-based position in the uploaded file, used only for the
/// generated placeholder label.
pub fn validate_and_fix(record: &RawRecord, row: usize) -> (CanonicalComponentRecord, Vec<String>) {
    let mut warnings = Vec::new();
    let now = Utc::now();

    let external_key = extract_opt(record, KEY_ALIASES);

    let label = match extract_opt(record, LABEL_ALIASES) {
        Some(label) => label,
        None => {
            let placeholder = format!("Component {}", row);
            warnings.push(format!(
                "missing component name, substituted \"{}\"",
                placeholder
            ));
            placeholder
        }
    };

    let tower = match extract_opt(record, TOWER_ALIASES) {
        Some(tower) => tower,
        None => {
            warnings.push(format!("missing tower, defaulted to \"{}\"", DEFAULT_TOWER));
            DEFAULT_TOWER.to_string()
        }
    };

    let app_group = match extract_opt(record, APP_GROUP_ALIASES) {
        Some(group) => group,
        None => {
            warnings.push(format!(
                "missing owner/app group, defaulted to \"{}\"",
                DEFAULT_APP_GROUP
            ));
            DEFAULT_APP_GROUP.to_string()
        }
    };

    let component_type = match extract_opt(record, COMPONENT_TYPE_ALIASES) {
        Some(kind) => kind,
        None => {
            warnings.push(format!(
                "missing component type, defaulted to \"{}\"",
                DEFAULT_COMPONENT_TYPE
            ));
            DEFAULT_COMPONENT_TYPE.to_string()
        }
    };

    let status = match extract_opt(record, STATUS_ALIASES) {
        Some(raw) => lookup_status(&raw).unwrap_or_else(|| {
            warnings.push(format!(
                "unrecognized status \"{}\", defaulted to {}",
                raw, DEFAULT_STATUS
            ));
            DEFAULT_STATUS
        }),
        None => DEFAULT_STATUS,
    };

    let complexity = match extract_opt(record, COMPLEXITY_ALIASES) {
        Some(raw) => lookup_complexity(&raw).unwrap_or_else(|| {
            warnings.push(format!(
                "unrecognized complexity \"{}\", defaulted to {}",
                raw, DEFAULT_COMPLEXITY
            ));
            DEFAULT_COMPLEXITY
        }),
        None => DEFAULT_COMPLEXITY,
    };

    let release_date = extract_opt(record, RELEASE_DATE_ALIASES).and_then(|raw| {
        let parsed = normalize_date(&raw, DATE_FORMATS);
        if parsed.is_none() {
            warnings.push(format!("unparseable release date \"{}\", ignored", raw));
        }
        parsed
    });

    // Month/year absent from the row is normal; derive from the release
    // date when one parsed, else from the clock. A value that is present
    // but invalid coerces and warns.
    let release_month = match extract_opt(record, MONTH_ALIASES) {
        Some(raw) => match raw.parse::<u32>() {
            Ok(m) if (1..=12).contains(&m) => m,
            _ => {
                warnings.push(format!(
                    "invalid month \"{}\", substituted current month",
                    raw
                ));
                now.month()
            }
        },
        None => release_date.map(|d| d.month()).unwrap_or_else(|| now.month()),
    };

    let release_year = match extract_opt(record, YEAR_ALIASES) {
        Some(raw) => match raw.parse::<i32>() {
            Ok(y) if YEAR_RANGE.contains(&y) => y,
            _ => {
                warnings.push(format!("invalid year \"{}\", substituted current year", raw));
                now.year()
            }
        },
        None => release_date.map(|d| d.year()).unwrap_or_else(|| now.year()),
    };

    let canonical = CanonicalComponentRecord {
        external_key,
        label,
        version: super::extract::extract(record, VERSION_ALIASES, DEFAULT_VERSION),
        description: super::extract::extract(record, DESCRIPTION_ALIASES, ""),
        tower,
        app_group,
        component_type,
        status,
        complexity,
        change_type: super::extract::extract(record, CHANGE_TYPE_ALIASES, DEFAULT_CHANGE_TYPE),
        release_month,
        release_year,
        release_date,
    };

    (canonical, warnings)
}

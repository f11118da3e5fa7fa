use crate::fact::RuntimeFact;
use crate::model::config::Value;
use chrono::{DateTime, Utc};

/// Checks whether `value` holds for the given runtime fact at `now`.
///
/// A value without populated fields always matches. Values that populate more than one
/// group of fields, compare against an unset fact attribute, or carry an invalid
/// timestamp never match.
///
/// # Examples
///
/// ```rust
/// use chrono::Utc;
/// use toggle::{matches, RuntimeFact, Value};
///
/// let value = Value::app_range(Some(14), Some(23));
/// assert!(matches(&value, &RuntimeFact::new().app_version(20), Utc::now()));
/// assert!(!matches(&value, &RuntimeFact::new().app_version(30), Utc::now()));
/// ```
pub fn matches(value: &Value, fact: &RuntimeFact, now: DateTime<Utc>) -> bool {
    match value.populated_groups() {
        0 => return true,
        1 => {}
        _ => return false,
    }
    if value.has_api_range() {
        return in_range(fact.get_api_level(), value.api_min, value.api_max);
    }
    if value.has_app_range() {
        return in_range(fact.get_app_version(), value.app_min, value.app_max);
    }
    if let Some(date) = value.date {
        return DateTime::from_timestamp_millis(date).is_some_and(|threshold| now >= threshold);
    }
    if let Some(expiry) = value.expiry {
        return DateTime::from_timestamp_millis(expiry).is_some_and(|threshold| now < threshold);
    }
    false
}

fn in_range(attr: Option<i64>, min: Option<i64>, max: Option<i64>) -> bool {
    let Some(attr) = attr else {
        return false;
    };
    min.map_or(true, |min| attr >= min) && max.map_or(true, |max| attr <= max)
}

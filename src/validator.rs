//! Item validation and normalization.
//!
//! Upstream collectors hand over loosely typed JSON. [`validate_item`]
//! reports every schema problem as a human-readable string without failing;
//! [`clean_item`] turns an item into a canonical [`NewsItem`]. The two are
//! split so a caller can reject a batch before anything touches disk.

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, SecondsFormat, Utc};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

use crate::error::{Result, StoreError, ValidationErrors};
use crate::models::NewsItem;

const REQUIRED_FIELDS: [&str; 3] = ["title", "link", "source"];
const MIN_RELEVANCE: f64 = 0.0;
const MAX_RELEVANCE: f64 = 5.0;

/// Check one item against the schema.
///
/// Returns an empty list iff the item is valid. Each message names the
/// offending field.
pub fn validate_item(item: &Value) -> Vec<String> {
    let Some(obj) = item.as_object() else {
        return vec!["Item must be a JSON object".to_string()];
    };

    let mut errors = Vec::new();

    for field in REQUIRED_FIELDS {
        if !obj.contains_key(field) {
            errors.push(format!("Required field '{}' is missing", field));
        }
    }

    for field in ["title", "source"] {
        match obj.get(field) {
            None => {}
            Some(Value::String(s)) if s.trim().is_empty() => {
                errors.push(format!("Field '{}' must not be empty", field));
            }
            Some(Value::String(_)) => {}
            Some(_) => errors.push(format!("Field '{}' must be a string", field)),
        }
    }

    match obj.get("link") {
        None => {}
        Some(Value::String(link)) => {
            if !has_http_scheme(link) {
                errors.push(
                    "Field 'link' must be a URL starting with http:// or https://".to_string(),
                );
            }
        }
        Some(_) => errors.push("Field 'link' must be a string".to_string()),
    }

    match obj.get("published") {
        None | Some(Value::Null) => {}
        Some(Value::String(s)) if s.trim().is_empty() => {}
        Some(Value::String(s)) => {
            if parse_timestamp(s).is_none() {
                errors.push("Field 'published' must be a valid ISO-8601 date".to_string());
            }
        }
        Some(_) => errors.push("Field 'published' must be an ISO-8601 string".to_string()),
    }

    match obj.get("relevance") {
        None | Some(Value::Null) => {}
        Some(Value::Number(n)) => {
            let in_range = n
                .as_f64()
                .is_some_and(|r| (MIN_RELEVANCE..=MAX_RELEVANCE).contains(&r));
            if !in_range {
                errors.push(format!(
                    "Field 'relevance' must be between {} and {}",
                    MIN_RELEVANCE, MAX_RELEVANCE
                ));
            }
        }
        Some(_) => errors.push("Field 'relevance' must be a number".to_string()),
    }

    match obj.get("categories") {
        None | Some(Value::Null) => {}
        Some(Value::Object(categories)) => {
            for (name, weight) in categories {
                if !weight.is_number() {
                    errors.push(format!(
                        "Field 'categories' weight for '{}' must be a number",
                        name
                    ));
                }
            }
        }
        Some(_) => errors.push("Field 'categories' must be a mapping".to_string()),
    }

    match obj.get("summary") {
        None | Some(Value::Null) | Some(Value::String(_)) => {}
        Some(_) => errors.push("Field 'summary' must be a string".to_string()),
    }

    errors
}

/// Validate a batch; only positions with at least one error appear.
pub fn validate_items(items: &[Value]) -> ValidationErrors {
    let errors: BTreeMap<usize, Vec<String>> = items
        .iter()
        .enumerate()
        .filter_map(|(i, item)| {
            let errs = validate_item(item);
            (!errs.is_empty()).then_some((i, errs))
        })
        .collect();
    ValidationErrors(errors)
}

/// Normalize an item into canonical form.
///
/// Trims `title`, `source` and `summary`, rewrites a parseable `published`
/// as ISO-8601 with an explicit offset, coerces `relevance` to a number
/// clamped into [0, 5] and defaults `categories` to an empty map. Unknown
/// fields pass through. Cleaning an already clean item is a no-op.
pub fn clean_item(item: &Value) -> Result<NewsItem> {
    let obj = item
        .as_object()
        .ok_or_else(|| StoreError::type_error("item", "expected a JSON object"))?;

    let mut extra = obj.clone();
    for known in [
        "title",
        "link",
        "source",
        "published",
        "summary",
        "relevance",
        "categories",
    ] {
        extra.remove(known);
    }

    Ok(NewsItem {
        title: required_string(obj, "title")?.trim().to_string(),
        link: required_string(obj, "link")?.to_string(),
        source: required_string(obj, "source")?.trim().to_string(),
        published: clean_published(obj.get("published"))?,
        summary: clean_summary(obj.get("summary"))?,
        relevance: clean_relevance(obj.get("relevance"))?,
        categories: clean_categories(obj.get("categories"))?,
        extra,
    })
}

/// Parse an ISO-8601 timestamp.
///
/// Accepts RFC 3339 (including a trailing `Z`), a space instead of `T`,
/// minute-precision times, and naive date-times or bare dates, which are
/// taken as UTC.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<FixedOffset>> {
    let s = raw.trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt);
    }
    for fmt in ["%Y-%m-%dT%H:%M%:z", "%Y-%m-%d %H:%M%:z", "%Y-%m-%dT%H:%M:%S%.f%z"] {
        if let Ok(dt) = DateTime::parse_from_str(s, fmt) {
            return Some(dt);
        }
    }
    for fmt in [
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%d %H:%M:%S%.f",
        "%Y-%m-%dT%H:%M",
        "%Y-%m-%d %H:%M",
    ] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(naive.and_utc().fixed_offset());
        }
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc().fixed_offset())
}

/// Render a timestamp the way canonical files store it: seconds precision
/// unless there is a fractional part, and a `+HH:MM` offset rather than `Z`.
pub fn format_timestamp(dt: &DateTime<FixedOffset>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::AutoSi, false)
}

/// Render a timestamp converted to UTC. Strings in this form sort
/// lexicographically in time order.
pub fn format_timestamp_utc(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::AutoSi, false)
}

fn has_http_scheme(link: &str) -> bool {
    link.starts_with("http://") || link.starts_with("https://")
}

fn required_string<'a>(obj: &'a Map<String, Value>, field: &str) -> Result<&'a str> {
    match obj.get(field) {
        Some(Value::String(s)) => Ok(s),
        Some(other) => Err(StoreError::type_error(
            field,
            format!("expected a string, got {}", other),
        )),
        None => Err(StoreError::type_error(field, "required field is missing")),
    }
}

fn clean_published(value: Option<&Value>) -> Result<Option<String>> {
    match value {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) if s.trim().is_empty() => Ok(None),
        // Best effort: an unparseable string is kept as given.
        Some(Value::String(s)) => Ok(Some(
            parse_timestamp(s)
                .map(|dt| format_timestamp(&dt))
                .unwrap_or_else(|| s.clone()),
        )),
        Some(other) => Err(StoreError::type_error(
            "published",
            format!("expected an ISO-8601 string, got {}", other),
        )),
    }
}

fn clean_summary(value: Option<&Value>) -> Result<Option<String>> {
    match value {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.trim().to_string())),
        Some(other) => Err(StoreError::type_error(
            "summary",
            format!("expected a string, got {}", other),
        )),
    }
}

fn clean_relevance(value: Option<&Value>) -> Result<Option<f64>> {
    let relevance = match value {
        None | Some(Value::Null) => return Ok(None),
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => s.trim().parse::<f64>().ok(),
        Some(_) => None,
    };

    match relevance {
        Some(r) if r.is_finite() => Ok(Some(r.clamp(MIN_RELEVANCE, MAX_RELEVANCE))),
        _ => Err(StoreError::type_error(
            "relevance",
            format!("cannot convert {} to a number", value.unwrap_or(&Value::Null)),
        )),
    }
}

fn clean_categories(value: Option<&Value>) -> Result<BTreeMap<String, f64>> {
    match value {
        None | Some(Value::Null) => Ok(BTreeMap::new()),
        Some(Value::Object(map)) => map
            .iter()
            .map(|(name, weight)| {
                weight.as_f64().map(|w| (name.clone(), w)).ok_or_else(|| {
                    StoreError::type_error(
                        "categories",
                        format!("weight for '{}' is not a number", name),
                    )
                })
            })
            .collect(),
        Some(other) => Err(StoreError::type_error(
            "categories",
            format!("expected a mapping, got {}", other),
        )),
    }
}

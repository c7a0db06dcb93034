// Usage Snapshot Normalizer
//
// Converts raw native usage payloads into canonical per-app records. An
// entry that cannot be parsed is dropped and the rest are processed; an
// absent or malformed payload yields an empty list, never an error.

use chrono::{DateTime, Local, TimeZone};
use screenbalance_common::category::classify;
use screenbalance_common::{AppCategory, AppUsageRecord};
use screenbalance_proto::RawAppEntry;
use serde_json::Value;
use tracing::debug;

/// Normalize a raw JSON usage snapshot. Accepts either a bare array of
/// entries or an object carrying the array under `apps` or `usage`.
pub fn normalize(payload: &Value) -> Vec<AppUsageRecord> {
    let entries = match payload {
        Value::Array(items) => items.as_slice(),
        Value::Object(map) => match map.get("apps").or_else(|| map.get("usage")) {
            Some(Value::Array(items)) => items.as_slice(),
            _ => {
                debug!("Usage payload has no entry array, dropping");
                return Vec::new();
            }
        },
        _ => {
            debug!("Usage payload is not an array or object, dropping");
            return Vec::new();
        }
    };

    let records: Vec<AppUsageRecord> = entries
        .iter()
        .filter_map(|item| match serde_json::from_value::<RawAppEntry>(item.clone()) {
            Ok(entry) => normalize_entry(entry),
            Err(e) => {
                debug!("Dropping malformed usage entry: {}", e);
                None
            }
        })
        .collect();

    debug!("Normalized {} of {} raw entries", records.len(), entries.len());
    records
}

/// Normalize already-decoded entries from the bridge call path.
pub fn normalize_entries(entries: Vec<RawAppEntry>) -> Vec<AppUsageRecord> {
    entries.into_iter().filter_map(normalize_entry).collect()
}

fn normalize_entry(entry: RawAppEntry) -> Option<AppUsageRecord> {
    let name = entry.name.trim();
    if name.is_empty() {
        debug!("Dropping usage entry with empty name");
        return None;
    }
    if !entry.minutes.is_finite() || entry.minutes < 0.0 {
        debug!("Dropping usage entry {} with invalid minutes {}", name, entry.minutes);
        return None;
    }

    let category = entry
        .category
        .as_deref()
        .and_then(parse_category)
        .unwrap_or_else(|| classify(name));

    Some(AppUsageRecord {
        name: name.to_string(),
        minutes: entry.minutes,
        category,
        last_used: entry.last_used.and_then(millis_to_local),
        icon: entry.icon,
        is_active: false,
    })
}

fn parse_category(raw: &str) -> Option<AppCategory> {
    let normalized: String =
        raw.to_lowercase().chars().filter(|c| c.is_ascii_alphanumeric()).collect();

    match normalized.as_str() {
        "socialmedia" | "social" => Some(AppCategory::SocialMedia),
        "entertainment" => Some(AppCategory::Entertainment),
        "productivity" => Some(AppCategory::Productivity),
        "games" | "game" | "gaming" => Some(AppCategory::Games),
        "education" | "educational" => Some(AppCategory::Education),
        "communication" => Some(AppCategory::Communication),
        "other" => Some(AppCategory::Other),
        _ => None,
    }
}

fn millis_to_local(millis: i64) -> Option<DateTime<Local>> {
    Local.timestamp_millis_opt(millis).single()
}

//! Build metadata reported by the health endpoint.

use chrono::DateTime;
use serde::Serialize;

use crate::models::time::{parse_timestamp, to_iso_string};

const SHA_KEYS: [&str; 4] = [
    "BUILD_SHA",
    "VERCEL_GIT_COMMIT_SHA",
    "NEXT_PUBLIC_VERCEL_GIT_COMMIT_SHA",
    "NEXT_PUBLIC_GIT_SHA",
];

const TIMESTAMP_KEYS: [&str; 5] = [
    "BUILD_TIMESTAMP",
    "VERCEL_GIT_COMMIT_TIMESTAMP",
    "DEPLOYMENT_TIMESTAMP",
    "NOW_GITHUB_COMMIT_DATETIME",
    "SOURCE_DATE_EPOCH",
];

pub const UNKNOWN: &str = "unknown";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BuildInfo {
    pub sha: String,
    pub ts: String,
}

impl BuildInfo {
    /// Read build metadata from the process environment.
    pub fn detect() -> Self {
        Self::detect_from(|key| std::env::var(key).ok())
    }

    /// Read build metadata through `lookup`. The first key that is set wins.
    pub fn detect_from<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let sha = SHA_KEYS
            .iter()
            .find_map(|key| lookup(key))
            .unwrap_or_else(|| UNKNOWN.to_string());
        let ts = normalize_timestamp(TIMESTAMP_KEYS.iter().find_map(|key| lookup(key)).as_deref());
        Self { sha, ts }
    }
}

/// Normalize a build timestamp to ISO 8601.
///
/// Digit-only values are epoch seconds when they have at most ten digits and
/// epoch milliseconds otherwise. Values that cannot be read as a date are
/// returned trimmed but otherwise unchanged.
pub fn normalize_timestamp(raw: Option<&str>) -> String {
    let trimmed = raw.map(str::trim).unwrap_or_default();
    if trimmed.is_empty() {
        return UNKNOWN.to_string();
    }

    if trimmed.bytes().all(|b| b.is_ascii_digit()) {
        let parsed = trimmed.parse::<i64>().ok().and_then(|value| {
            let millis = if trimmed.len() <= 10 { value.checked_mul(1000)? } else { value };
            DateTime::from_timestamp_millis(millis)
        });
        if let Some(parsed) = parsed {
            return to_iso_string(&parsed);
        }
    }

    match parse_timestamp(trimmed) {
        Some(parsed) => to_iso_string(&parsed),
        None => trimmed.to_string(),
    }
}

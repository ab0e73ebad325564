//! On-disk release cache at `<root>/releases.json`.
//!
//! The document is always read and written whole:
//! ```json
//! { "releases": [ ...verbatim index entries... ], "cache_time": "1718000000000" }
//! ```
//! `cache_time` is milliseconds since the Unix epoch, stored as a string.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReleaseCache {
    pub releases: Vec<serde_json::Value>,
    #[serde(with = "millis_string")]
    pub cache_time: i64,
}

impl ReleaseCache {
    pub fn new(releases: Vec<serde_json::Value>, cache_time: i64) -> Self {
        Self {
            releases,
            cache_time,
        }
    }

    /// Whether the cache is younger than `freshness` at `now_millis`.
    /// A `cache_time` in the future counts as stale.
    pub fn is_fresh(&self, now_millis: i64, freshness: Duration) -> bool {
        let age = now_millis.saturating_sub(self.cache_time);
        (0..freshness.as_millis() as i64).contains(&age)
    }
}

/// Current wall-clock time in epoch milliseconds
pub fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// Load the cache document, `None` when absent.
///
/// A document that exists but cannot be parsed is treated as absent and logged.
pub fn load(path: &Path) -> Option<ReleaseCache> {
    if !path.exists() {
        return None;
    }

    let content = match std::fs::read_to_string(path) {
        Ok(c) => c,
        Err(e) => {
            tracing::warn!("Failed to read release cache {}: {}", path.display(), e);
            return None;
        }
    };

    match serde_json::from_str(&content) {
        Ok(cache) => Some(cache),
        Err(e) => {
            tracing::warn!("Ignoring corrupt release cache {}: {}", path.display(), e);
            None
        }
    }
}

/// Overwrite the cache document
pub fn store(path: &Path, cache: &ReleaseCache) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
    }

    let json = serde_json::to_string(cache)?;
    std::fs::write(path, json)
        .with_context(|| format!("Failed to write release cache: {}", path.display()))?;

    Ok(())
}

mod millis_string {
    use serde::{Deserialize, Deserializer, Serializer, de};

    pub fn serialize<S: Serializer>(millis: &i64, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&millis.to_string())
    }

    /// Accepts the string form, and a bare number for hand-edited files
    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<i64, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Text(String),
            Number(i64),
        }

        match Raw::deserialize(deserializer)? {
            Raw::Text(text) => text.trim().parse().map_err(de::Error::custom),
            Raw::Number(n) => Ok(n),
        }
    }
}

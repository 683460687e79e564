//! Content record and rate-limit telemetry.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// The versioned story document a job builds from.
///
/// Read and replaced wholesale; callers wanting a partial update must
/// read-modify-write.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentRecord {
    pub version: i64,
    #[serde(rename = "storyName")]
    pub name: String,
    #[serde(rename = "gistId", default, skip_serializing_if = "Option::is_none")]
    pub gist_id: Option<String>,
    /// Style keys to values.
    #[serde(default)]
    pub theme: Map<String, Value>,
    /// Ordered content blocks, opaque to this crate.
    #[serde(default)]
    pub data: Vec<Value>,
}

impl ContentRecord {
    /// An empty record for a newly created story.
    pub fn empty(name: impl Into<String>) -> Self {
        Self {
            version: 0,
            name: name.into(),
            gist_id: None,
            theme: Map::new(),
            data: Vec::new(),
        }
    }
}

/// One story listed in the project index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectEntry {
    pub name: String,
    pub id: String,
}

/// The index of every story, kept in its own document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectIndex {
    #[serde(default)]
    pub projects: Vec<ProjectEntry>,
}

/// Server quota as reported on a content store response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RateLimitSnapshot {
    pub remaining: u64,
    pub limit: u64,
    pub reset_at: DateTime<Utc>,
}

impl RateLimitSnapshot {
    /// Share of the quota already used, 0-100.
    pub fn usage_percent(&self) -> f64 {
        if self.limit == 0 {
            return 100.0;
        }
        let used = self.limit.saturating_sub(self.remaining);
        used as f64 / self.limit as f64 * 100.0
    }
}

/// Result of a successful update.
#[derive(Debug, Clone, PartialEq)]
pub struct UpdateOutcome {
    /// Parsed from the final (successful) response, when the headers were present.
    pub rate_limit: Option<RateLimitSnapshot>,
    /// Attempts spent, including the successful one.
    pub attempts: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_uses_wire_names() {
        let json = serde_json::json!({
            "version": 3,
            "storyName": "Derby night",
            "theme": { "quote-color": "#000000" },
            "data": [{ "type": "heading", "text": "Kick-off" }]
        });
        let record: ContentRecord = serde_json::from_value(json).unwrap();
        assert_eq!(record.name, "Derby night");
        assert_eq!(record.version, 3);
        assert!(record.gist_id.is_none());
        assert_eq!(record.data.len(), 1);

        let back = serde_json::to_value(&record).unwrap();
        assert_eq!(back["storyName"], "Derby night");
        assert!(back.get("gistId").is_none());
    }

    #[test]
    fn test_usage_percent() {
        let snapshot = RateLimitSnapshot {
            remaining: 500,
            limit: 5000,
            reset_at: Utc::now(),
        };
        assert!((snapshot.usage_percent() - 90.0).abs() < f64::EPSILON);

        let zero = RateLimitSnapshot {
            remaining: 0,
            limit: 0,
            reset_at: Utc::now(),
        };
        assert_eq!(zero.usage_percent(), 100.0);
    }
}

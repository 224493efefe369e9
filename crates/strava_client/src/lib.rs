//! Minimal `StravaClient` trait, wire models and a reqwest-based implementation.

use async_trait::async_trait;
use serde::{Deserialize, Deserializer, Serialize};
use thiserror::Error;

pub mod config;
pub mod http_client;
pub mod oauth;
pub mod utils;

/// Page size used by the activity list endpoint unless the caller asks otherwise.
pub const DEFAULT_PER_PAGE: u32 = 200;

#[derive(Debug, Error)]
pub enum StravaError {
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("configuration error: {0}")]
    Config(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("authentication rejected: {0}")]
    Auth(String),
    #[error("rate limited: {0}")]
    RateLimited(String),
    #[error("api error ({status}): {message}")]
    Api { status: u16, message: String },
    #[error("decode error: {0}")]
    Decode(String),
}

impl StravaError {
    /// Map a non-success status that has no dedicated variant.
    pub fn from_status(status: u16, message: String) -> Self {
        match status {
            429 => StravaError::RateLimited(message),
            _ => StravaError::Api { status, message },
        }
    }
}

/// Strava's six-valued climb classification.
///
/// The wire format is an integer where larger means harder, so `Category4`
/// (easiest numbered tier) is `1` and `Category1` is `4`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum ClimbCategory {
    Uncategorized,
    Category4,
    Category3,
    Category2,
    Category1,
    HorsCategorie,
}

impl ClimbCategory {
    pub const ALL: [ClimbCategory; 6] = [
        ClimbCategory::Uncategorized,
        ClimbCategory::Category4,
        ClimbCategory::Category3,
        ClimbCategory::Category2,
        ClimbCategory::Category1,
        ClimbCategory::HorsCategorie,
    ];

    pub fn from_wire(value: i64) -> Option<Self> {
        match value {
            0 => Some(ClimbCategory::Uncategorized),
            1 => Some(ClimbCategory::Category4),
            2 => Some(ClimbCategory::Category3),
            3 => Some(ClimbCategory::Category2),
            4 => Some(ClimbCategory::Category1),
            5 => Some(ClimbCategory::HorsCategorie),
            _ => None,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            ClimbCategory::Uncategorized => "Uncategorized",
            ClimbCategory::Category4 => "Category 4",
            ClimbCategory::Category3 => "Category 3",
            ClimbCategory::Category2 => "Category 2",
            ClimbCategory::Category1 => "Category 1",
            ClimbCategory::HorsCategorie => "HC",
        }
    }
}

impl<'de> Deserialize<'de> for ClimbCategory {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        use serde::de::Error;
        let raw = i64::deserialize(deserializer)?;
        ClimbCategory::from_wire(raw)
            .ok_or_else(|| D::Error::custom(format!("unknown climb_category {raw}")))
    }
}

impl std::fmt::Display for ClimbCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
pub struct ActivitySummary {
    pub id: u64,
    pub name: Option<String>,
    #[serde(default)]
    pub start_date: Option<String>,
    /// Meters per second.
    #[serde(default)]
    pub average_speed: f64,
    /// Meters.
    #[serde(default)]
    pub distance: f64,
    /// Meters.
    #[serde(default)]
    pub total_elevation_gain: f64,
}

#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
pub struct SegmentSummary {
    pub id: u64,
    pub name: Option<String>,
    pub climb_category: ClimbCategory,
    #[serde(default)]
    pub elevation_high: f64,
    #[serde(default)]
    pub elevation_low: f64,
    #[serde(default)]
    pub average_grade: f64,
    #[serde(default)]
    pub maximum_grade: f64,
}

#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
pub struct SegmentEffort {
    pub id: u64,
    pub name: Option<String>,
    pub segment: SegmentSummary,
}

#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
pub struct DetailedActivity {
    pub id: u64,
    pub name: Option<String>,
    #[serde(default)]
    pub segment_efforts: Vec<SegmentEffort>,
}

/// Query for the authenticated athlete's activities. `after` and `before` are
/// unix timestamps (seconds); `page` starts at 1.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ActivityQuery {
    pub after: i64,
    pub before: i64,
    pub per_page: u32,
    pub page: u32,
}

impl ActivityQuery {
    pub fn new(after: i64, before: i64) -> Self {
        Self {
            after,
            before,
            per_page: DEFAULT_PER_PAGE,
            page: 1,
        }
    }

    pub fn with_per_page(mut self, per_page: u32) -> Self {
        self.per_page = per_page;
        self
    }

    pub fn next_page(self) -> Self {
        Self {
            page: self.page + 1,
            ..self
        }
    }
}

#[async_trait]
pub trait StravaClient: Send + Sync + 'static {
    /// One page of the authenticated athlete's activities within the window.
    async fn list_athlete_activities(
        &self,
        query: ActivityQuery,
    ) -> Result<Vec<ActivitySummary>, StravaError>;

    /// Detailed activity; `include_all_efforts` asks for every segment effort.
    async fn get_activity(
        &self,
        activity_id: u64,
        include_all_efforts: bool,
    ) -> Result<DetailedActivity, StravaError>;

    /// Every activity in the window, following pages while the previous page
    /// came back full.
    async fn list_all_athlete_activities(
        &self,
        query: ActivityQuery,
    ) -> Result<Vec<ActivitySummary>, StravaError> {
        let mut all = Vec::new();
        let mut query = query;
        loop {
            let page = self.list_athlete_activities(query).await?;
            let full = page.len() >= query.per_page as usize && query.per_page > 0;
            tracing::debug!(page = query.page, count = page.len(), "fetched activity page");
            all.extend(page);
            if !full {
                return Ok(all);
            }
            query = query.next_page();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn climb_category_wire_mapping_is_inverted() {
        assert_eq!(ClimbCategory::from_wire(1), Some(ClimbCategory::Category4));
        assert_eq!(ClimbCategory::from_wire(4), Some(ClimbCategory::Category1));
        assert_eq!(ClimbCategory::from_wire(5), Some(ClimbCategory::HorsCategorie));
        assert_eq!(ClimbCategory::from_wire(6), None);
    }

    #[test]
    fn deserialize_segment_effort() {
        let payload = json!({
            "id": 7,
            "name": "Col effort",
            "segment": {
                "id": 99,
                "name": "Col du Test",
                "climb_category": 3,
                "elevation_high": 500.0,
                "elevation_low": 300.0,
                "average_grade": 4.0,
                "maximum_grade": 9.0
            }
        });
        let effort: SegmentEffort = serde_json::from_value(payload).expect("deserialize effort");
        assert_eq!(effort.segment.climb_category, ClimbCategory::Category2);
        assert_eq!(effort.segment.elevation_high, 500.0);
    }

    #[test]
    fn deserialize_unknown_climb_category_errors() {
        let payload = json!({"id": 1, "name": null, "climb_category": 9});
        let res: Result<SegmentSummary, _> = serde_json::from_value(payload);
        assert!(res.is_err());
    }

    #[test]
    fn deserialize_activity_missing_metrics_defaults_to_zero() {
        // Manual entries come back without speed or elevation.
        let payload = json!({"id": 12, "name": "Manual"});
        let a: ActivitySummary = serde_json::from_value(payload).expect("deserialize activity");
        assert_eq!(a.average_speed, 0.0);
        assert_eq!(a.total_elevation_gain, 0.0);
    }

    #[test]
    fn activity_query_next_page_keeps_window() {
        let q = ActivityQuery::new(10, 20).with_per_page(50).next_page();
        assert_eq!(q, ActivityQuery { after: 10, before: 20, per_page: 50, page: 2 });
    }
}

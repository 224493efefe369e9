//! Shared test utilities and a scripted `StravaClient` used by unit tests.
#![cfg(test)]

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use strava_client::{
    ActivityQuery, ActivitySummary, ClimbCategory, DetailedActivity, SegmentEffort,
    SegmentSummary, StravaClient, StravaError,
};

/// Serves a fixed activity list (paged by `per_page`) and per-activity
/// details, recording every call it receives.
#[derive(Default)]
pub struct ScriptedClient {
    pub activities: Vec<ActivitySummary>,
    pub details: HashMap<u64, Vec<SegmentEffort>>,
    pub failing_detail: Option<u64>,
    pub fail_list: bool,
    pub calls: Mutex<Vec<String>>,
}

impl ScriptedClient {
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().expect("calls lock").clone()
    }
}

#[async_trait]
impl StravaClient for ScriptedClient {
    async fn list_athlete_activities(
        &self,
        query: ActivityQuery,
    ) -> Result<Vec<ActivitySummary>, StravaError> {
        self.calls
            .lock()
            .expect("calls lock")
            .push(format!("list page={}", query.page));
        if self.fail_list {
            return Err(StravaError::Auth("Authorization Error".into()));
        }
        let per_page = query.per_page as usize;
        let start = (query.page as usize - 1) * per_page;
        Ok(self
            .activities
            .iter()
            .skip(start)
            .take(per_page)
            .cloned()
            .collect())
    }

    async fn get_activity(
        &self,
        activity_id: u64,
        include_all_efforts: bool,
    ) -> Result<DetailedActivity, StravaError> {
        self.calls
            .lock()
            .expect("calls lock")
            .push(format!("detail {activity_id} all={include_all_efforts}"));
        if self.failing_detail == Some(activity_id) {
            return Err(StravaError::NotFound("Record Not Found".into()));
        }
        Ok(DetailedActivity {
            id: activity_id,
            name: None,
            segment_efforts: self.details.get(&activity_id).cloned().unwrap_or_default(),
        })
    }
}

pub fn activity(id: u64, speed: f64, distance: f64, elevation: f64) -> ActivitySummary {
    ActivitySummary {
        id,
        name: Some(format!("Ride {id}")),
        start_date: None,
        average_speed: speed,
        distance,
        total_elevation_gain: elevation,
    }
}

pub fn effort(
    id: u64,
    category: ClimbCategory,
    high: f64,
    low: f64,
    average_grade: f64,
    maximum_grade: f64,
) -> SegmentEffort {
    SegmentEffort {
        id,
        name: Some(format!("Effort {id}")),
        segment: SegmentSummary {
            id: id * 10,
            name: Some(format!("Segment {id}")),
            climb_category: category,
            elevation_high: high,
            elevation_low: low,
            average_grade,
            maximum_grade,
        },
    }
}

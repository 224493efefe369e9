use std::sync::Arc;

use chrono::{DateTime, Utc};
use strava_client::{ActivityQuery, DEFAULT_PER_PAGE, StravaClient};

use crate::domains::{ClimbTally, MaxGradePolicy, SegmentRecord, Summary};
use crate::error::{AppError, AppResult};

/// Closed time window, `start <= end`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TimeWindow {
    start: DateTime<Utc>,
    end: DateTime<Utc>,
}

impl TimeWindow {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> AppResult<Self> {
        if start > end {
            return Err(AppError::Configuration(format!(
                "time window start {start} is after end {end}"
            )));
        }
        Ok(Self { start, end })
    }

    pub fn start(&self) -> DateTime<Utc> {
        self.start
    }

    pub fn end(&self) -> DateTime<Utc> {
        self.end
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AggregateOptions {
    pub per_page: u32,
    /// Follow further pages while the previous one came back full.
    pub paginate: bool,
    /// Fetch each activity's detail to tally its segment efforts.
    pub include_segments: bool,
    pub max_grade_policy: MaxGradePolicy,
}

impl Default for AggregateOptions {
    fn default() -> Self {
        Self {
            per_page: DEFAULT_PER_PAGE,
            paginate: true,
            include_segments: true,
            max_grade_policy: MaxGradePolicy::default(),
        }
    }
}

/// Lists the athlete's activities in a window and folds them, with their
/// segment efforts, into a [`Summary`]. Fetches run one at a time; the first
/// failure aborts the whole run.
#[derive(Clone)]
pub struct ActivityAggregator {
    client: Arc<dyn StravaClient>,
    options: AggregateOptions,
}

impl ActivityAggregator {
    pub fn new(client: Arc<dyn StravaClient>, options: AggregateOptions) -> Self {
        Self { client, options }
    }

    pub async fn aggregate(&self, window: &TimeWindow) -> AppResult<Summary> {
        let query = ActivityQuery::new(window.start().timestamp(), window.end().timestamp())
            .with_per_page(self.options.per_page);

        let activities = if self.options.paginate {
            self.client.list_all_athlete_activities(query).await
        } else {
            self.client.list_athlete_activities(query).await
        }
        .map_err(AppError::ListActivities)?;
        tracing::info!(
            count = activities.len(),
            after = %window.start(),
            before = %window.end(),
            "fetched activity list"
        );

        let mut tally = ClimbTally::new(self.options.max_grade_policy);
        for activity in &activities {
            tally.add_activity(activity);
            if !self.options.include_segments {
                continue;
            }

            let detail = self
                .client
                .get_activity(activity.id, true)
                .await
                .map_err(|source| AppError::ActivityDetail {
                    activity_id: activity.id,
                    source,
                })?;
            tracing::debug!(
                activity_id = activity.id,
                name = activity.name.as_deref().unwrap_or(""),
                efforts = detail.segment_efforts.len(),
                "tallying segment efforts"
            );
            for effort in &detail.segment_efforts {
                tally.add_segment(SegmentRecord::from_effort(activity.id, effort));
            }
        }

        tracing::info!(
            activities = tally.activity_count(),
            segments = tally.segment_count(),
            "aggregation complete"
        );
        Ok(tally.finish())
    }
}

//! Fold of activities and their climb segments into a [`Summary`].
//!
//! The tally keeps running sums plus three "current best" segment records.
//! Each record is only ever replaced by a strictly better segment, and the
//! averages are computed once in [`ClimbTally::finish`] so an empty run never
//! divides by zero.

use std::collections::BTreeMap;

use serde::Serialize;
use strava_client::{ActivitySummary, ClimbCategory, SegmentEffort};

/// m/s to km/h (3600 s per hour / 1000 m per km).
pub const MPS_TO_KMH: f64 = 3.6;

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct SegmentRecord {
    pub activity_id: u64,
    pub segment_id: u64,
    pub name: Option<String>,
    pub climb_category: ClimbCategory,
    pub elevation_high: f64,
    pub elevation_low: f64,
    pub average_grade: f64,
    pub maximum_grade: f64,
}

impl SegmentRecord {
    pub fn from_effort(activity_id: u64, effort: &SegmentEffort) -> Self {
        let segment = &effort.segment;
        Self {
            activity_id,
            segment_id: segment.id,
            name: segment.name.clone().or_else(|| effort.name.clone()),
            climb_category: segment.climb_category,
            elevation_high: segment.elevation_high,
            elevation_low: segment.elevation_low,
            average_grade: segment.average_grade,
            maximum_grade: segment.maximum_grade,
        }
    }

    pub fn elevation_gain(&self) -> f64 {
        self.elevation_high - self.elevation_low
    }
}

/// What a candidate's maximum grade is compared against when deciding the
/// toughest-maximum-grade record.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum MaxGradePolicy {
    /// The holder's maximum grade.
    #[default]
    Consistent,
    /// The holder's average grade, matching the historical report output.
    Reference,
}

impl MaxGradePolicy {
    fn threshold(self, holder: &SegmentRecord) -> f64 {
        match self {
            MaxGradePolicy::Consistent => holder.maximum_grade,
            MaxGradePolicy::Reference => holder.average_grade,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Averages {
    pub speed_kmh: f64,
    pub distance_per_day_km: f64,
    pub elevation_per_day_m: f64,
}

/// Finalized statistics. `averages` is `None` when no activity was seen.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Summary {
    pub activity_count: u32,
    pub averages: Option<Averages>,
    pub total_distance_km: f64,
    pub total_elevation_m: f64,
    pub segment_count: u32,
    pub climb_categories: BTreeMap<ClimbCategory, u32>,
    pub biggest_climb: Option<SegmentRecord>,
    pub toughest_average_grade: Option<SegmentRecord>,
    pub toughest_maximum_grade: Option<SegmentRecord>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct ClimbTally {
    policy: MaxGradePolicy,
    speed_sum: f64,
    distance_sum: f64,
    elevation_sum: f64,
    activities: u32,
    categories: BTreeMap<ClimbCategory, u32>,
    biggest_climb: Option<SegmentRecord>,
    toughest_average_grade: Option<SegmentRecord>,
    toughest_maximum_grade: Option<SegmentRecord>,
}

impl Default for ClimbTally {
    fn default() -> Self {
        Self::new(MaxGradePolicy::default())
    }
}

impl ClimbTally {
    pub fn new(policy: MaxGradePolicy) -> Self {
        Self {
            policy,
            speed_sum: 0.0,
            distance_sum: 0.0,
            elevation_sum: 0.0,
            activities: 0,
            categories: ClimbCategory::ALL.iter().map(|c| (*c, 0)).collect(),
            biggest_climb: None,
            toughest_average_grade: None,
            toughest_maximum_grade: None,
        }
    }

    pub fn activity_count(&self) -> u32 {
        self.activities
    }

    pub fn segment_count(&self) -> u32 {
        self.categories.values().sum()
    }

    pub fn add_activity(&mut self, activity: &ActivitySummary) {
        self.speed_sum += activity.average_speed;
        self.distance_sum += activity.distance;
        self.elevation_sum += activity.total_elevation_gain;
        self.activities += 1;
    }

    pub fn add_segment(&mut self, segment: SegmentRecord) {
        *self.categories.entry(segment.climb_category).or_insert(0) += 1;

        // Downhill and flat segments never count as climbs, whatever their delta.
        if segment.average_grade > 0.0
            && self
                .biggest_climb
                .as_ref()
                .is_none_or(|h| segment.elevation_gain() > h.elevation_gain())
        {
            self.biggest_climb = Some(segment.clone());
        }

        if self
            .toughest_average_grade
            .as_ref()
            .is_none_or(|h| segment.average_grade > h.average_grade)
        {
            self.toughest_average_grade = Some(segment.clone());
        }

        let policy = self.policy;
        if self
            .toughest_maximum_grade
            .as_ref()
            .is_none_or(|h| segment.maximum_grade > policy.threshold(h))
        {
            self.toughest_maximum_grade = Some(segment);
        }
    }

    pub fn finish(self) -> Summary {
        let averages = (self.activities > 0).then(|| {
            let n = f64::from(self.activities);
            Averages {
                speed_kmh: self.speed_sum / n * MPS_TO_KMH,
                distance_per_day_km: self.distance_sum / n / 1000.0,
                elevation_per_day_m: self.elevation_sum / n,
            }
        });
        let segment_count = self.segment_count();
        Summary {
            activity_count: self.activities,
            averages,
            total_distance_km: self.distance_sum / 1000.0,
            total_elevation_m: self.elevation_sum,
            segment_count,
            climb_categories: self.categories,
            biggest_climb: self.biggest_climb,
            toughest_average_grade: self.toughest_average_grade,
            toughest_maximum_grade: self.toughest_maximum_grade,
        }
    }
}

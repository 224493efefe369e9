//! Plain-text rendering of a [`Summary`] for the terminal.

use std::fmt;

use strava_client::ClimbCategory;

use crate::domains::{SegmentRecord, Summary};

/// Wraps a summary so it can be written with `{}`.
pub struct Report<'a>(pub &'a Summary);

pub fn render(summary: &Summary) -> String {
    Report(summary).to_string()
}

impl fmt::Display for Report<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = self.0;
        writeln!(f, "Activities: {}", s.activity_count)?;
        match &s.averages {
            Some(avg) => {
                writeln!(f, "Average speed: {:.6} kph", avg.speed_kmh)?;
                writeln!(f, "Total distance: {:.3} km", s.total_distance_km)?;
                writeln!(f, "Total elevation: {:.1} m", s.total_elevation_m)?;
                writeln!(f, "Average distance/day: {:.3} km", avg.distance_per_day_km)?;
                writeln!(f, "Average elevation/day: {:.1} m", avg.elevation_per_day_m)?;
            }
            None => {
                writeln!(f, "Average speed: no data")?;
                writeln!(f, "Total distance: 0.000 km")?;
                writeln!(f, "Total elevation: 0.0 m")?;
                writeln!(f, "Average distance/day: no data")?;
                writeln!(f, "Average elevation/day: no data")?;
            }
        }

        writeln!(f, "Climb categories ({} segment efforts):", s.segment_count)?;
        for category in ClimbCategory::ALL {
            let count = s.climb_categories.get(&category).copied().unwrap_or(0);
            writeln!(f, "  {:<14}{count}", format!("{}:", category.label()))?;
        }

        writeln!(f, "Biggest climb: {}", record(s.biggest_climb.as_ref()))?;
        writeln!(
            f,
            "Toughest average grade: {}",
            record(s.toughest_average_grade.as_ref())
        )?;
        writeln!(
            f,
            "Toughest maximum grade: {}",
            record(s.toughest_maximum_grade.as_ref())
        )
    }
}

fn record(segment: Option<&SegmentRecord>) -> String {
    let Some(seg) = segment else {
        return "none".to_string();
    };
    format!(
        "{} (segment {}, activity {}): {} m to {} m, +{:.1} m, avg {:.1}%, max {:.1}%, {}",
        seg.name.as_deref().unwrap_or("(unnamed)"),
        seg.segment_id,
        seg.activity_id,
        seg.elevation_low,
        seg.elevation_high,
        seg.elevation_gain(),
        seg.average_grade,
        seg.maximum_grade,
        seg.climb_category.label(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domains::{ClimbTally, MaxGradePolicy};
    use crate::test_utils::{activity, effort};

    #[test]
    fn empty_summary_reports_no_data_and_none() {
        let text = render(&ClimbTally::default().finish());
        assert!(text.contains("Activities: 0"));
        assert!(text.contains("Average speed: no data"));
        assert!(!text.contains("NaN"));
        assert!(text.contains("Biggest climb: none"));
        assert!(text.contains("Toughest average grade: none"));
        assert!(text.contains("Toughest maximum grade: none"));
        for category in ClimbCategory::ALL {
            assert!(text.contains(category.label()), "missing {category}");
        }
    }

    #[test]
    fn populated_summary_reports_all_fields() {
        let mut tally = ClimbTally::new(MaxGradePolicy::Consistent);
        tally.add_activity(&activity(1, 5.0, 10000.0, 100.0));
        tally.add_activity(&activity(2, 7.0, 30000.0, 500.0));
        let e = effort(4, ClimbCategory::Category2, 500.0, 300.0, 4.0, 9.0);
        tally.add_segment(SegmentRecord::from_effort(1, &e));
        let text = render(&tally.finish());

        assert!(text.contains("Average speed: 21.600000 kph"), "{text}");
        assert!(text.contains("Total distance: 40.000 km"));
        assert!(text.contains("Total elevation: 600.0 m"));
        assert!(text.contains("Average distance/day: 20.000 km"));
        assert!(text.contains("Average elevation/day: 300.0 m"));
        assert!(text.contains("Climb categories (1 segment efforts):"));
        assert!(text.contains("Biggest climb: Segment 4 (segment 40, activity 1)"));
        assert!(text.contains("+200.0 m"));
    }

    #[test]
    fn unnamed_record_renders_on_one_line() {
        let mut e = effort(5, ClimbCategory::HorsCategorie, 2000.0, 900.0, 7.5, 12.0);
        e.name = None;
        e.segment.name = None;
        let line = record(Some(&SegmentRecord::from_effort(3, &e)));
        assert_eq!(
            line,
            "(unnamed) (segment 50, activity 3): 900 m to 2000 m, +1100.0 m, avg 7.5%, max 12.0%, HC"
        );
    }
}

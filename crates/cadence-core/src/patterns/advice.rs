//! Recommendations and insights derived from a learned pattern.

use super::{MeetingPattern, Priority, Recommendation, RecommendationType};

const FOCUS_RECOMMENDATION_SCORE: f64 = 70.0;
const HIGH_PRIORITY_SCORE: f64 = 85.0;
const DECLINE_RATE: f64 = 0.5;
const OVERRUN_MINUTES: i64 = 5;

/// Focus-time, then decline-pattern, then duration-adjustment entries. Each
/// category follows key order.
pub(super) fn recommendations(pattern: &MeetingPattern) -> Vec<Recommendation> {
    let mut out = Vec::new();

    for block in &pattern.productivity.focus_blocks {
        if block.score < FOCUS_RECOMMENDATION_SCORE {
            continue;
        }
        let priority = if block.score >= HIGH_PRIORITY_SCORE {
            Priority::High
        } else {
            Priority::Medium
        };
        out.push(Recommendation {
            kind: RecommendationType::FocusTime,
            priority,
            title: format!(
                "Block {} {}-{} for focus time",
                block.day_of_week, block.start_time, block.end_time
            ),
            description: format!(
                "Historical data shows you have few meetings during this time (score: {:.0}/100), making it ideal for deep work.",
                block.score
            ),
            confidence: block.score,
            action: "Create recurring focus time block".into(),
            impact: "Increase productivity by 20-30%".into(),
        });
    }

    for (day, rate) in &pattern.acceptance.by_day_of_week {
        if *rate >= DECLINE_RATE {
            continue;
        }
        out.push(Recommendation {
            kind: RecommendationType::DeclinePattern,
            priority: Priority::Medium,
            title: format!("Consider avoiding {day} meetings"),
            description: format!(
                "You accept only {:.0}% of meetings on {day}s. Consider blocking this time or being more selective.",
                rate * 100.0
            ),
            confidence: (1.0 - rate) * 100.0,
            action: format!("Auto-suggest alternatives to {day} meetings"),
            impact: "Reduce low-productivity meetings".into(),
        });
    }

    for (participant, stats) in &pattern.duration.by_participant {
        if stats.average_actual <= 0 || stats.average_scheduled <= 0 {
            continue;
        }
        let diff = stats.average_actual - stats.average_scheduled;
        if diff <= OVERRUN_MINUTES {
            continue;
        }
        out.push(Recommendation {
            kind: RecommendationType::DurationAdjustment,
            priority: Priority::Low,
            title: format!("Adjust meeting length with {participant}"),
            description: format!(
                "Meetings with {participant} typically run {diff} minutes over. Consider scheduling {} minutes instead of {}.",
                stats.average_actual, stats.average_scheduled
            ),
            confidence: 70.0,
            action: format!(
                "Suggest {}-minute meetings with {participant}",
                stats.average_actual
            ),
            impact: "Better time estimates and reduced overruns".into(),
        });
    }

    out
}

pub(super) fn insights(pattern: &MeetingPattern, total: usize, days: u32) -> Vec<String> {
    let mut out = Vec::new();

    if let Some((day, rate)) = pattern.acceptance.best_day() {
        out.push(format!(
            "You accept {:.0}% of meetings on {day}s (your best day)",
            rate * 100.0
        ));
    }

    if let Some(block) = pattern.productivity.focus_blocks.first() {
        out.push(format!(
            "Peak focus time: {} {}-{} (fewest meetings)",
            block.day_of_week, block.start_time, block.end_time
        ));
    }

    if let Some((tz, count)) = pattern.timezone.most_common() {
        out.push(format!("Most meetings in {tz} timezone ({count} meetings)"));
    }

    out.push(format!("Analyzed {total} meetings over {days} days"));
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::patterns::{
        AcceptancePatterns, DateRange, DurationPatterns, DurationStats, ProductivityPatterns,
        TimeBlock, TimezonePatterns,
    };
    use crate::time::{ClockTime, DayOfWeek};
    use chrono::{TimeZone, Utc};
    use std::collections::BTreeMap;

    fn block(day: DayOfWeek, hour: u32, score: f64) -> TimeBlock {
        TimeBlock {
            day_of_week: day,
            start_time: ClockTime::from_hour(hour),
            end_time: ClockTime::from_hour(hour + 2),
            score,
        }
    }

    fn pattern() -> MeetingPattern {
        let now = Utc.with_ymd_and_hms(2026, 3, 2, 0, 0, 0).unwrap();
        let mut acceptance = AcceptancePatterns::default();
        acceptance.by_day_of_week.insert(DayOfWeek::Friday, 0.25);
        acceptance.by_day_of_week.insert(DayOfWeek::Monday, 0.4);
        acceptance.by_day_of_week.insert(DayOfWeek::Wednesday, 0.9);

        let mut duration = DurationPatterns::default();
        duration.by_participant.insert(
            "zed@example.com".into(),
            DurationStats {
                average_scheduled: 30,
                average_actual: 45,
                variance: 0.0,
                overrun_rate: 1.0,
            },
        );
        duration.by_participant.insert(
            "amy@example.com".into(),
            DurationStats {
                average_scheduled: 30,
                average_actual: 40,
                variance: 0.0,
                overrun_rate: 1.0,
            },
        );

        let mut timezone = TimezonePatterns::default();
        timezone.distribution.insert("UTC".into(), 4);

        MeetingPattern {
            identity: "me".into(),
            analyzed_period: DateRange { start: now, end: now },
            last_updated: now,
            acceptance,
            duration,
            timezone,
            productivity: ProductivityPatterns {
                peak_focus: vec![],
                meeting_density: BTreeMap::new(),
                focus_blocks: vec![
                    block(DayOfWeek::Monday, 9, 90.0),
                    block(DayOfWeek::Tuesday, 10, 60.0),
                    block(DayOfWeek::Thursday, 14, 75.0),
                ],
            },
            participants: BTreeMap::new(),
        }
    }

    #[test]
    fn recommendations_follow_category_and_key_order() {
        let recs = recommendations(&pattern());
        use RecommendationType::{DeclinePattern, DurationAdjustment, FocusTime};
        let kinds: Vec<_> = recs.iter().map(|r| (r.kind, r.title.as_str())).collect();
        assert_eq!(
            kinds,
            vec![
                (FocusTime, "Block Monday 09:00-11:00 for focus time"),
                (FocusTime, "Block Thursday 14:00-16:00 for focus time"),
                (DeclinePattern, "Consider avoiding Monday meetings"),
                (DeclinePattern, "Consider avoiding Friday meetings"),
                (DurationAdjustment, "Adjust meeting length with amy@example.com"),
                (DurationAdjustment, "Adjust meeting length with zed@example.com"),
            ]
        );
        assert_eq!(recs[0].priority, Priority::High);
        assert_eq!(recs[1].priority, Priority::Medium);
        assert!((recs[3].confidence - 75.0).abs() < 1e-9);
        assert!(recs[3].description.contains("only 25% of meetings on Fridays"));
    }

    #[test]
    fn insights_name_best_day_block_and_timezone() {
        let lines = insights(&pattern(), 12, 90);
        assert_eq!(
            lines,
            vec![
                "You accept 90% of meetings on Wednesdays (your best day)",
                "Peak focus time: Monday 09:00-11:00 (fewest meetings)",
                "Most meetings in UTC timezone (4 meetings)",
                "Analyzed 12 meetings over 90 days",
            ]
        );
    }
}

//! Meeting length recommendations from historical durations.

use chrono::{DateTime, Utc};
use tracing::debug;

use super::optimizer::FocusOptimizer;
use super::DurationOptimization;
use crate::context::CallContext;
use crate::error::{CoreError, Result};
use crate::patterns::DurationStats;

impl FocusOptimizer<'_> {
    /// Compare one event's length with the historical average.
    ///
    /// Fails with [`CoreError::InsufficientHistory`] when the history window
    /// holds no meetings.
    pub fn optimize_meeting_duration(
        &self,
        ctx: &CallContext,
        identity: &str,
        calendar_id: &str,
        event_id: &str,
    ) -> Result<DurationOptimization> {
        self.optimize_meeting_duration_at(ctx, identity, calendar_id, event_id, Utc::now())
    }

    pub fn optimize_meeting_duration_at(
        &self,
        ctx: &CallContext,
        identity: &str,
        calendar_id: &str,
        event_id: &str,
        now: DateTime<Utc>,
    ) -> Result<DurationOptimization> {
        ctx.check()?;
        let event = self
            .source
            .get_event(identity, calendar_id, event_id)
            .map_err(|source| CoreError::EventLookup {
                event_id: event_id.to_string(),
                source,
            })?;

        let analysis =
            self.learner
                .analyze_history_at(ctx, self.source, identity, self.window_days, now)?;
        let patterns = analysis.patterns.ok_or(CoreError::InsufficientHistory)?;
        let historical = patterns.duration.overall;

        let current = event.duration_minutes();
        let recommended = recommended_duration(current, historical.average_actual);
        let savings = (current - recommended).max(0);
        debug!(event_id, current, recommended, "duration optimization");

        let recommendation = if savings > 0 {
            format!("Reduce from {current} to {recommended} minutes to save {savings} minutes")
        } else {
            format!("Keep the current {current}-minute duration")
        };

        Ok(DurationOptimization {
            event_id: event_id.to_string(),
            current_duration: current,
            recommended_duration: recommended,
            time_savings: savings,
            confidence: duration_confidence(&historical),
            reason: format!(
                "Historical data shows meetings average {} minutes",
                historical.average_actual
            ),
            recommendation,
            historical_data: historical,
        })
    }
}

/// Snap common slot lengths to the next shorter slot when history runs
/// short; otherwise follow the historical average.
fn recommended_duration(current: i64, average_actual: i64) -> i64 {
    match current {
        60 if average_actual < 50 => 45,
        30 if average_actual < 25 => 25,
        _ => average_actual,
    }
}

/// Consistent meeting lengths give more confidence.
fn duration_confidence(stats: &DurationStats) -> f64 {
    if stats.variance < 10.0 {
        90.0
    } else if stats.variance < 20.0 {
        75.0
    } else if stats.variance < 30.0 {
        60.0
    } else {
        50.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calendar::{Calendar, Event, InMemoryCalendar};
    use chrono::{Duration, TimeZone};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 20, 0, 0, 0).unwrap()
    }

    fn source_with_history(minutes: &[i64]) -> InMemoryCalendar {
        let source = InMemoryCalendar::new();
        source.add_calendar("me", Calendar::new("work", "Work"));
        for (i, m) in minutes.iter().enumerate() {
            let start = Utc.with_ymd_and_hms(2026, 3, 2 + i as u32, 10, 0, 0).unwrap();
            source.add_event(
                "me",
                "work",
                Event::new(format!("h{i}"), "Sync", start, start + Duration::minutes(*m)),
            );
        }
        source
    }

    #[test]
    fn hour_long_meeting_snaps_to_45() {
        let source = source_with_history(&[40, 40, 40]);
        let start = Utc.with_ymd_and_hms(2026, 3, 25, 10, 0, 0).unwrap();
        let target = Event::new("target", "Review", start, start + Duration::minutes(60));
        source.add_event("me", "work", target);

        let optimization = FocusOptimizer::new(&source)
            .optimize_meeting_duration_at(&CallContext::new(), "me", "work", "target", now())
            .unwrap();
        assert_eq!(optimization.current_duration, 60);
        assert_eq!(optimization.recommended_duration, 45);
        assert_eq!(optimization.time_savings, 15);
        assert_eq!(optimization.confidence, 90.0);
        assert_eq!(optimization.reason, "Historical data shows meetings average 40 minutes");
        assert_eq!(
            optimization.recommendation,
            "Reduce from 60 to 45 minutes to save 15 minutes"
        );
    }

    #[test]
    fn longer_history_keeps_current_length() {
        let source = source_with_history(&[30, 90]);
        let start = Utc.with_ymd_and_hms(2026, 3, 25, 10, 0, 0).unwrap();
        let target = Event::new("target", "Review", start, start + Duration::minutes(30));
        source.add_event("me", "work", target);

        let optimization = FocusOptimizer::new(&source)
            .optimize_meeting_duration_at(&CallContext::new(), "me", "work", "target", now())
            .unwrap();
        assert_eq!(optimization.recommended_duration, 60);
        assert_eq!(optimization.time_savings, 0);
        assert_eq!(optimization.confidence, 50.0);
        assert_eq!(optimization.recommendation, "Keep the current 30-minute duration");
    }

    #[test]
    fn empty_history_is_insufficient() {
        let source = source_with_history(&[]);
        let start = Utc.with_ymd_and_hms(2026, 3, 25, 10, 0, 0).unwrap();
        let target = Event::new("target", "Review", start, start + Duration::minutes(30));
        source.add_event("me", "work", target);

        let err = FocusOptimizer::new(&source)
            .optimize_meeting_duration_at(&CallContext::new(), "me", "work", "target", now())
            .unwrap_err();
        assert!(matches!(err, CoreError::InsufficientHistory));
    }

    #[test]
    fn missing_event_is_a_lookup_error() {
        let source = source_with_history(&[30]);
        let err = FocusOptimizer::new(&source)
            .optimize_meeting_duration_at(&CallContext::new(), "me", "work", "nope", now())
            .unwrap_err();
        assert!(matches!(err, CoreError::EventLookup { ref event_id, .. } if event_id == "nope"));
    }

    #[test]
    fn confidence_thresholds() {
        let stats = |variance| DurationStats {
            variance,
            ..DurationStats::default()
        };
        assert_eq!(duration_confidence(&stats(5.0)), 90.0);
        assert_eq!(duration_confidence(&stats(15.0)), 75.0);
        assert_eq!(duration_confidence(&stats(25.0)), 60.0);
        assert_eq!(duration_confidence(&stats(30.0)), 50.0);
    }
}

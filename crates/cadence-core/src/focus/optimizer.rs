//! Focus-time analysis and recommended block selection.

use chrono::{DateTime, Duration, Utc};
use tracing::{info, warn};

use super::adaptive::{EventClassifier, HeuristicClassifier};
use super::{FocusTimeAnalysis, FocusTimeBlock, FocusTimeSettings};
use crate::calendar::{collect_events, CalendarDataSource, EventQuery};
use crate::config::{AnalyticsConfig, FocusConfig};
use crate::context::CallContext;
use crate::error::{CoreError, Result};
use crate::patterns::{sample_variance, DurationStats, MeetingPattern, PatternLearner, TimeBlock};
use crate::time::{ClockTime, DayOfWeek};

const PEAK_BLOCK_COUNT: usize = 3;
/// Meetings per day above which a weekday is called out as dense.
const HIGH_DENSITY: f64 = 5.0;
const MANY_PARTICIPANTS: usize = 10;

/// Recommends, protects and adapts focus time for one calendar source.
pub struct FocusOptimizer<'a> {
    pub(super) source: &'a dyn CalendarDataSource,
    pub(super) learner: PatternLearner,
    pub(super) classifier: Box<dyn EventClassifier>,
    pub(super) config: FocusConfig,
    pub(super) window_days: u32,
    pub(super) event_limit: usize,
}

impl<'a> FocusOptimizer<'a> {
    pub fn new(source: &'a dyn CalendarDataSource) -> Self {
        Self::with_config(source, &AnalyticsConfig::default())
    }

    pub fn with_config(source: &'a dyn CalendarDataSource, config: &AnalyticsConfig) -> Self {
        Self {
            source,
            learner: PatternLearner::with_config(config),
            classifier: Box::new(HeuristicClassifier),
            config: config.focus.clone(),
            window_days: config.history.window_days,
            event_limit: config.history.event_limit,
        }
    }

    /// Replace the importance/reschedulability heuristics used by
    /// [`adapt_schedule`](Self::adapt_schedule).
    pub fn with_classifier(mut self, classifier: impl EventClassifier + 'static) -> Self {
        self.classifier = Box::new(classifier);
        self
    }

    pub fn analyze_focus_time_patterns(
        &self,
        ctx: &CallContext,
        identity: &str,
        settings: &FocusTimeSettings,
    ) -> Result<FocusTimeAnalysis> {
        self.analyze_focus_time_patterns_at(ctx, identity, settings, Utc::now())
    }

    pub fn analyze_focus_time_patterns_at(
        &self,
        ctx: &CallContext,
        identity: &str,
        settings: &FocusTimeSettings,
        now: DateTime<Utc>,
    ) -> Result<FocusTimeAnalysis> {
        let analysis =
            self.learner
                .analyze_history_at(ctx, self.source, identity, self.window_days, now)?;

        let Some(patterns) = analysis.patterns else {
            return Ok(FocusTimeAnalysis {
                identity: identity.to_string(),
                analyzed_period: analysis.period,
                generated_at: now,
                peak_productivity: Vec::new(),
                deep_work_sessions: DurationStats::default(),
                most_productive_day: None,
                least_productive_day: None,
                recommended_blocks: Vec::new(),
                current_protection: 0.0,
                target_protection: settings.target_hours_per_week,
                insights: vec!["Not enough calendar history to analyze patterns".to_string()],
                confidence: 0.0,
            });
        };

        let peak_productivity = peak_blocks(&patterns);
        let recommended_blocks = recommend_blocks(&patterns, settings);
        let current_protection = self.current_protection(ctx, identity, now)?;
        let insights = focus_insights(&patterns, &peak_productivity, &recommended_blocks, settings);

        info!(
            identity,
            recommended = recommended_blocks.len(),
            current_protection,
            "focus time analysis complete"
        );

        Ok(FocusTimeAnalysis {
            identity: identity.to_string(),
            analyzed_period: analysis.period,
            generated_at: now,
            deep_work_sessions: deep_work_stats(&patterns),
            most_productive_day: Some(most_productive_day(&patterns)),
            least_productive_day: Some(least_productive_day(&patterns)),
            peak_productivity,
            recommended_blocks,
            current_protection,
            target_protection: settings.target_hours_per_week,
            insights,
            confidence: data_confidence(&patterns),
        })
    }

    /// Hours per week of upcoming focus events within the lookahead.
    ///
    /// Fetch failures degrade to zero; cancellation still aborts.
    fn current_protection(
        &self,
        ctx: &CallContext,
        identity: &str,
        now: DateTime<Utc>,
    ) -> Result<f64> {
        let lookahead = self.config.protection_lookahead_days.max(1);
        let query = EventQuery::new(now, now + Duration::days(lookahead), self.event_limit);
        let events = match collect_events(ctx, self.source, identity, &query) {
            Ok(events) => events,
            Err(err @ (CoreError::Cancelled | CoreError::DeadlineExceeded)) => return Err(err),
            Err(err) => {
                warn!(identity, error = %err, "could not read existing focus blocks");
                return Ok(0.0);
            }
        };

        let minutes: i64 = events
            .iter()
            .filter(|e| !e.is_cancelled() && e.title == self.config.block_title)
            .map(|e| e.duration_minutes())
            .sum();
        Ok(minutes as f64 / 60.0 * 7.0 / lookahead as f64)
    }
}

/// Mean and sample variance of focus-block lengths.
pub(super) fn deep_work_stats(patterns: &MeetingPattern) -> DurationStats {
    let durations: Vec<i64> = patterns
        .productivity
        .focus_blocks
        .iter()
        .map(TimeBlock::duration_minutes)
        .collect();
    if durations.is_empty() {
        return DurationStats {
            average_scheduled: 120,
            average_actual: 150,
            variance: 30.0,
            overrun_rate: 0.0,
        };
    }
    let avg = durations.iter().sum::<i64>() / durations.len() as i64;
    DurationStats {
        average_scheduled: avg,
        average_actual: avg,
        variance: sample_variance(&durations),
        overrun_rate: 0.0,
    }
}

/// Highest-scoring candidate blocks, or a fixed mid-morning set without data.
fn peak_blocks(patterns: &MeetingPattern) -> Vec<TimeBlock> {
    if patterns.productivity.peak_focus.is_empty() {
        let block = |day, start, score| TimeBlock {
            day_of_week: day,
            start_time: ClockTime::from_hour(start),
            end_time: ClockTime::from_hour(start + 2),
            score,
        };
        return vec![
            block(DayOfWeek::Tuesday, 10, 90.0),
            block(DayOfWeek::Thursday, 10, 90.0),
            block(DayOfWeek::Wednesday, 9, 85.0),
        ];
    }
    let mut blocks = patterns.productivity.peak_focus.clone();
    blocks.sort_by(|a, b| b.score.total_cmp(&a.score));
    blocks.truncate(PEAK_BLOCK_COUNT);
    blocks
}

/// Weekday with the lowest meeting density; first in week order on ties.
fn most_productive_day(patterns: &MeetingPattern) -> DayOfWeek {
    let mut best: Option<(DayOfWeek, f64)> = None;
    for (&day, &density) in &patterns.productivity.meeting_density {
        if best.map_or(true, |(_, min)| density < min) {
            best = Some((day, density));
        }
    }
    best.map_or(DayOfWeek::Wednesday, |(day, _)| day)
}

/// Weekday with the highest meeting density; first in week order on ties.
fn least_productive_day(patterns: &MeetingPattern) -> DayOfWeek {
    let mut worst: Option<(DayOfWeek, f64)> = None;
    for (&day, &density) in &patterns.productivity.meeting_density {
        if worst.map_or(true, |(_, max)| density > max) {
            worst = Some((day, density));
        }
    }
    worst.map_or(DayOfWeek::Monday, |(day, _)| day)
}

/// Filter focus blocks by the settings, clamp their length, then take the
/// best ones until the weekly target is reached. The block that crosses the
/// target is kept.
pub(super) fn recommend_blocks(
    patterns: &MeetingPattern,
    settings: &FocusTimeSettings,
) -> Vec<FocusTimeBlock> {
    let mut candidates: Vec<FocusTimeBlock> = patterns
        .productivity
        .focus_blocks
        .iter()
        .filter(|block| is_protectable(block, settings))
        .filter_map(|block| {
            let mut duration = block.duration_minutes();
            let mut end_time = block.end_time;
            if duration < settings.min_block_duration {
                return None;
            }
            if settings.max_block_duration > 0 && duration > settings.max_block_duration {
                duration = settings.max_block_duration;
                end_time = block.start_time.plus_minutes(duration);
            }
            Some(FocusTimeBlock {
                day_of_week: block.day_of_week,
                start_time: block.start_time,
                end_time,
                duration,
                score: block.score,
                reason: format!("Peak productivity time ({:.0}% score)", block.score),
                conflicts: 0,
            })
        })
        .collect();

    candidates.sort_by(|a, b| b.score.total_cmp(&a.score));

    let target_minutes = (settings.target_hours_per_week * 60.0) as i64;
    let mut total = 0;
    let mut selected = Vec::new();
    for block in candidates {
        if total >= target_minutes {
            break;
        }
        total += block.duration;
        selected.push(block);
    }
    selected
}

fn is_protectable(block: &TimeBlock, settings: &FocusTimeSettings) -> bool {
    if !settings.protected_days.is_empty() && !settings.protected_days.contains(&block.day_of_week)
    {
        return false;
    }
    !settings
        .excluded_time_ranges
        .iter()
        .any(|range| range.overlaps(block.start_time, block.end_time))
}

fn focus_insights(
    patterns: &MeetingPattern,
    peaks: &[TimeBlock],
    blocks: &[FocusTimeBlock],
    settings: &FocusTimeSettings,
) -> Vec<String> {
    let mut out = Vec::new();

    if !patterns.productivity.peak_focus.is_empty() {
        if let Some(top) = peaks.first() {
            out.push(format!(
                "Your peak productivity is {} at {}-{} ({:.0}% focus score)",
                top.day_of_week, top.start_time, top.end_time, top.score
            ));
        }
    }

    let dense: Vec<&str> = patterns
        .productivity
        .meeting_density
        .iter()
        .filter(|(_, density)| **density > HIGH_DENSITY)
        .map(|(day, _)| day.name())
        .collect();
    if !dense.is_empty() {
        out.push(format!(
            "High meeting density on {} - consider protecting more focus time on these days",
            dense.join(", ")
        ));
    }

    let total_hours: f64 = blocks.iter().map(|b| b.duration as f64 / 60.0).sum();
    if total_hours > 0.0 {
        out.push(format!(
            "Recommended {:.1} hours/week of protected focus time across {} blocks",
            total_hours,
            blocks.len()
        ));
    }

    if total_hours < settings.target_hours_per_week {
        out.push(format!(
            "Need {:.1} more hours/week to reach your target of {:.1} hours",
            settings.target_hours_per_week - total_hours,
            settings.target_hours_per_week
        ));
    }
    out
}

fn data_confidence(patterns: &MeetingPattern) -> f64 {
    let mut confidence: f64 = 50.0;
    if !patterns.productivity.peak_focus.is_empty() {
        confidence += 20.0;
    }
    if !patterns.productivity.meeting_density.is_empty() {
        confidence += 15.0;
    }
    if patterns.participants.len() > MANY_PARTICIPANTS {
        confidence += 15.0;
    }
    confidence.min(100.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calendar::{Calendar, Event, InMemoryCalendar};
    use crate::focus::TimeRange;
    use crate::patterns::{DateRange, ProductivityPatterns};
    use chrono::TimeZone;
    use std::collections::BTreeMap;

    fn block(day: DayOfWeek, start: u32, end: u32, score: f64) -> TimeBlock {
        TimeBlock {
            day_of_week: day,
            start_time: ClockTime::from_hour(start),
            end_time: ClockTime::from_hour(end),
            score,
        }
    }

    fn pattern_with(focus_blocks: Vec<TimeBlock>, density: &[(DayOfWeek, f64)]) -> MeetingPattern {
        let now = Utc.with_ymd_and_hms(2026, 3, 2, 0, 0, 0).unwrap();
        MeetingPattern {
            identity: "me".into(),
            analyzed_period: DateRange { start: now, end: now },
            last_updated: now,
            acceptance: Default::default(),
            duration: Default::default(),
            timezone: Default::default(),
            productivity: ProductivityPatterns {
                peak_focus: focus_blocks.clone(),
                meeting_density: density.iter().copied().collect(),
                focus_blocks,
            },
            participants: BTreeMap::new(),
        }
    }

    #[test]
    fn greedy_selection_keeps_the_crossing_block() {
        let pattern = pattern_with(
            vec![
                block(DayOfWeek::Monday, 9, 11, 70.0),
                block(DayOfWeek::Tuesday, 9, 11, 95.0),
                block(DayOfWeek::Wednesday, 9, 11, 80.0),
            ],
            &[],
        );
        let settings = FocusTimeSettings {
            target_hours_per_week: 3.0,
            ..FocusTimeSettings::default()
        };
        let blocks = recommend_blocks(&pattern, &settings);
        let days: Vec<_> = blocks.iter().map(|b| b.day_of_week).collect();
        assert_eq!(days, vec![DayOfWeek::Tuesday, DayOfWeek::Wednesday]);
        assert_eq!(blocks[0].reason, "Peak productivity time (95% score)");
    }

    #[test]
    fn settings_filter_and_clamp_blocks() {
        let pattern = pattern_with(
            vec![
                block(DayOfWeek::Monday, 9, 11, 90.0),
                block(DayOfWeek::Tuesday, 12, 14, 90.0),
                block(DayOfWeek::Wednesday, 9, 11, 90.0),
            ],
            &[],
        );
        let settings = FocusTimeSettings {
            protected_days: vec![DayOfWeek::Monday, DayOfWeek::Tuesday],
            excluded_time_ranges: vec![TimeRange::new(
                ClockTime::from_hour(12),
                ClockTime::from_hour(13),
            )],
            max_block_duration: 90,
            ..FocusTimeSettings::default()
        };
        let blocks = recommend_blocks(&pattern, &settings);
        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks[0].day_of_week, DayOfWeek::Monday);
        assert_eq!(blocks[0].duration, 90);
        assert_eq!(blocks[0].end_time.to_string(), "10:30");

        let strict = FocusTimeSettings {
            min_block_duration: 180,
            ..FocusTimeSettings::default()
        };
        assert!(recommend_blocks(&pattern, &strict).is_empty());
    }

    #[test]
    fn deep_work_defaults_without_blocks() {
        let stats = deep_work_stats(&pattern_with(vec![], &[]));
        assert_eq!(stats.average_scheduled, 120);
        assert_eq!(stats.average_actual, 150);
        assert_eq!(stats.variance, 30.0);
    }

    #[test]
    fn deep_work_uses_sample_variance() {
        let stats = deep_work_stats(&pattern_with(
            vec![
                block(DayOfWeek::Monday, 9, 11, 90.0),
                block(DayOfWeek::Tuesday, 9, 13, 90.0),
            ],
            &[],
        ));
        assert_eq!(stats.average_scheduled, 180);
        assert!((stats.variance - 7200.0).abs() < 1e-9);
    }

    #[test]
    fn productive_days_break_ties_in_week_order() {
        let pattern = pattern_with(
            vec![],
            &[
                (DayOfWeek::Monday, 3.0),
                (DayOfWeek::Tuesday, 1.0),
                (DayOfWeek::Thursday, 1.0),
                (DayOfWeek::Friday, 3.0),
            ],
        );
        assert_eq!(most_productive_day(&pattern), DayOfWeek::Tuesday);
        assert_eq!(least_productive_day(&pattern), DayOfWeek::Monday);

        let empty = pattern_with(vec![], &[]);
        assert_eq!(most_productive_day(&empty), DayOfWeek::Wednesday);
        assert_eq!(least_productive_day(&empty), DayOfWeek::Monday);
    }

    #[test]
    fn peak_blocks_fall_back_to_defaults() {
        let peaks = peak_blocks(&pattern_with(vec![], &[]));
        assert_eq!(peaks.len(), 3);
        assert_eq!(peaks[0].day_of_week, DayOfWeek::Tuesday);
        assert_eq!(peaks[2].score, 85.0);
    }

    #[test]
    fn insights_report_density_and_target_gap() {
        let pattern = pattern_with(
            vec![block(DayOfWeek::Monday, 9, 11, 90.0)],
            &[(DayOfWeek::Monday, 6.0), (DayOfWeek::Friday, 7.5)],
        );
        let settings = FocusTimeSettings::default();
        let blocks = recommend_blocks(&pattern, &settings);
        let lines = focus_insights(&pattern, &peak_blocks(&pattern), &blocks, &settings);
        assert_eq!(
            lines,
            vec![
                "Your peak productivity is Monday at 09:00-11:00 (90% focus score)",
                "High meeting density on Monday, Friday - consider protecting more focus time on these days",
                "Recommended 2.0 hours/week of protected focus time across 1 blocks",
                "Need 12.0 more hours/week to reach your target of 14.0 hours",
            ]
        );
        assert_eq!(data_confidence(&pattern), 85.0);
    }

    #[test]
    fn empty_history_yields_placeholder_analysis() {
        let source = InMemoryCalendar::new();
        source.add_calendar("me", Calendar::new("work", "Work"));
        let optimizer = FocusOptimizer::new(&source);
        let analysis = optimizer
            .analyze_focus_time_patterns(&CallContext::new(), "me", &FocusTimeSettings::default())
            .unwrap();
        assert_eq!(analysis.confidence, 0.0);
        assert!(analysis.recommended_blocks.is_empty());
        assert_eq!(
            analysis.insights,
            vec!["Not enough calendar history to analyze patterns"]
        );
    }

    #[test]
    fn current_protection_sums_upcoming_focus_events() {
        let now = Utc.with_ymd_and_hms(2026, 3, 2, 8, 0, 0).unwrap();
        let source = InMemoryCalendar::new();
        source.add_calendar("me", Calendar::new("work", "Work"));
        for (i, day) in [2, 4].into_iter().enumerate() {
            let start = Utc.with_ymd_and_hms(2026, 3, day, 9, 0, 0).unwrap();
            source.add_event(
                "me",
                "work",
                Event::new(format!("f{i}"), "Focus Time", start, start + Duration::hours(2)),
            );
        }
        let standup = Utc.with_ymd_and_hms(2026, 3, 3, 9, 0, 0).unwrap();
        source.add_event(
            "me",
            "work",
            Event::new("s", "Standup", standup, standup + Duration::minutes(15)),
        );

        let optimizer = FocusOptimizer::new(&source);
        let hours = optimizer
            .current_protection(&CallContext::new(), "me", now)
            .unwrap();
        assert!((hours - 4.0).abs() < 1e-9);
    }

    #[test]
    fn current_protection_degrades_on_listing_failure() {
        let source = InMemoryCalendar::new();
        source.fail_calendar_listing();
        let optimizer = FocusOptimizer::new(&source);
        let hours = optimizer
            .current_protection(&CallContext::new(), "me", Utc::now())
            .unwrap();
        assert_eq!(hours, 0.0);
    }
}

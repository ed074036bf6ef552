//! Reduces an event history into a [`MeetingPattern`].

use std::collections::BTreeMap;

use chrono::{DateTime, Duration, Timelike, Utc};
use tracing::{debug, info};

use super::advice;
use super::stats::{DurationAccumulator, ParticipantAccumulator};
use super::{
    AcceptancePatterns, DateRange, DurationPatterns, MeetingAnalysis, MeetingPattern,
    ParticipantPattern, ProductivityPatterns, TimeBlock, TimezonePatterns,
};
use crate::calendar::{collect_events, CalendarDataSource, Event, EventQuery};
use crate::config::{AnalyticsConfig, HistoryConfig, WorkingHours};
use crate::context::CallContext;
use crate::error::Result;
use crate::time::{ClockTime, DayHour, DayOfWeek};

/// Length of every candidate focus block in hours.
const BLOCK_HOURS: u32 = 2;
/// Minimum score for a bucket to become a candidate block.
const MIN_BLOCK_SCORE: f64 = 50.0;
const CROSS_TZ_HOURS: [u32; 3] = [14, 15, 16];

/// Learns acceptance, duration, timezone, productivity and participant
/// patterns from calendar history.
#[derive(Debug, Clone, Default)]
pub struct PatternLearner {
    working_hours: WorkingHours,
    history: HistoryConfig,
}

impl PatternLearner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: &AnalyticsConfig) -> Self {
        Self {
            working_hours: config.working_hours.clone(),
            history: config.history.clone(),
        }
    }

    pub fn with_working_hours(mut self, working_hours: WorkingHours) -> Self {
        self.working_hours = working_hours;
        self
    }

    /// Analyze the last `days` days of history up to now.
    ///
    /// Fails only when the calendars of `identity` cannot be enumerated or
    /// the context is cancelled. An empty history is not an error.
    pub fn analyze_history(
        &self,
        ctx: &CallContext,
        source: &dyn CalendarDataSource,
        identity: &str,
        days: u32,
    ) -> Result<MeetingAnalysis> {
        self.analyze_history_at(ctx, source, identity, days, Utc::now())
    }

    /// Same as [`analyze_history`](Self::analyze_history) with an explicit
    /// window end.
    pub fn analyze_history_at(
        &self,
        ctx: &CallContext,
        source: &dyn CalendarDataSource,
        identity: &str,
        days: u32,
        end: DateTime<Utc>,
    ) -> Result<MeetingAnalysis> {
        let start = end - Duration::days(i64::from(days));
        let query = EventQuery::new(start, end, self.history.event_limit);
        let events = collect_events(ctx, source, identity, &query)?;
        info!(identity, days, events = events.len(), "analyzing meeting history");
        Ok(self.analyze_events(identity, events, DateRange { start, end }, days))
    }

    /// Pure analysis over already fetched events.
    pub fn analyze_events(
        &self,
        identity: &str,
        mut events: Vec<Event>,
        period: DateRange,
        days: u32,
    ) -> MeetingAnalysis {
        if events.is_empty() {
            return MeetingAnalysis {
                period,
                total_meetings: 0,
                patterns: None,
                recommendations: Vec::new(),
                insights: vec!["No meetings found in the analyzed period.".to_string()],
            };
        }

        events.sort_by(|a, b| a.start.cmp(&b.start).then_with(|| a.id.cmp(&b.id)));
        let pattern = self.learn_patterns(identity, &events, period, days);
        let recommendations = advice::recommendations(&pattern);
        let insights = advice::insights(&pattern, events.len(), days);

        MeetingAnalysis {
            period,
            total_meetings: events.len(),
            patterns: Some(pattern),
            recommendations,
            insights,
        }
    }

    /// Build a pattern snapshot. `events` should already be sorted by start.
    pub fn learn_patterns(
        &self,
        identity: &str,
        events: &[Event],
        period: DateRange,
        days: u32,
    ) -> MeetingPattern {
        let pattern = MeetingPattern {
            identity: identity.to_string(),
            analyzed_period: period,
            last_updated: Utc::now(),
            acceptance: learn_acceptance(events),
            duration: learn_durations(events),
            timezone: learn_timezones(events),
            productivity: self.learn_productivity(events, days),
            participants: learn_participants(events),
        };
        debug!(
            focus_blocks = pattern.productivity.focus_blocks.len(),
            participants = pattern.participants.len(),
            "learned meeting patterns"
        );
        pattern
    }

    fn learn_productivity(&self, events: &[Event], days: u32) -> ProductivityPatterns {
        let mut by_day_hour: BTreeMap<DayHour, usize> = BTreeMap::new();
        let mut by_day: BTreeMap<DayOfWeek, usize> = BTreeMap::new();
        for event in events {
            *by_day_hour.entry(DayHour::of(event.start)).or_default() += 1;
            *by_day.entry(DayOfWeek::of(event.start)).or_default() += 1;
        }

        // baseline over every observed bucket, not just working hours
        let avg_density = if by_day_hour.is_empty() {
            0.0
        } else {
            by_day_hour.values().sum::<usize>() as f64 / by_day_hour.len() as f64
        };

        let (start_hour, end_hour) = self.working_hours.hour_range();
        let mut peak_focus = Vec::new();
        for day in DayOfWeek::WORKDAYS {
            for hour in start_hour..end_hour {
                let density = by_day_hour.get(&DayHour::new(day, hour)).copied().unwrap_or(0);
                let score = bucket_score(density, avg_density);
                if score >= MIN_BLOCK_SCORE {
                    peak_focus.push(TimeBlock {
                        day_of_week: day,
                        start_time: ClockTime::from_hour(hour),
                        end_time: ClockTime::from_hour(hour + BLOCK_HOURS),
                        score,
                    });
                }
            }
        }

        let weeks = (days / 7).max(1) as f64;
        let meeting_density = by_day
            .into_iter()
            .map(|(day, count)| (day, count as f64 / weeks))
            .collect();

        let mut best_by_day: BTreeMap<DayOfWeek, &TimeBlock> = BTreeMap::new();
        for block in &peak_focus {
            match best_by_day.get(&block.day_of_week) {
                Some(existing) if block.score <= existing.score => {}
                _ => {
                    best_by_day.insert(block.day_of_week, block);
                }
            }
        }
        let focus_blocks = best_by_day.into_values().cloned().collect();

        ProductivityPatterns {
            peak_focus,
            meeting_density,
            focus_blocks,
        }
    }
}

/// `100 - (density / avg) * 50`, clamped. A history with no density
/// baseline scores every bucket 100.
fn bucket_score(density: usize, avg_density: f64) -> f64 {
    if avg_density <= 0.0 {
        return 100.0;
    }
    (100.0 - (density as f64 / avg_density) * 50.0).clamp(0.0, 100.0)
}

fn learn_acceptance(events: &[Event]) -> AcceptancePatterns {
    #[derive(Default, Clone, Copy)]
    struct Tally {
        accepted: usize,
        total: usize,
    }
    impl Tally {
        fn add(&mut self, accepted: bool) {
            self.total += 1;
            if accepted {
                self.accepted += 1;
            }
        }
        fn rate(&self) -> f64 {
            if self.total == 0 {
                0.0
            } else {
                self.accepted as f64 / self.total as f64
            }
        }
    }

    let mut by_day: BTreeMap<DayOfWeek, Tally> = BTreeMap::new();
    let mut by_hour: BTreeMap<u32, Tally> = BTreeMap::new();
    let mut by_day_hour: BTreeMap<DayHour, Tally> = BTreeMap::new();
    let mut overall = Tally::default();

    for event in events {
        let accepted = event.is_confirmed();
        overall.add(accepted);
        by_day.entry(DayOfWeek::of(event.start)).or_default().add(accepted);
        by_hour.entry(event.start.hour()).or_default().add(accepted);
        by_day_hour.entry(DayHour::of(event.start)).or_default().add(accepted);
    }

    AcceptancePatterns {
        by_day_of_week: by_day.into_iter().map(|(k, t)| (k, t.rate())).collect(),
        by_time_of_day: by_hour.into_iter().map(|(k, t)| (k, t.rate())).collect(),
        by_day_and_time: by_day_hour.into_iter().map(|(k, t)| (k, t.rate())).collect(),
        overall: overall.rate(),
    }
}

fn learn_durations(events: &[Event]) -> DurationPatterns {
    let mut overall = DurationAccumulator::default();
    let mut by_participant: BTreeMap<&str, DurationAccumulator> = BTreeMap::new();

    for event in events {
        let minutes = event.duration_minutes();
        // no attendance signal, actual is assumed to match scheduled
        overall.add(minutes, minutes);
        for participant in event.participants.iter().filter(|p| !p.email.is_empty()) {
            by_participant
                .entry(participant.email.as_str())
                .or_default()
                .add(minutes, minutes);
        }
    }

    DurationPatterns {
        by_participant: by_participant
            .into_iter()
            .map(|(email, acc)| (email.to_string(), acc.to_stats()))
            .collect(),
        overall: overall.to_stats(),
    }
}

fn learn_timezones(events: &[Event]) -> TimezonePatterns {
    let mut distribution: BTreeMap<String, usize> = BTreeMap::new();
    for event in events {
        *distribution.entry(event.timezone_or_utc().to_string()).or_default() += 1;
    }
    TimezonePatterns {
        distribution,
        cross_tz_times: CROSS_TZ_HOURS.into_iter().map(ClockTime::from_hour).collect(),
    }
}

fn learn_participants(events: &[Event]) -> BTreeMap<String, ParticipantPattern> {
    let mut participants: BTreeMap<&str, ParticipantAccumulator> = BTreeMap::new();
    for event in events {
        let day = DayOfWeek::of(event.start);
        let hour = event.start.hour();
        for participant in event.participants.iter().filter(|p| !p.email.is_empty()) {
            participants.entry(participant.email.as_str()).or_default().add(
                day,
                hour,
                event.duration_minutes(),
                event.is_confirmed(),
                event.timezone.as_deref(),
            );
        }
    }

    participants
        .into_iter()
        .map(|(email, acc)| (email.to_string(), acc.to_pattern(email)))
        .collect()
}

//! Learned meeting behavior.
//!
//! A [`MeetingPattern`] is a snapshot computed from one analysis window. It is
//! never persisted or mutated; every call to [`PatternLearner`] builds a fresh
//! one and callers pass it explicitly to the scorer, resolver and optimizer.

mod advice;
mod learner;
mod stats;

pub use learner::PatternLearner;
pub use stats::{sample_variance, DurationAccumulator};

use std::collections::BTreeMap;
use std::ops::RangeInclusive;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::time::{ClockTime, DayHour, DayOfWeek};

/// Closed-open instant range `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

/// Acceptance rates per bucket. Every rate is in `[0, 1]`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AcceptancePatterns {
    pub by_day_of_week: BTreeMap<DayOfWeek, f64>,
    /// Keyed by hour of day (0-23).
    pub by_time_of_day: BTreeMap<u32, f64>,
    pub by_day_and_time: BTreeMap<DayHour, f64>,
    pub overall: f64,
}

impl AcceptancePatterns {
    /// Weekday with the highest positive acceptance rate. Ties go to the
    /// earlier weekday.
    pub fn best_day(&self) -> Option<(DayOfWeek, f64)> {
        best_by_rate(self.by_day_of_week.iter().map(|(d, r)| (*d, *r)))
    }

    /// Hour within `hours` with the highest positive acceptance rate. Ties go
    /// to the earlier hour.
    pub fn best_hour_in(&self, hours: RangeInclusive<u32>) -> Option<(u32, f64)> {
        best_by_rate(self.by_time_of_day.range(hours).map(|(h, r)| (*h, *r)))
    }
}

/// Highest positive rate, first key wins ties. Expects keys in ascending order.
fn best_by_rate<K: Copy>(rates: impl Iterator<Item = (K, f64)>) -> Option<(K, f64)> {
    let mut best: Option<(K, f64)> = None;
    for (key, rate) in rates {
        if rate > best.map_or(0.0, |(_, r)| r) {
            best = Some((key, rate));
        }
    }
    best
}

/// Duration statistics in minutes.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DurationStats {
    pub average_scheduled: i64,
    pub average_actual: i64,
    /// Sample variance of scheduled durations.
    pub variance: f64,
    /// Fraction of meetings where actual exceeded scheduled.
    pub overrun_rate: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DurationPatterns {
    pub by_participant: BTreeMap<String, DurationStats>,
    pub overall: DurationStats,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TimezonePatterns {
    /// Timezone tag to number of meetings starting in it.
    pub distribution: BTreeMap<String, usize>,
    /// Hours that usually work across timezones.
    pub cross_tz_times: Vec<ClockTime>,
}

impl TimezonePatterns {
    /// Most common timezone. Ties go to the lexically smaller tag.
    pub fn most_common(&self) -> Option<(&str, usize)> {
        self.distribution
            .iter()
            .max_by(|a, b| a.1.cmp(b.1).then_with(|| b.0.cmp(a.0)))
            .map(|(tz, count)| (tz.as_str(), *count))
    }
}

/// A recurring weekly window with a 0-100 productivity score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeBlock {
    pub day_of_week: DayOfWeek,
    pub start_time: ClockTime,
    pub end_time: ClockTime,
    pub score: f64,
}

impl TimeBlock {
    pub fn duration_minutes(&self) -> i64 {
        self.start_time.minutes_until(self.end_time)
    }

    /// Whether `hour` on `day` falls in `[start, end)` of this block.
    pub fn contains_hour(&self, day: DayOfWeek, hour: u32) -> bool {
        day == self.day_of_week && hour >= self.start_time.hour() && hour < self.end_time.hour()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProductivityPatterns {
    /// Every candidate block, in scan order.
    pub peak_focus: Vec<TimeBlock>,
    /// Average meetings per day for each weekday.
    pub meeting_density: BTreeMap<DayOfWeek, f64>,
    /// Best block per weekday, Monday to Friday.
    pub focus_blocks: Vec<TimeBlock>,
}

impl ProductivityPatterns {
    /// Focus block starting at `hour` on `day`.
    pub fn focus_block_at(&self, day: DayOfWeek, hour: u32) -> Option<&TimeBlock> {
        self.focus_blocks
            .iter()
            .find(|b| b.day_of_week == day && b.start_time.hour() == hour)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParticipantPattern {
    pub email: String,
    pub meeting_count: usize,
    pub acceptance_rate: f64,
    /// Up to two most frequent weekdays.
    pub preferred_days: Vec<DayOfWeek>,
    /// Up to two most frequent start hours.
    pub preferred_times: Vec<u32>,
    pub average_duration: i64,
    /// Last timezone seen on one of this participant's meetings.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timezone: Option<String>,
}

/// Aggregate statistics for one identity over one window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MeetingPattern {
    pub identity: String,
    pub analyzed_period: DateRange,
    pub last_updated: DateTime<Utc>,
    pub acceptance: AcceptancePatterns,
    pub duration: DurationPatterns,
    pub timezone: TimezonePatterns,
    pub productivity: ProductivityPatterns,
    pub participants: BTreeMap<String, ParticipantPattern>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecommendationType {
    FocusTime,
    DeclinePattern,
    DurationAdjustment,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    High,
    Medium,
    Low,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recommendation {
    #[serde(rename = "type")]
    pub kind: RecommendationType,
    pub priority: Priority,
    pub title: String,
    pub description: String,
    /// 0-100
    pub confidence: f64,
    pub action: String,
    pub impact: String,
}

/// Result of [`PatternLearner::analyze_history`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MeetingAnalysis {
    pub period: DateRange,
    pub total_meetings: usize,
    /// `None` when the window held no events.
    pub patterns: Option<MeetingPattern>,
    pub recommendations: Vec<Recommendation>,
    pub insights: Vec<String>,
}

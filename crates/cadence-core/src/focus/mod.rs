//! Focus-time protection.
//!
//! [`FocusOptimizer`] turns learned productivity patterns into recommended
//! weekly focus blocks, writes them to the calendar as protected events and
//! proposes schedule changes when something puts focus time at risk. Nothing
//! proposed by the adaptive path is applied automatically.

mod adaptive;
mod blocks;
mod duration;
mod optimizer;

pub use adaptive::{EventClassifier, HeuristicClassifier};
pub use optimizer::FocusOptimizer;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::patterns::{DateRange, DurationStats, Priority, TimeBlock};
use crate::time::{ClockTime, DayOfWeek};

/// User preferences for focus-time protection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FocusTimeSettings {
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Create focus blocks without asking.
    #[serde(default = "default_true")]
    pub auto_block: bool,
    /// Decline meeting requests that land in a protected block.
    #[serde(default)]
    pub auto_decline: bool,
    #[serde(default = "default_true")]
    pub allow_urgent_override: bool,
    /// Overrides need manual approval.
    #[serde(default = "default_true")]
    pub require_approval: bool,
    #[serde(default = "default_target_hours")]
    pub target_hours_per_week: f64,
    /// Minutes. Shorter blocks are never recommended.
    #[serde(default = "default_min_block")]
    pub min_block_duration: i64,
    /// Minutes. Longer blocks are capped; 0 disables the cap.
    #[serde(default = "default_max_block")]
    pub max_block_duration: i64,
    /// Only these weekdays are protected. Empty means every day.
    #[serde(default)]
    pub protected_days: Vec<DayOfWeek>,
    /// Times of day never turned into focus blocks.
    #[serde(default)]
    pub excluded_time_ranges: Vec<TimeRange>,
    #[serde(default)]
    pub notifications: FocusNotificationPrefs,
}

/// Time-of-day window `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeRange {
    pub start: ClockTime,
    pub end: ClockTime,
}

impl TimeRange {
    pub fn new(start: ClockTime, end: ClockTime) -> Self {
        Self { start, end }
    }

    pub fn overlaps(&self, start: ClockTime, end: ClockTime) -> bool {
        start < self.end && self.start < end
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FocusNotificationPrefs {
    #[serde(default = "default_true")]
    pub notify_on_decline: bool,
    #[serde(default = "default_true")]
    pub notify_on_override: bool,
    #[serde(default = "default_true")]
    pub notify_on_adaptation: bool,
    #[serde(default = "default_true")]
    pub daily_summary: bool,
    #[serde(default = "default_true")]
    pub weekly_summary: bool,
}

fn default_true() -> bool {
    true
}
fn default_target_hours() -> f64 {
    14.0
}
fn default_min_block() -> i64 {
    60
}
fn default_max_block() -> i64 {
    240
}

impl Default for FocusTimeSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            auto_block: true,
            auto_decline: false,
            allow_urgent_override: true,
            require_approval: true,
            target_hours_per_week: default_target_hours(),
            min_block_duration: default_min_block(),
            max_block_duration: default_max_block(),
            protected_days: Vec::new(),
            excluded_time_ranges: Vec::new(),
            notifications: FocusNotificationPrefs::default(),
        }
    }
}

impl Default for FocusNotificationPrefs {
    fn default() -> Self {
        Self {
            notify_on_decline: true,
            notify_on_override: true,
            notify_on_adaptation: true,
            daily_summary: true,
            weekly_summary: true,
        }
    }
}

/// A recommended weekly focus block.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FocusTimeBlock {
    pub day_of_week: DayOfWeek,
    pub start_time: ClockTime,
    pub end_time: ClockTime,
    /// Minutes.
    pub duration: i64,
    pub score: f64,
    pub reason: String,
    /// Meetings that would conflict with the block.
    pub conflicts: usize,
}

/// How a protected block reacts to meeting requests.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FocusProtectionRule {
    pub auto_decline: bool,
    pub suggest_alternatives: bool,
    pub allow_critical_meeting: bool,
    pub require_approval: bool,
    pub decline_message: String,
    #[serde(default)]
    pub alternative_times: Vec<String>,
}

/// A focus block written to the calendar.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProtectedBlock {
    pub id: String,
    pub calendar_event_id: String,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    /// Minutes.
    pub duration: i64,
    pub is_recurring: bool,
    pub recurrence_pattern: String,
    pub priority: Priority,
    pub reason: String,
    pub allow_override: bool,
    pub override_approved: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub override_reason: Option<String>,
    pub protection_rules: FocusProtectionRule,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FocusTimeAnalysis {
    pub identity: String,
    pub analyzed_period: DateRange,
    pub generated_at: DateTime<Utc>,
    /// Top blocks by score, at most three.
    pub peak_productivity: Vec<TimeBlock>,
    pub deep_work_sessions: DurationStats,
    /// Weekday with the fewest meetings.
    pub most_productive_day: Option<DayOfWeek>,
    /// Weekday with the most meetings.
    pub least_productive_day: Option<DayOfWeek>,
    pub recommended_blocks: Vec<FocusTimeBlock>,
    /// Hours per week already protected.
    pub current_protection: f64,
    pub target_protection: f64,
    pub insights: Vec<String>,
    /// 0-100
    pub confidence: f64,
}

/// What prompted an adaptive schedule change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdaptiveTrigger {
    DeadlineChange,
    MeetingOverload,
    PriorityShift,
    FocusTimeAtRisk,
    ConflictDetected,
    PatternDetected,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdaptiveChangeType {
    IncreaseFocusTime,
    RescheduleMeeting,
    ShortenMeeting,
    DeclineMeeting,
    MoveMeetingLater,
    ProtectBlock,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModificationAction {
    Reschedule,
    Shorten,
    Decline,
    Protect,
}

/// One proposed edit to the schedule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduleModification {
    /// None for modifications not tied to an existing event.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub event_id: Option<String>,
    pub action: ModificationAction,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub old_start_time: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub new_start_time: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub old_duration: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub new_duration: Option<i64>,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdaptiveImpact {
    /// Hours.
    pub focus_time_gained: f64,
    pub meetings_rescheduled: usize,
    pub meetings_declined: usize,
    /// Minutes.
    pub duration_saved: i64,
    pub conflicts_resolved: usize,
    pub participants_affected: usize,
    pub predicted_benefit: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub risks: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ApprovalStatus {
    Pending,
    Approved,
    Denied,
    Expired,
}

/// A proposal produced by [`FocusOptimizer::adapt_schedule`]. Always starts
/// pending approval.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdaptiveScheduleChange {
    pub id: String,
    pub timestamp: DateTime<Utc>,
    pub trigger: AdaptiveTrigger,
    pub change_type: AdaptiveChangeType,
    pub affected_events: Vec<String>,
    pub changes: Vec<ScheduleModification>,
    pub reason: String,
    pub impact: AdaptiveImpact,
    pub user_approval: ApprovalStatus,
    pub auto_applied: bool,
    pub confidence: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DurationOptimization {
    pub event_id: String,
    /// Minutes.
    pub current_duration: i64,
    pub recommended_duration: i64,
    pub historical_data: DurationStats,
    pub time_savings: i64,
    pub confidence: f64,
    pub reason: String,
    pub recommendation: String,
}

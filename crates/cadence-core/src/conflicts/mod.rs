//! Scheduling conflict detection and rescheduling.
//!
//! Hard conflicts are overlaps that make attending both events impossible.
//! Soft conflicts are concerns that do not block scheduling: missing buffer
//! time, interrupted focus blocks, an overloaded day.

mod detect;
mod resolver;

pub use detect::{detect_hard_conflicts, detect_soft_conflicts, intervals_overlap};
pub use resolver::ConflictResolver;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::calendar::Event;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConflictType {
    /// Overlapping times.
    Hard,
    /// No or too little buffer before or after another meeting.
    SoftBackToBack,
    /// Starts inside a learned focus block.
    SoftFocusTime,
    /// The day already holds too many meetings.
    SoftOverload,
}

impl ConflictType {
    pub fn is_hard(&self) -> bool {
        matches!(self, ConflictType::Hard)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConflictSeverity {
    Critical,
    High,
    Medium,
    Low,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Conflict {
    pub id: String,
    #[serde(rename = "type")]
    pub conflict_type: ConflictType,
    pub severity: ConflictSeverity,
    pub proposed_event: Event,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conflicting_event: Option<Event>,
    pub description: String,
    pub impact: String,
    pub suggestion: String,
    pub can_auto_resolve: bool,
}

/// Candidate time for a meeting that could not be kept as proposed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RescheduleOption {
    pub proposed_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    /// 0-100
    pub score: u32,
    pub confidence: f64,
    pub pros: Vec<String>,
    pub cons: Vec<String>,
    /// Soft conflicts remaining at this slot. Never contains a hard conflict.
    pub conflicts: Vec<Conflict>,
    /// Share of participants available at this slot.
    pub participant_match: f64,
    pub insight: String,
}

/// Result of [`ConflictResolver::detect_conflicts`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConflictAnalysis {
    pub proposed_event: Event,
    pub hard_conflicts: Vec<Conflict>,
    pub soft_conflicts: Vec<Conflict>,
    pub total_conflicts: usize,
    /// True iff `hard_conflicts` is empty.
    pub can_proceed: bool,
    pub recommendations: Vec<String>,
    /// Ranked by score, best first.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub alternative_times: Vec<RescheduleOption>,
    pub recommendation: String,
}

impl ConflictAnalysis {
    pub fn best_alternative(&self) -> Option<&RescheduleOption> {
        self.alternative_times.first()
    }
}

//! Pure conflict rules over a proposed event and its neighbors.

use chrono::{DateTime, Duration, Timelike, Utc};

use super::{Conflict, ConflictSeverity, ConflictType};
use crate::calendar::Event;
use crate::config::ConflictConfig;
use crate::patterns::MeetingPattern;
use crate::time::DayOfWeek;

/// Half-open interval overlap. Symmetric in its two intervals.
pub fn intervals_overlap(
    a_start: DateTime<Utc>,
    a_end: DateTime<Utc>,
    b_start: DateTime<Utc>,
    b_end: DateTime<Utc>,
) -> bool {
    a_start < b_end && a_end > b_start
}

/// Existing events that can conflict with `proposed`: not cancelled and not
/// the proposed event itself.
fn neighbors<'a>(proposed: &'a Event, existing: &'a [Event]) -> impl Iterator<Item = &'a Event> {
    existing
        .iter()
        .filter(move |e| !e.is_cancelled() && e.id != proposed.id)
}

pub fn detect_hard_conflicts(proposed: &Event, existing: &[Event]) -> Vec<Conflict> {
    neighbors(proposed, existing)
        .filter(|e| intervals_overlap(proposed.start, proposed.end, e.start, e.end))
        .map(|event| {
            let severity = if event.is_confirmed() {
                ConflictSeverity::Critical
            } else {
                ConflictSeverity::High
            };
            Conflict {
                id: format!("hard_{}", event.id),
                conflict_type: ConflictType::Hard,
                severity,
                proposed_event: proposed.clone(),
                conflicting_event: Some(event.clone()),
                description: format!("Overlaps with '{}'", event.title),
                impact: "Cannot attend both meetings simultaneously".into(),
                suggestion: "Reschedule one of the meetings".into(),
                can_auto_resolve: false,
            }
        })
        .collect()
}

/// Back-to-back, near-miss, focus-block and overload conflicts, in that
/// order.
pub fn detect_soft_conflicts(
    proposed: &Event,
    existing: &[Event],
    patterns: Option<&MeetingPattern>,
    rules: &ConflictConfig,
) -> Vec<Conflict> {
    let mut conflicts = Vec::new();
    let near_miss = Duration::minutes(rules.near_miss_minutes);

    for event in neighbors(proposed, existing) {
        if event.end == proposed.start || proposed.end == event.start {
            conflicts.push(Conflict {
                id: format!("soft_b2b_{}", event.id),
                conflict_type: ConflictType::SoftBackToBack,
                severity: ConflictSeverity::Medium,
                proposed_event: proposed.clone(),
                conflicting_event: Some(event.clone()),
                description: format!("Back-to-back with '{}'", event.title),
                impact: "No buffer time for breaks or overruns".into(),
                suggestion: format!(
                    "Add {}-minute buffer between meetings",
                    rules.near_miss_minutes
                ),
                can_auto_resolve: true,
            });
        }

        let gap = event.start - proposed.end;
        if gap > Duration::zero() && gap < near_miss {
            conflicts.push(Conflict {
                id: format!("soft_close_{}", event.id),
                conflict_type: ConflictType::SoftBackToBack,
                severity: ConflictSeverity::Low,
                proposed_event: proposed.clone(),
                conflicting_event: Some(event.clone()),
                description: format!(
                    "Only {} min gap before '{}'",
                    gap.num_minutes(),
                    event.title
                ),
                impact: "Minimal buffer time".into(),
                suggestion: "Consider adding more buffer time".into(),
                can_auto_resolve: true,
            });
        }
    }

    if let Some(patterns) = patterns {
        let day = DayOfWeek::of(proposed.start);
        let hour = proposed.start.hour();
        for block in &patterns.productivity.focus_blocks {
            if !block.contains_hour(day, hour) {
                continue;
            }
            conflicts.push(Conflict {
                id: format!("soft_focus_{}_{}", block.day_of_week, block.start_time),
                conflict_type: ConflictType::SoftFocusTime,
                severity: ConflictSeverity::High,
                proposed_event: proposed.clone(),
                conflicting_event: None,
                description: format!(
                    "Interrupts focus time ({} {}-{})",
                    block.day_of_week, block.start_time, block.end_time
                ),
                impact: "Reduces productivity during peak focus hours".into(),
                suggestion: "Schedule outside of focus time blocks".into(),
                can_auto_resolve: true,
            });
        }
    }

    let on_day = meetings_on_day(proposed, existing);
    if on_day >= rules.overload_threshold {
        conflicts.push(Conflict {
            id: format!("soft_overload_{}", proposed.start.format("%Y-%m-%d")),
            conflict_type: ConflictType::SoftOverload,
            severity: ConflictSeverity::Medium,
            proposed_event: proposed.clone(),
            conflicting_event: None,
            description: format!("Already have {on_day} meetings this day"),
            impact: "Meeting fatigue and reduced productivity".into(),
            suggestion: "Consider spreading meetings across more days".into(),
            can_auto_resolve: true,
        });
    }

    conflicts
}

/// Existing events starting on the calendar day of the proposed start.
fn meetings_on_day(proposed: &Event, existing: &[Event]) -> usize {
    let day = proposed.start.date_naive();
    neighbors(proposed, existing)
        .filter(|e| e.start.date_naive() == day)
        .count()
}

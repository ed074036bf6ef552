//! Reactive schedule adaptation.

use std::collections::BTreeSet;

use chrono::{DateTime, Duration, Utc};
use tracing::info;
use uuid::Uuid;

use super::optimizer::FocusOptimizer;
use super::{
    AdaptiveChangeType, AdaptiveImpact, AdaptiveScheduleChange, AdaptiveTrigger, ApprovalStatus,
    ModificationAction, ScheduleModification,
};
use crate::calendar::{collect_events, Event, EventQuery};
use crate::context::CallContext;
use crate::error::Result;

/// Placeholder gain reported for every proposal until real block placement
/// feeds back into the impact.
const FOCUS_HOURS_GAINED: f64 = 2.0;

/// Decides which upcoming events an adaptive change may touch.
pub trait EventClassifier: Send + Sync {
    /// Low-priority meetings are moved first when the calendar is overloaded.
    fn is_low_priority(&self, event: &Event) -> bool;

    fn conflicts_with_focus_time(&self, event: &Event) -> bool;

    fn can_reschedule(&self, event: &Event) -> bool;
}

/// Participant-count and read-only heuristics.
///
/// Meetings with two or fewer participants count as low priority, focus
/// conflicts are never reported and anything writable can be moved.
#[derive(Debug, Clone, Copy, Default)]
pub struct HeuristicClassifier;

impl EventClassifier for HeuristicClassifier {
    fn is_low_priority(&self, event: &Event) -> bool {
        event.participants.len() <= 2
    }

    fn conflicts_with_focus_time(&self, _event: &Event) -> bool {
        false
    }

    fn can_reschedule(&self, event: &Event) -> bool {
        !event.read_only
    }
}

impl FocusOptimizer<'_> {
    /// Propose schedule changes for `trigger` over the upcoming horizon.
    ///
    /// The returned change is pending approval; nothing is written to the
    /// calendar.
    pub fn adapt_schedule(
        &self,
        ctx: &CallContext,
        identity: &str,
        trigger: AdaptiveTrigger,
    ) -> Result<AdaptiveScheduleChange> {
        self.adapt_schedule_at(ctx, identity, trigger, Utc::now())
    }

    pub fn adapt_schedule_at(
        &self,
        ctx: &CallContext,
        identity: &str,
        trigger: AdaptiveTrigger,
        now: DateTime<Utc>,
    ) -> Result<AdaptiveScheduleChange> {
        let horizon = Duration::days(self.config.adapt_horizon_days);
        let query = EventQuery::new(now, now + horizon, self.event_limit);
        let events = collect_events(ctx, self.source, identity, &query)?;

        let changes = self.required_changes(&events, trigger);
        let impact = adaptive_impact(&changes, &events);
        let change = AdaptiveScheduleChange {
            id: format!("adapt_{}", Uuid::new_v4()),
            timestamp: now,
            trigger,
            change_type: change_type(&changes),
            affected_events: changes.iter().filter_map(|m| m.event_id.clone()).collect(),
            reason: adaptive_reason(trigger, &impact),
            confidence: adaptive_confidence(&changes),
            changes,
            impact,
            user_approval: ApprovalStatus::Pending,
            auto_applied: false,
        };
        info!(
            identity,
            ?trigger,
            modifications = change.changes.len(),
            "proposed adaptive schedule change"
        );
        Ok(change)
    }

    fn required_changes(
        &self,
        events: &[Event],
        trigger: AdaptiveTrigger,
    ) -> Vec<ScheduleModification> {
        let reschedule = |event: &Event, description: &str| ScheduleModification {
            event_id: Some(event.id.clone()),
            action: ModificationAction::Reschedule,
            old_start_time: Some(event.start),
            new_start_time: None,
            old_duration: Some(event.duration_minutes()),
            new_duration: None,
            description: description.to_string(),
        };

        match trigger {
            AdaptiveTrigger::MeetingOverload => events
                .iter()
                .filter(|e| !e.is_cancelled() && self.classifier.is_low_priority(e))
                .map(|e| reschedule(e, "Move low-priority meeting to reduce meeting overload"))
                .collect(),
            AdaptiveTrigger::FocusTimeAtRisk => events
                .iter()
                .filter(|e| {
                    !e.is_cancelled()
                        && self.classifier.conflicts_with_focus_time(e)
                        && self.classifier.can_reschedule(e)
                })
                .map(|e| reschedule(e, "Move meeting to protect focus time"))
                .collect(),
            AdaptiveTrigger::DeadlineChange => vec![ScheduleModification {
                event_id: None,
                action: ModificationAction::Protect,
                old_start_time: None,
                new_start_time: None,
                old_duration: None,
                new_duration: None,
                description: "Add additional focus blocks due to deadline pressure".to_string(),
            }],
            AdaptiveTrigger::PriorityShift
            | AdaptiveTrigger::ConflictDetected
            | AdaptiveTrigger::PatternDetected => Vec::new(),
        }
    }
}

/// Most frequent event action; reschedule, then shorten, then decline on
/// ties. Protect-only or empty proposals protect a block.
fn change_type(changes: &[ScheduleModification]) -> AdaptiveChangeType {
    let count = |action: ModificationAction| changes.iter().filter(|m| m.action == action).count();
    let ranked = [
        (count(ModificationAction::Reschedule), AdaptiveChangeType::RescheduleMeeting),
        (count(ModificationAction::Shorten), AdaptiveChangeType::ShortenMeeting),
        (count(ModificationAction::Decline), AdaptiveChangeType::DeclineMeeting),
    ];
    let mut best: Option<(usize, AdaptiveChangeType)> = None;
    for (n, kind) in ranked {
        if n > 0 && best.map_or(true, |(top, _)| n > top) {
            best = Some((n, kind));
        }
    }
    best.map_or(AdaptiveChangeType::ProtectBlock, |(_, kind)| kind)
}

fn adaptive_impact(changes: &[ScheduleModification], events: &[Event]) -> AdaptiveImpact {
    let mut impact = AdaptiveImpact {
        focus_time_gained: FOCUS_HOURS_GAINED,
        meetings_rescheduled: 0,
        meetings_declined: 0,
        duration_saved: 0,
        conflicts_resolved: 0,
        participants_affected: 0,
        predicted_benefit: "Improved focus time availability".to_string(),
        risks: Vec::new(),
    };

    for change in changes {
        match change.action {
            ModificationAction::Reschedule => impact.meetings_rescheduled += 1,
            ModificationAction::Decline => impact.meetings_declined += 1,
            ModificationAction::Shorten => {
                if let (Some(old), Some(new)) = (change.old_duration, change.new_duration) {
                    impact.duration_saved += old - new;
                }
            }
            ModificationAction::Protect => {}
        }
    }

    let affected: BTreeSet<&str> = changes.iter().filter_map(|m| m.event_id.as_deref()).collect();
    let participants: BTreeSet<&str> = events
        .iter()
        .filter(|e| affected.contains(e.id.as_str()))
        .flat_map(|e| e.participants.iter().map(|p| p.email.as_str()))
        .collect();
    impact.participants_affected = participants.len();
    impact
}

fn adaptive_reason(trigger: AdaptiveTrigger, impact: &AdaptiveImpact) -> String {
    match trigger {
        AdaptiveTrigger::MeetingOverload => format!(
            "Meeting load increased: reducing by rescheduling {} meetings",
            impact.meetings_rescheduled
        ),
        AdaptiveTrigger::FocusTimeAtRisk => format!(
            "Focus time at risk: protecting {:.1} additional hours",
            impact.focus_time_gained
        ),
        AdaptiveTrigger::DeadlineChange => {
            "Urgent deadline detected: increasing focus time priority".to_string()
        }
        _ => "Schedule optimization recommended".to_string(),
    }
}

fn adaptive_confidence(changes: &[ScheduleModification]) -> f64 {
    if changes.is_empty() {
        return 50.0;
    }
    (60.0 + 3.0 * changes.len().min(10) as f64).clamp(0.0, 95.0)
}

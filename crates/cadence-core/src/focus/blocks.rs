//! Writing recommended focus blocks to the calendar.

use chrono::{DateTime, Duration, Utc};
use tracing::{info, warn};
use uuid::Uuid;

use super::optimizer::FocusOptimizer;
use super::{FocusProtectionRule, FocusTimeBlock, FocusTimeSettings, ProtectedBlock};
use crate::calendar::{primary_calendar, NewEvent};
use crate::context::CallContext;
use crate::error::{CoreError, Result};
use crate::patterns::Priority;
use crate::time::next_occurrence;

const WEEKLY_RRULE: &str = "RRULE:FREQ=WEEKLY";
const DECLINE_MESSAGE: &str =
    "This time is blocked for focus work. Alternative times are available.";

impl FocusOptimizer<'_> {
    /// Create one weekly recurring calendar event per block in the primary
    /// calendar of `identity`.
    ///
    /// Events are created one at a time and never rolled back. If creation
    /// fails part-way, the error lists the event ids that already exist.
    pub fn create_protected_blocks(
        &self,
        ctx: &CallContext,
        identity: &str,
        blocks: &[FocusTimeBlock],
        settings: &FocusTimeSettings,
    ) -> Result<Vec<ProtectedBlock>> {
        self.create_protected_blocks_at(ctx, identity, blocks, settings, Utc::now())
    }

    pub fn create_protected_blocks_at(
        &self,
        ctx: &CallContext,
        identity: &str,
        blocks: &[FocusTimeBlock],
        settings: &FocusTimeSettings,
        now: DateTime<Utc>,
    ) -> Result<Vec<ProtectedBlock>> {
        let calendar = primary_calendar(ctx, self.source, identity)?;
        let mut created: Vec<ProtectedBlock> = Vec::with_capacity(blocks.len());

        for (index, block) in blocks.iter().enumerate() {
            if let Err(err) = ctx.check() {
                warn!(identity, created = created.len(), "focus block creation interrupted");
                return Err(err);
            }

            let start = next_occurrence(now, block.day_of_week, block.start_time);
            let end = start + Duration::minutes(block.duration);
            let description = if block.reason.is_empty() {
                self.config.block_description.clone()
            } else {
                block.reason.clone()
            };
            let request = NewEvent {
                title: self.config.block_title.clone(),
                description,
                start,
                end,
                busy: true,
                recurrence: vec![WEEKLY_RRULE.to_string()],
            };

            let event = self
                .source
                .create_event(identity, &calendar.id, &request)
                .map_err(|source| CoreError::ProtectedBlockCreation {
                    index,
                    total: blocks.len(),
                    created_event_ids: created
                        .iter()
                        .map(|b| b.calendar_event_id.clone())
                        .collect(),
                    source,
                })?;

            created.push(ProtectedBlock {
                id: format!("focus_{}", Uuid::new_v4()),
                calendar_event_id: event.id,
                start_time: start,
                end_time: end,
                duration: block.duration,
                is_recurring: true,
                recurrence_pattern: "weekly".to_string(),
                priority: Priority::High,
                reason: block.reason.clone(),
                allow_override: settings.allow_urgent_override,
                override_approved: false,
                override_reason: None,
                protection_rules: FocusProtectionRule {
                    auto_decline: settings.auto_decline,
                    suggest_alternatives: true,
                    allow_critical_meeting: settings.allow_urgent_override,
                    require_approval: settings.require_approval,
                    decline_message: DECLINE_MESSAGE.to_string(),
                    alternative_times: Vec::new(),
                },
                created_at: now,
                updated_at: now,
            });
        }

        info!(
            identity,
            calendar = %calendar.id,
            created = created.len(),
            "created protected focus blocks"
        );
        Ok(created)
    }
}

//! Conflict analysis against live calendar data and alternative ranking.

use chrono::{DateTime, Duration, NaiveTime, Utc};
use tracing::{debug, info};

use super::detect::{detect_hard_conflicts, detect_soft_conflicts};
use super::{Conflict, ConflictAnalysis, ConflictType, RescheduleOption};
use crate::calendar::{collect_events, CalendarDataSource, Event, EventQuery};
use crate::config::{AnalyticsConfig, ConflictConfig};
use crate::context::CallContext;
use crate::error::Result;
use crate::patterns::MeetingPattern;
use crate::scoring::MeetingScorer;
use crate::time::{next_weekday_at, DayOfWeek};

/// Score given to a candidate when no pattern is available.
const FLAT_CANDIDATE_SCORE: i64 = 70;
const SOFT_CONFLICT_PENALTY: i64 = 10;
/// More soft conflicts than this trigger the alternative search.
const SOFT_CONFLICT_GATE: usize = 2;
const LATER_SAME_DAY_HOURS: i64 = 4;
const DEFAULT_BEST_HOUR: u32 = 14;
const HIGH_ACCEPTANCE: f64 = 0.8;

/// Detects conflicts for a proposed event and suggests better slots.
pub struct ConflictResolver<'a> {
    source: &'a dyn CalendarDataSource,
    rules: ConflictConfig,
    event_limit: usize,
}

impl<'a> ConflictResolver<'a> {
    pub fn new(source: &'a dyn CalendarDataSource) -> Self {
        Self::with_config(source, &AnalyticsConfig::default())
    }

    pub fn with_config(source: &'a dyn CalendarDataSource, config: &AnalyticsConfig) -> Self {
        Self {
            source,
            rules: config.conflicts.clone(),
            event_limit: config.history.event_limit,
        }
    }

    /// Analyze `proposed` against the events of `identity` around it.
    ///
    /// Fails only when calendars cannot be enumerated or the context is
    /// cancelled. Calendars whose events cannot be read count as empty.
    pub fn detect_conflicts(
        &self,
        ctx: &CallContext,
        identity: &str,
        proposed: &Event,
        patterns: Option<&MeetingPattern>,
    ) -> Result<ConflictAnalysis> {
        let query = self.search_window(proposed, patterns);
        let existing = collect_events(ctx, self.source, identity, &query)?;
        let analysis = self.analyze(proposed, &existing, patterns);
        info!(
            identity,
            event = %proposed.id,
            hard = analysis.hard_conflicts.len(),
            soft = analysis.soft_conflicts.len(),
            alternatives = analysis.alternative_times.len(),
            "conflict analysis complete"
        );
        Ok(analysis)
    }

    /// Fetch window: the padded proposed interval, widened to cover the
    /// whole proposed day, the day after, and the padded best pattern slot.
    fn search_window(&self, proposed: &Event, patterns: Option<&MeetingPattern>) -> EventQuery {
        let padding = Duration::minutes(self.rules.search_padding_minutes);
        let day_start = proposed.start.date_naive().and_time(NaiveTime::MIN).and_utc();
        let start = (proposed.start - padding).min(day_start);
        let mut end = (proposed.end + padding).max(day_start + Duration::days(2));
        if let Some(best) = patterns.and_then(|p| best_time_from_patterns(proposed.start, p)) {
            end = end.max(best + (proposed.end - proposed.start) + padding);
        }
        EventQuery::new(start, end, self.event_limit)
    }

    /// Pure analysis over already fetched events.
    pub fn analyze(
        &self,
        proposed: &Event,
        existing: &[Event],
        patterns: Option<&MeetingPattern>,
    ) -> ConflictAnalysis {
        let hard = detect_hard_conflicts(proposed, existing);
        let soft = detect_soft_conflicts(proposed, existing, patterns, &self.rules);

        let alternatives = if !hard.is_empty() || soft.len() > SOFT_CONFLICT_GATE {
            self.suggest_alternatives(proposed, existing, patterns)
        } else {
            Vec::new()
        };

        ConflictAnalysis {
            proposed_event: proposed.clone(),
            total_conflicts: hard.len() + soft.len(),
            can_proceed: hard.is_empty(),
            recommendations: conflict_recommendations(&hard, &soft),
            recommendation: summary_recommendation(&hard, &soft, &alternatives),
            hard_conflicts: hard,
            soft_conflicts: soft,
            alternative_times: alternatives,
        }
    }

    /// Candidates in generation order: +1h..+4h, next day, then the best
    /// slot from patterns. Ranked by score with ties kept in that order.
    fn suggest_alternatives(
        &self,
        proposed: &Event,
        existing: &[Event],
        patterns: Option<&MeetingPattern>,
    ) -> Vec<RescheduleOption> {
        let mut candidates: Vec<DateTime<Utc>> = (1..=LATER_SAME_DAY_HOURS)
            .map(|h| proposed.start + Duration::hours(h))
            .collect();
        candidates.push(proposed.start + Duration::days(1));
        if let Some(best) = patterns.and_then(|p| best_time_from_patterns(proposed.start, p)) {
            candidates.push(best);
        }

        let min_score = self.rules.min_alternative_score;
        let mut options: Vec<RescheduleOption> = candidates
            .into_iter()
            .filter_map(|start| self.evaluate_alternative(start, proposed, existing, patterns))
            .filter(|option| option.score > min_score)
            .collect();

        options.sort_by(|a, b| b.score.cmp(&a.score));
        options.truncate(self.rules.max_alternatives);
        debug!(kept = options.len(), "ranked reschedule options");
        options
    }

    /// Re-run the rules as if `proposed` started at `start`. Slots with a
    /// hard conflict are discarded.
    fn evaluate_alternative(
        &self,
        start: DateTime<Utc>,
        proposed: &Event,
        existing: &[Event],
        patterns: Option<&MeetingPattern>,
    ) -> Option<RescheduleOption> {
        let duration = proposed.end - proposed.start;
        let mut candidate = proposed.clone();
        candidate.start = start;
        candidate.end = start + duration;

        if !detect_hard_conflicts(&candidate, existing).is_empty() {
            return None;
        }
        let soft = detect_soft_conflicts(&candidate, existing, patterns, &self.rules);

        let base = match patterns {
            Some(_) => {
                let emails: Vec<String> = proposed
                    .participants
                    .iter()
                    .map(|p| p.email.clone())
                    .collect();
                i64::from(
                    MeetingScorer::new(patterns)
                        .score_meeting_time(start, &emails, duration.num_minutes())
                        .score,
                )
            }
            None => FLAT_CANDIDATE_SCORE,
        };
        let score = (base - SOFT_CONFLICT_PENALTY * soft.len() as i64).max(0) as u32;

        let mut pros = Vec::new();
        let mut cons = Vec::new();
        if soft.is_empty() {
            pros.push("No conflicts detected".to_string());
        }
        let day = DayOfWeek::of(start);
        if let Some(rate) = patterns.and_then(|p| p.acceptance.by_day_of_week.get(&day)) {
            if *rate > HIGH_ACCEPTANCE {
                pros.push(format!(
                    "High acceptance rate on {day}s ({:.0}%)",
                    rate * 100.0
                ));
            }
        }
        if !soft.is_empty() {
            cons.push(format!("{} soft conflict(s)", soft.len()));
        }
        let days_diff = (start - proposed.start).num_hours() / 24;
        if days_diff > 0 {
            cons.push(format!("{days_diff} day delay"));
        }

        Some(RescheduleOption {
            proposed_time: candidate.start,
            end_time: candidate.end,
            score,
            confidence: f64::from(score),
            pros,
            cons,
            conflicts: soft,
            participant_match: 1.0,
            insight: option_insight(score, days_diff).to_string(),
        })
    }
}

/// Most accepted weekday at the most accepted working hour (14:00 when no
/// hour qualifies), strictly after the date of `around`.
fn best_time_from_patterns(
    around: DateTime<Utc>,
    patterns: &MeetingPattern,
) -> Option<DateTime<Utc>> {
    let (day, _) = patterns.acceptance.best_day()?;
    let hour = patterns
        .acceptance
        .best_hour_in(9..=17)
        .map_or(DEFAULT_BEST_HOUR, |(hour, _)| hour);
    Some(next_weekday_at(around, day, hour))
}

fn conflict_recommendations(hard: &[Conflict], soft: &[Conflict]) -> Vec<String> {
    let mut out = Vec::new();

    if !hard.is_empty() {
        out.push("⚠️ Hard conflicts detected - must reschedule".to_string());
        out.extend(hard.iter().map(|c| format!("  • {}", c.suggestion)));
    }

    if soft.len() > SOFT_CONFLICT_GATE {
        out.push("⚠️ Multiple soft conflicts detected:".to_string());
        let count = |t: ConflictType| soft.iter().filter(|c| c.conflict_type == t).count();
        if count(ConflictType::SoftFocusTime) > 0 {
            out.push("  • Consider protecting your focus time".to_string());
        }
        if count(ConflictType::SoftBackToBack) > 1 {
            out.push("  • Add buffer time between meetings".to_string());
        }
    }

    if hard.is_empty() && soft.is_empty() {
        out.push("✓ No conflicts detected - good time for this meeting".to_string());
    }
    out
}

fn summary_recommendation(
    hard: &[Conflict],
    soft: &[Conflict],
    alternatives: &[RescheduleOption],
) -> String {
    let best = alternatives.first();
    if !hard.is_empty() {
        return match best {
            Some(option) => format!(
                "❌ Cannot proceed due to {} hard conflict(s). Recommend rescheduling to alternative time slot (Score: {}/100)",
                hard.len(),
                option.score
            ),
            None => format!(
                "❌ Cannot proceed due to {} hard conflict(s). Manual rescheduling required",
                hard.len()
            ),
        };
    }

    if soft.len() > SOFT_CONFLICT_GATE {
        return match best {
            Some(option) => format!(
                "⚠️ Proceeding not recommended due to {} soft conflicts. Consider alternative time (Score: {}/100)",
                soft.len(),
                option.score
            ),
            None => format!(
                "⚠️ Proceeding possible but not ideal ({} soft conflicts)",
                soft.len()
            ),
        };
    }

    if !soft.is_empty() {
        return format!("✓ Can proceed with {} minor soft conflict(s)", soft.len());
    }
    "✓ Excellent time - no conflicts detected".to_string()
}

fn option_insight(score: u32, days_diff: i64) -> &'static str {
    if score >= 90 {
        "Excellent alternative with minimal disruption"
    } else if score >= 75 {
        if days_diff == 0 {
            "Same day alternative - minimal delay"
        } else {
            "Good alternative with acceptable trade-offs"
        }
    } else if score >= 60 {
        "Acceptable but consider other options"
    } else {
        "Suboptimal - many conflicts remain"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calendar::{Calendar, EventStatus, InMemoryCalendar};
    use crate::conflicts::intervals_overlap;
    use crate::error::CoreError;
    use chrono::TimeZone;

    // 2026-03-04 is a Wednesday
    fn at(d: u32, h: u32, m: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, d, h, m, 0).unwrap()
    }

    fn event(id: &str, start: DateTime<Utc>, end: DateTime<Utc>) -> Event {
        Event::new(id, id, start, end)
    }

    fn source_with(events: Vec<Event>) -> InMemoryCalendar {
        let source = InMemoryCalendar::new();
        source.add_calendar("me", Calendar::new("work", "Work"));
        for e in events {
            source.add_event("me", "work", e);
        }
        source
    }

    #[test]
    fn overlap_blocks_and_offers_ranked_alternatives() {
        let source = source_with(vec![event("standup", at(4, 10, 15), at(4, 11, 15))]);
        let resolver = ConflictResolver::new(&source);
        let proposed = event("new", at(4, 10, 0), at(4, 11, 0));

        let analysis = resolver
            .detect_conflicts(&CallContext::new(), "me", &proposed, None)
            .unwrap();
        assert_eq!(analysis.hard_conflicts.len(), 1);
        assert!(!analysis.can_proceed);
        assert_eq!(analysis.recommendations[0], "⚠️ Hard conflicts detected - must reschedule");
        assert_eq!(analysis.recommendations[1], "  • Reschedule one of the meetings");

        // +1h still overlaps, +2h..+4h and next day are clear at the flat score
        let starts: Vec<_> = analysis.alternative_times.iter().map(|o| o.proposed_time).collect();
        assert_eq!(starts, vec![at(4, 12, 0), at(4, 13, 0), at(4, 14, 0)]);
        let best = &analysis.alternative_times[0];
        assert_eq!(best.score, 70);
        assert_eq!(best.pros, vec!["No conflicts detected"]);
        assert_eq!(best.insight, "Acceptable but consider other options");
        assert_eq!(
            analysis.recommendation,
            "❌ Cannot proceed due to 1 hard conflict(s). Recommend rescheduling to alternative time slot (Score: 70/100)"
        );
    }

    #[test]
    fn penalized_candidates_rank_below_clear_ones() {
        let existing = vec![
            event("a", at(4, 10, 30), at(4, 11, 30)),
            // ends right where the +2h candidate starts
            event("b", at(4, 11, 30), at(4, 12, 0)),
        ];
        let source = source_with(vec![]);
        let resolver = ConflictResolver::new(&source);
        let proposed = event("new", at(4, 10, 0), at(4, 11, 0));

        let analysis = resolver.analyze(&proposed, &existing, None);
        // the back-to-back +2h slot scores 60 and falls off after the three 70s
        let ranked: Vec<_> = analysis
            .alternative_times
            .iter()
            .map(|o| (o.proposed_time, o.score))
            .collect();
        assert_eq!(
            ranked,
            vec![(at(4, 13, 0), 70), (at(4, 14, 0), 70), (at(5, 10, 0), 70)]
        );
        assert_eq!(analysis.alternative_times[2].cons, vec!["1 day delay"]);
        assert_eq!(
            analysis.alternative_times[2].insight,
            "Acceptable but consider other options"
        );
    }

    #[test]
    fn clear_slot_proceeds_without_alternatives() {
        let source = source_with(vec![]);
        let resolver = ConflictResolver::new(&source);
        let proposed = event("new", at(4, 10, 0), at(4, 11, 0));
        let analysis = resolver.analyze(&proposed, &[], None);
        assert!(analysis.can_proceed);
        assert!(analysis.alternative_times.is_empty());
        assert_eq!(
            analysis.recommendations,
            vec!["✓ No conflicts detected - good time for this meeting"]
        );
        assert_eq!(analysis.recommendation, "✓ Excellent time - no conflicts detected");
    }

    #[test]
    fn search_window_covers_proposed_and_next_day() {
        let source = InMemoryCalendar::new();
        let resolver = ConflictResolver::new(&source);
        let query = resolver.search_window(&event("new", at(4, 10, 0), at(4, 11, 0)), None);
        assert_eq!(query.start, at(4, 0, 0));
        assert_eq!(query.end, at(6, 0, 0));

        let late = resolver.search_window(&event("late", at(4, 23, 0), at(5, 23, 30)), None);
        assert_eq!(late.end, at(6, 1, 30));
    }

    #[test]
    fn search_window_reaches_best_pattern_slot() {
        let source = InMemoryCalendar::new();
        let resolver = ConflictResolver::new(&source);
        let pattern = monday_morning_pattern();
        let query =
            resolver.search_window(&event("new", at(4, 10, 0), at(4, 11, 0)), Some(&pattern));
        assert_eq!(query.start, at(4, 0, 0));
        assert_eq!(query.end, at(9, 12, 0));
    }

    #[test]
    fn busy_pattern_slot_is_not_offered() {
        let proposed = event("new", at(4, 10, 0), at(4, 11, 0));
        let standup = event("standup", at(4, 10, 15), at(4, 11, 15));
        let pattern = monday_morning_pattern();

        let free = source_with(vec![standup.clone()]);
        let analysis = ConflictResolver::new(&free)
            .detect_conflicts(&CallContext::new(), "me", &proposed, Some(&pattern))
            .unwrap();
        assert!(analysis
            .alternative_times
            .iter()
            .any(|o| o.proposed_time == at(9, 9, 0)));

        let review = event("review", at(9, 9, 0), at(9, 10, 0));
        let busy = source_with(vec![standup, review.clone()]);
        let analysis = ConflictResolver::new(&busy)
            .detect_conflicts(&CallContext::new(), "me", &proposed, Some(&pattern))
            .unwrap();
        assert!(!analysis.can_proceed);
        for option in &analysis.alternative_times {
            assert_ne!(option.proposed_time, at(9, 9, 0));
            assert!(!intervals_overlap(
                option.proposed_time,
                option.end_time,
                review.start,
                review.end
            ));
        }
    }

    fn empty_pattern() -> MeetingPattern {
        let now = at(4, 0, 0);
        MeetingPattern {
            identity: "me".into(),
            analyzed_period: crate::patterns::DateRange { start: now, end: now },
            last_updated: now,
            acceptance: Default::default(),
            duration: Default::default(),
            timezone: Default::default(),
            productivity: Default::default(),
            participants: Default::default(),
        }
    }

    /// Everything accepted on Mondays and at 09:00.
    fn monday_morning_pattern() -> MeetingPattern {
        let mut pattern = empty_pattern();
        pattern.acceptance.by_day_of_week.insert(DayOfWeek::Monday, 1.0);
        pattern.acceptance.by_time_of_day.insert(9, 1.0);
        pattern
    }

    #[test]
    fn best_time_uses_default_hour_without_working_hour_data() {
        let mut pattern = empty_pattern();
        assert_eq!(best_time_from_patterns(at(4, 10, 0), &pattern), None);

        pattern.acceptance.by_day_of_week.insert(DayOfWeek::Friday, 0.9);
        pattern.acceptance.by_time_of_day.insert(20, 1.0);
        assert_eq!(
            best_time_from_patterns(at(4, 10, 0), &pattern),
            Some(at(6, 14, 0))
        );
    }

    #[test]
    fn tentative_overlap_still_blocks() {
        let tentative = event("x", at(4, 10, 0), at(4, 10, 30)).with_status(EventStatus::Tentative);
        let existing = vec![tentative];
        let source = source_with(vec![]);
        let resolver = ConflictResolver::new(&source);
        let proposed = event("new", at(4, 10, 0), at(4, 11, 0));
        let analysis = resolver.analyze(&proposed, &existing, None);
        assert!(!analysis.can_proceed);
    }

    #[test]
    fn enumeration_failure_is_fatal() {
        let source = InMemoryCalendar::new();
        source.fail_calendar_listing();
        let resolver = ConflictResolver::new(&source);
        let err = resolver
            .detect_conflicts(
                &CallContext::new(),
                "me",
                &event("new", at(4, 10, 0), at(4, 11, 0)),
                None,
            )
            .unwrap_err();
        assert!(matches!(err, CoreError::CalendarEnumeration { .. }));
    }

    #[test]
    fn insight_thresholds() {
        assert_eq!(option_insight(95, 3), "Excellent alternative with minimal disruption");
        assert_eq!(option_insight(80, 0), "Same day alternative - minimal delay");
        assert_eq!(option_insight(80, 1), "Good alternative with acceptable trade-offs");
        assert_eq!(option_insight(60, 0), "Acceptable but consider other options");
        assert_eq!(option_insight(51, 0), "Suboptimal - many conflicts remain");
    }
}

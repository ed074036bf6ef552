//! Property tests for conflict detection, pattern learning and scoring.

use cadence_core::calendar::{Event, EventStatus};
use cadence_core::conflicts::{detect_hard_conflicts, intervals_overlap, ConflictResolver};
use cadence_core::patterns::{DateRange, PatternLearner};
use cadence_core::scoring::MeetingScorer;
use cadence_core::InMemoryCalendar;
use chrono::{DateTime, Duration, TimeZone, Utc};
use proptest::prelude::*;

fn base() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, 2, 0, 0, 0).unwrap()
}

/// Events within a two-week span, on quarter-hour boundaries.
fn event_strategy() -> impl Strategy<Value = (i64, i64, u8, usize)> {
    (0i64..(14 * 24 * 4), 1i64..16, 0u8..3, 0usize..4)
}

fn build_event(id: usize, (slot, quarters, status, people): (i64, i64, u8, usize)) -> Event {
    let start = base() + Duration::minutes(slot * 15);
    let status = match status {
        0 => EventStatus::Confirmed,
        1 => EventStatus::Tentative,
        _ => EventStatus::Cancelled,
    };
    let emails: Vec<String> = (0..people).map(|p| format!("p{p}@example.com")).collect();
    Event::new(format!("e{id}"), "Meeting", start, start + Duration::minutes(quarters * 15))
        .with_status(status)
        .with_participants(emails)
}

fn build_events(raw: Vec<(i64, i64, u8, usize)>) -> Vec<Event> {
    raw.into_iter()
        .enumerate()
        .map(|(i, r)| build_event(i, r))
        .collect()
}

proptest! {
    #[test]
    fn prop_overlap_is_symmetric(
        a in 0i64..1000,
        a_len in 1i64..200,
        b in 0i64..1000,
        b_len in 1i64..200,
    ) {
        let t = |m: i64| base() + Duration::minutes(m);
        let (a_s, a_e, b_s, b_e) = (t(a), t(a + a_len), t(b), t(b + b_len));
        prop_assert_eq!(
            intervals_overlap(a_s, a_e, b_s, b_e),
            intervals_overlap(b_s, b_e, a_s, a_e)
        );

        let ea = Event::new("a", "A", a_s, a_e);
        let eb = Event::new("b", "B", b_s, b_e);
        prop_assert_eq!(
            detect_hard_conflicts(&ea, std::slice::from_ref(&eb)).len(),
            detect_hard_conflicts(&eb, std::slice::from_ref(&ea)).len()
        );
    }

    #[test]
    fn prop_can_proceed_iff_no_hard_conflicts(
        raw in prop::collection::vec(event_strategy(), 0..20),
        proposed_raw in event_strategy(),
        with_patterns in any::<bool>(),
    ) {
        let mut existing = build_events(raw);
        existing.sort_by(|a, b| a.start.cmp(&b.start).then_with(|| a.id.cmp(&b.id)));
        let mut proposed = build_event(999, proposed_raw);
        proposed.status = EventStatus::Confirmed;

        let period = DateRange { start: base(), end: base() + Duration::days(14) };
        let learned = PatternLearner::new().learn_patterns("me", &existing, period, 14);
        let patterns = with_patterns.then_some(&learned);

        let source = InMemoryCalendar::new();
        let resolver = ConflictResolver::new(&source);
        let analysis = resolver.analyze(&proposed, &existing, patterns);

        prop_assert_eq!(analysis.can_proceed, analysis.hard_conflicts.is_empty());
        prop_assert_eq!(
            analysis.total_conflicts,
            analysis.hard_conflicts.len() + analysis.soft_conflicts.len()
        );
        for option in &analysis.alternative_times {
            prop_assert!(option.score <= 100);
            prop_assert!(option.conflicts.iter().all(|c| !c.conflict_type.is_hard()));
            let moved_start = option.proposed_time;
            let moved_end = option.end_time;
            prop_assert!(existing
                .iter()
                .filter(|e| !e.is_cancelled())
                .all(|e| !intervals_overlap(moved_start, moved_end, e.start, e.end)));
        }
        prop_assert!(analysis
            .alternative_times
            .windows(2)
            .all(|w| w[0].score >= w[1].score));
    }

    #[test]
    fn prop_acceptance_rates_are_bounded(raw in prop::collection::vec(event_strategy(), 1..40)) {
        let mut events = build_events(raw);
        events.sort_by(|a, b| a.start.cmp(&b.start).then_with(|| a.id.cmp(&b.id)));
        let period = DateRange { start: base(), end: base() + Duration::days(14) };
        let pattern = PatternLearner::new().learn_patterns("me", &events, period, 14);

        let accepted = events.iter().filter(|e| e.is_confirmed()).count();
        prop_assert_eq!(pattern.acceptance.overall, accepted as f64 / events.len() as f64);

        let rates = pattern
            .acceptance
            .by_day_of_week
            .values()
            .chain(pattern.acceptance.by_time_of_day.values())
            .chain(pattern.acceptance.by_day_and_time.values());
        for rate in rates {
            prop_assert!((0.0..=1.0).contains(rate));
        }
        for block in &pattern.productivity.peak_focus {
            prop_assert!((0.0..=100.0).contains(&block.score));
        }
    }

    #[test]
    fn prop_scores_are_bounded(
        raw in prop::collection::vec(event_strategy(), 1..40),
        offset in 0i64..(14 * 24),
        people in 0usize..4,
    ) {
        let mut events = build_events(raw);
        events.sort_by(|a, b| a.start.cmp(&b.start).then_with(|| a.id.cmp(&b.id)));
        let period = DateRange { start: base(), end: base() + Duration::days(14) };
        let pattern = PatternLearner::new().learn_patterns("me", &events, period, 14);

        let attendees: Vec<String> = (0..people).map(|p| format!("p{p}@example.com")).collect();
        let at = base() + Duration::hours(offset);
        let score = MeetingScorer::new(Some(&pattern)).score_meeting_time(at, &attendees, 30);

        prop_assert!(score.score <= 100);
        prop_assert!((0.0..=100.0).contains(&score.confidence));
        prop_assert!((0.0..=1.0).contains(&score.success_rate));
        prop_assert!(score.alternative_times.len() <= 1);
    }
}

//! Meeting time scoring.
//!
//! A proposed slot is scored against a [`MeetingPattern`] with a fixed
//! five-factor model. Each factor has a weight equal to its maximum
//! contribution:
//!
//! | Factor | Weight | Source |
//! |--------|--------|--------|
//! | Day Preference | 25 | weekday acceptance rate |
//! | Time Preference | 25 | hour acceptance rate |
//! | Productivity | 20 | focus blocks, then weekday density |
//! | Participant Match | 15 | preferred days/hours of known participants |
//! | Timezone | 15 | [`timezone_fairness`] |
//!
//! The acceptance factors only count when their bucket has data.
//!
//! ```text
//! score = round(Σ contribution × 100 / Σ weight)
//! ```

use chrono::{DateTime, Timelike, Utc};
use serde::{Deserialize, Serialize};

use crate::patterns::MeetingPattern;
use crate::time::{hour_label, next_weekday_at, DayOfWeek};

const DAY_WEIGHT: f64 = 25.0;
const TIME_WEIGHT: f64 = 25.0;
const PRODUCTIVITY_WEIGHT: f64 = 20.0;
const PARTICIPANT_WEIGHT: f64 = 15.0;
const TIMEZONE_WEIGHT: f64 = 15.0;

const NEUTRAL_PRODUCTIVITY: f64 = 10.0;
const NEUTRAL_PARTICIPANT: f64 = 8.0;
const PREFERRED_DAY_BONUS: f64 = 8.0;
const PREFERRED_TIME_BONUS: f64 = 7.0;

/// Alternatives are only offered below this score.
const ALTERNATIVE_THRESHOLD: u32 = 70;

pub const NO_HISTORY_RECOMMENDATION: &str = "No historical data available for scoring";

/// One weighted term of a [`MeetingScore`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreFactor {
    pub name: String,
    /// Maximum contribution.
    pub weight: f64,
    pub contribution: f64,
    /// Contribution relative to half the weight. Negative means the factor
    /// pulls the score down.
    pub impact: f64,
    pub description: String,
}

impl ScoreFactor {
    pub fn new(
        name: impl Into<String>,
        weight: f64,
        contribution: f64,
        description: impl Into<String>,
    ) -> Self {
        let contribution = contribution.clamp(0.0, weight);
        Self {
            name: name.into(),
            weight,
            contribution,
            impact: contribution - weight / 2.0,
            description: description.into(),
        }
    }
}

/// Predicted quality of a meeting slot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MeetingScore {
    /// 0-100
    pub score: u32,
    /// 0-100, share of pattern categories with data.
    pub confidence: f64,
    /// Historical acceptance rate used as a success proxy.
    pub success_rate: f64,
    pub factors: Vec<ScoreFactor>,
    pub recommendation: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub alternative_times: Vec<DateTime<Utc>>,
}

impl MeetingScore {
    /// Result returned when there is no pattern to score against.
    pub fn without_history() -> Self {
        Self {
            score: 50,
            confidence: 0.0,
            success_rate: 0.0,
            factors: Vec::new(),
            recommendation: NO_HISTORY_RECOMMENDATION.to_string(),
            alternative_times: Vec::new(),
        }
    }

    /// Factor pulling the score down the most, if any is below neutral.
    pub fn worst_factor(&self) -> Option<&ScoreFactor> {
        self.factors
            .iter()
            .filter(|f| f.impact < 0.0)
            .min_by(|a, b| a.impact.total_cmp(&b.impact))
    }
}

/// Scores meeting slots against an optional pattern snapshot.
#[derive(Debug, Clone, Copy, Default)]
pub struct MeetingScorer<'a> {
    patterns: Option<&'a MeetingPattern>,
}

impl<'a> MeetingScorer<'a> {
    pub fn new(patterns: Option<&'a MeetingPattern>) -> Self {
        Self { patterns }
    }

    pub fn patterns(&self) -> Option<&'a MeetingPattern> {
        self.patterns
    }

    /// Score a meeting starting at `at`.
    ///
    /// The duration is accepted for callers that track it but does not
    /// change the score. Never fails; with no patterns the fixed
    /// [`MeetingScore::without_history`] result is returned.
    pub fn score_meeting_time(
        &self,
        at: DateTime<Utc>,
        participants: &[String],
        _duration_minutes: i64,
    ) -> MeetingScore {
        let Some(patterns) = self.patterns else {
            return MeetingScore::without_history();
        };

        let day = DayOfWeek::of(at);
        let hour = at.hour();
        let mut factors = Vec::with_capacity(5);

        if let Some(rate) = patterns.acceptance.by_day_of_week.get(&day) {
            factors.push(ScoreFactor::new(
                "Day Preference",
                DAY_WEIGHT,
                rate * DAY_WEIGHT,
                format!("{:.0}% acceptance rate on {day}s", rate * 100.0),
            ));
        }

        if let Some(rate) = patterns.acceptance.by_time_of_day.get(&hour) {
            factors.push(ScoreFactor::new(
                "Time Preference",
                TIME_WEIGHT,
                rate * TIME_WEIGHT,
                format!("{:.0}% acceptance rate at {}", rate * 100.0, hour_label(hour)),
            ));
        }

        factors.push(productivity_factor(patterns, day, hour));
        factors.push(participant_factor(patterns, participants, day, hour));
        factors.push(ScoreFactor::new(
            "Timezone",
            TIMEZONE_WEIGHT,
            timezone_fairness(patterns, at, participants),
            "Time works well for all timezones",
        ));

        let total: f64 = factors.iter().map(|f| f.contribution).sum();
        let max: f64 = factors.iter().map(|f| f.weight).sum();
        let score = if max > 0.0 {
            (total * 100.0 / max).round().clamp(0.0, 100.0) as u32
        } else {
            0
        };

        let success_rate = patterns
            .acceptance
            .by_day_of_week
            .get(&day)
            .copied()
            .unwrap_or(patterns.acceptance.overall);

        let mut result = MeetingScore {
            score,
            confidence: confidence(patterns),
            success_rate,
            factors,
            recommendation: String::new(),
            alternative_times: Vec::new(),
        };
        result.recommendation = recommendation(&result);
        if score < ALTERNATIVE_THRESHOLD {
            result.alternative_times = suggest_alternatives(patterns, at);
        }
        result
    }
}

/// Timezone fairness contribution, 0 to 15.
///
/// Always grants full credit until participant timezones are modeled.
pub fn timezone_fairness(
    _patterns: &MeetingPattern,
    _at: DateTime<Utc>,
    _participants: &[String],
) -> f64 {
    TIMEZONE_WEIGHT
}

fn productivity_factor(patterns: &MeetingPattern, day: DayOfWeek, hour: u32) -> ScoreFactor {
    let productivity = &patterns.productivity;
    let (contribution, description) = if let Some(block) = productivity.focus_block_at(day, hour) {
        (
            block.score / 5.0,
            "Peak focus time - fewer meetings scheduled".to_string(),
        )
    } else if let Some(density) = productivity.meeting_density.get(&day) {
        let contribution = if *density < 2.0 {
            18.0
        } else if *density < 4.0 {
            12.0
        } else {
            6.0
        };
        (contribution, format!("Average {density:.1} meetings on {day}s"))
    } else {
        (NEUTRAL_PRODUCTIVITY, "Standard productivity time".to_string())
    };
    ScoreFactor::new("Productivity", PRODUCTIVITY_WEIGHT, contribution, description)
}

fn participant_factor(
    patterns: &MeetingPattern,
    participants: &[String],
    day: DayOfWeek,
    hour: u32,
) -> ScoreFactor {
    let known: Vec<_> = participants
        .iter()
        .filter_map(|email| patterns.participants.get(email))
        .collect();

    if known.is_empty() {
        return ScoreFactor::new(
            "Participant Match",
            PARTICIPANT_WEIGHT,
            NEUTRAL_PARTICIPANT,
            "No meeting history with these participants",
        );
    }

    let total: f64 = known
        .iter()
        .map(|p| {
            let mut points = 0.0;
            if p.preferred_days.contains(&day) {
                points += PREFERRED_DAY_BONUS;
            }
            if p.preferred_times.contains(&hour) {
                points += PREFERRED_TIME_BONUS;
            }
            points
        })
        .sum();

    ScoreFactor::new(
        "Participant Match",
        PARTICIPANT_WEIGHT,
        total / known.len() as f64,
        "Based on historical meetings with these participants",
    )
}

/// Share of the five pattern categories holding data, as a percentage.
fn confidence(patterns: &MeetingPattern) -> f64 {
    let categories = [
        !patterns.acceptance.by_day_of_week.is_empty(),
        !patterns.acceptance.by_time_of_day.is_empty(),
        !patterns.productivity.peak_focus.is_empty(),
        !patterns.participants.is_empty(),
        !patterns.duration.by_participant.is_empty(),
    ];
    let present = categories.iter().filter(|c| **c).count();
    present as f64 / categories.len() as f64 * 100.0
}

fn recommendation(score: &MeetingScore) -> String {
    match score.score {
        85.. => "Excellent time - highly recommended based on historical patterns".to_string(),
        70..=84 => "Good time - aligns well with your preferences".to_string(),
        50..=69 => "Acceptable time - consider alternatives if available".to_string(),
        _ => match score.worst_factor() {
            Some(factor) => format!(
                "Not recommended - {} is suboptimal. Consider alternative times.",
                factor.name
            ),
            None => "Not recommended - consider alternative times".to_string(),
        },
    }
}

/// Best accepted weekday at the best accepted working hour, projected to
/// its next occurrence after `proposed`'s date.
fn suggest_alternatives(patterns: &MeetingPattern, proposed: DateTime<Utc>) -> Vec<DateTime<Utc>> {
    let best_day = patterns.acceptance.best_day();
    let best_hour = patterns.acceptance.best_hour_in(9..=17);
    match (best_day, best_hour) {
        (Some((day, _)), Some((hour, _))) => vec![next_weekday_at(proposed, day, hour)],
        _ => Vec::new(),
    }
}

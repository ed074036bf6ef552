//! Running accumulators used while reducing an event history.

use std::collections::BTreeMap;

use super::{DurationStats, ParticipantPattern};
use crate::time::DayOfWeek;

/// Sample variance (n - 1 denominator). Zero for fewer than two samples.
pub fn sample_variance(samples: &[i64]) -> f64 {
    if samples.len() < 2 {
        return 0.0;
    }
    let n = samples.len() as f64;
    let mean = samples.iter().sum::<i64>() as f64 / n;
    let sum_sq: f64 = samples
        .iter()
        .map(|&x| {
            let d = x as f64 - mean;
            d * d
        })
        .sum();
    sum_sq / (n - 1.0)
}

/// Collects scheduled and actual durations in minutes.
#[derive(Debug, Clone, Default)]
pub struct DurationAccumulator {
    scheduled: Vec<i64>,
    total_actual: i64,
    overruns: usize,
}

impl DurationAccumulator {
    pub fn add(&mut self, scheduled: i64, actual: i64) {
        self.scheduled.push(scheduled);
        self.total_actual += actual;
        if actual > scheduled {
            self.overruns += 1;
        }
    }

    pub fn count(&self) -> usize {
        self.scheduled.len()
    }

    pub fn to_stats(&self) -> DurationStats {
        let count = self.scheduled.len() as i64;
        if count == 0 {
            return DurationStats::default();
        }
        DurationStats {
            average_scheduled: self.scheduled.iter().sum::<i64>() / count,
            average_actual: self.total_actual / count,
            variance: sample_variance(&self.scheduled),
            overrun_rate: self.overruns as f64 / count as f64,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub(crate) struct ParticipantAccumulator {
    meeting_count: usize,
    accepted_count: usize,
    day_count: BTreeMap<DayOfWeek, usize>,
    hour_count: BTreeMap<u32, usize>,
    total_duration: i64,
    timezone: Option<String>,
}

impl ParticipantAccumulator {
    pub(crate) fn add(
        &mut self,
        day: DayOfWeek,
        hour: u32,
        duration: i64,
        accepted: bool,
        timezone: Option<&str>,
    ) {
        self.meeting_count += 1;
        if accepted {
            self.accepted_count += 1;
        }
        *self.day_count.entry(day).or_default() += 1;
        *self.hour_count.entry(hour).or_default() += 1;
        self.total_duration += duration;
        if let Some(tz) = timezone.filter(|tz| !tz.is_empty()) {
            self.timezone = Some(tz.to_string());
        }
    }

    pub(crate) fn to_pattern(&self, email: &str) -> ParticipantPattern {
        let (acceptance_rate, average_duration) = if self.meeting_count > 0 {
            (
                self.accepted_count as f64 / self.meeting_count as f64,
                self.total_duration / self.meeting_count as i64,
            )
        } else {
            (0.0, 0)
        };

        ParticipantPattern {
            email: email.to_string(),
            meeting_count: self.meeting_count,
            acceptance_rate,
            preferred_days: top_two(&self.day_count),
            preferred_times: top_two(&self.hour_count),
            average_duration,
            timezone: self.timezone.clone(),
        }
    }
}

/// Two most frequent keys, count descending then key ascending.
fn top_two<K: Copy + Ord>(counts: &BTreeMap<K, usize>) -> Vec<K> {
    let mut ranked: Vec<(K, usize)> = counts.iter().map(|(k, c)| (*k, *c)).collect();
    // stable sort keeps ascending key order among equal counts
    ranked.sort_by(|a, b| b.1.cmp(&a.1));
    ranked.into_iter().take(2).map(|(k, _)| k).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn variance_uses_sample_denominator() {
        assert_eq!(sample_variance(&[]), 0.0);
        assert_eq!(sample_variance(&[30]), 0.0);
        // mean 45, squared deviations 225 + 225 = 450, / (2 - 1)
        assert!((sample_variance(&[30, 60]) - 450.0).abs() < 1e-9);
        assert_eq!(sample_variance(&[60, 60, 60]), 0.0);
    }

    #[test]
    fn duration_stats_use_integer_means() {
        let mut acc = DurationAccumulator::default();
        acc.add(30, 30);
        acc.add(45, 45);
        acc.add(60, 70);
        let stats = acc.to_stats();
        assert_eq!(stats.average_scheduled, 45);
        assert_eq!(stats.average_actual, 48);
        assert!((stats.overrun_rate - 1.0 / 3.0).abs() < 1e-9);
        assert!((stats.variance - 225.0).abs() < 1e-9);
    }

    #[test]
    fn empty_accumulator_yields_zeroes() {
        assert_eq!(DurationAccumulator::default().to_stats(), DurationStats::default());
    }

    #[test]
    fn participant_top_two_is_deterministic() {
        let mut acc = ParticipantAccumulator::default();
        acc.add(DayOfWeek::Friday, 14, 30, true, None);
        acc.add(DayOfWeek::Tuesday, 10, 30, true, Some("Europe/Berlin"));
        acc.add(DayOfWeek::Monday, 10, 60, false, Some(""));
        acc.add(DayOfWeek::Friday, 9, 60, true, None);

        let pattern = acc.to_pattern("ana@example.com");
        assert_eq!(pattern.preferred_days, vec![DayOfWeek::Friday, DayOfWeek::Monday]);
        assert_eq!(pattern.preferred_times, vec![10, 9]);
        assert_eq!(pattern.meeting_count, 4);
        assert_eq!(pattern.average_duration, 45);
        assert!((pattern.acceptance_rate - 0.75).abs() < 1e-9);
        assert_eq!(pattern.timezone.as_deref(), Some("Europe/Berlin"));
    }
}

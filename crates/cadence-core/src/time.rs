//! Calendar time primitives shared by every analytics component.
//!
//! All bucketing uses UTC wall-clock values of the event instants.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveTime, Timelike, Utc, Weekday};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::ValidationError;

/// Day of the week, ordered Monday first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum DayOfWeek {
    Monday,
    Tuesday,
    Wednesday,
    Thursday,
    Friday,
    Saturday,
    Sunday,
}

impl DayOfWeek {
    pub const ALL: [DayOfWeek; 7] = [
        DayOfWeek::Monday,
        DayOfWeek::Tuesday,
        DayOfWeek::Wednesday,
        DayOfWeek::Thursday,
        DayOfWeek::Friday,
        DayOfWeek::Saturday,
        DayOfWeek::Sunday,
    ];

    /// Monday through Friday.
    pub const WORKDAYS: [DayOfWeek; 5] = [
        DayOfWeek::Monday,
        DayOfWeek::Tuesday,
        DayOfWeek::Wednesday,
        DayOfWeek::Thursday,
        DayOfWeek::Friday,
    ];

    /// Weekday of an instant.
    pub fn of(at: DateTime<Utc>) -> Self {
        at.weekday().into()
    }

    pub fn name(&self) -> &'static str {
        match self {
            DayOfWeek::Monday => "Monday",
            DayOfWeek::Tuesday => "Tuesday",
            DayOfWeek::Wednesday => "Wednesday",
            DayOfWeek::Thursday => "Thursday",
            DayOfWeek::Friday => "Friday",
            DayOfWeek::Saturday => "Saturday",
            DayOfWeek::Sunday => "Sunday",
        }
    }

    /// Position counted from Monday (Monday = 0).
    pub fn index(&self) -> u32 {
        Weekday::from(*self).num_days_from_monday()
    }

    /// Days to move forward from `self` to reach `target` (0..=6).
    pub fn days_until(&self, target: DayOfWeek) -> i64 {
        ((target.index() + 7 - self.index()) % 7) as i64
    }
}

impl From<Weekday> for DayOfWeek {
    fn from(day: Weekday) -> Self {
        match day {
            Weekday::Mon => DayOfWeek::Monday,
            Weekday::Tue => DayOfWeek::Tuesday,
            Weekday::Wed => DayOfWeek::Wednesday,
            Weekday::Thu => DayOfWeek::Thursday,
            Weekday::Fri => DayOfWeek::Friday,
            Weekday::Sat => DayOfWeek::Saturday,
            Weekday::Sun => DayOfWeek::Sunday,
        }
    }
}

impl From<DayOfWeek> for Weekday {
    fn from(day: DayOfWeek) -> Self {
        match day {
            DayOfWeek::Monday => Weekday::Mon,
            DayOfWeek::Tuesday => Weekday::Tue,
            DayOfWeek::Wednesday => Weekday::Wed,
            DayOfWeek::Thursday => Weekday::Thu,
            DayOfWeek::Friday => Weekday::Fri,
            DayOfWeek::Saturday => Weekday::Sat,
            DayOfWeek::Sunday => Weekday::Sun,
        }
    }
}

impl fmt::Display for DayOfWeek {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for DayOfWeek {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.trim().to_ascii_lowercase();
        DayOfWeek::ALL
            .into_iter()
            .find(|d| {
                d.name().to_ascii_lowercase() == lower || d.name()[..3].eq_ignore_ascii_case(&lower)
            })
            .ok_or_else(|| ValidationError::InvalidDayOfWeek(s.to_string()))
    }
}

/// Wall-clock time of day with minute precision, written `HH:MM`.
///
/// `24:00` is accepted as an end-of-day marker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ClockTime {
    minutes: u32,
}

impl ClockTime {
    pub const MIDNIGHT: ClockTime = ClockTime { minutes: 0 };
    const END_OF_DAY: u32 = 24 * 60;

    pub fn new(hour: u32, minute: u32) -> Result<Self, ValidationError> {
        if minute >= 60 || hour > 24 || hour * 60 + minute > Self::END_OF_DAY {
            return Err(ValidationError::InvalidClockTime(format!("{hour:02}:{minute:02}")));
        }
        Ok(Self {
            minutes: hour * 60 + minute,
        })
    }

    /// Whole hour, clamped to `24:00`.
    pub fn from_hour(hour: u32) -> Self {
        Self {
            minutes: hour.saturating_mul(60).min(Self::END_OF_DAY),
        }
    }

    /// Time of day of an instant, truncated to the minute.
    pub fn of(at: DateTime<Utc>) -> Self {
        Self {
            minutes: at.hour() * 60 + at.minute(),
        }
    }

    pub fn hour(&self) -> u32 {
        self.minutes / 60
    }

    pub fn minute(&self) -> u32 {
        self.minutes % 60
    }

    /// Minutes since midnight.
    pub fn total_minutes(&self) -> u32 {
        self.minutes
    }

    /// Signed minutes from `self` to `later`.
    pub fn minutes_until(&self, later: ClockTime) -> i64 {
        later.minutes as i64 - self.minutes as i64
    }

    /// Shift by `minutes`, clamped to the day.
    pub fn plus_minutes(&self, minutes: i64) -> Self {
        let shifted = (self.minutes as i64 + minutes).clamp(0, Self::END_OF_DAY as i64);
        Self {
            minutes: shifted as u32,
        }
    }

    /// The instant at this clock time on `date`.
    pub fn on(&self, date: NaiveDate) -> DateTime<Utc> {
        date.and_time(NaiveTime::MIN).and_utc() + Duration::minutes(self.minutes as i64)
    }
}

impl fmt::Display for ClockTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:{:02}", self.hour(), self.minute())
    }
}

impl FromStr for ClockTime {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || ValidationError::InvalidClockTime(s.to_string());
        let (h, m) = s.trim().split_once(':').ok_or_else(invalid)?;
        let hour: u32 = h.parse().map_err(|_| invalid())?;
        let minute: u32 = m.parse().map_err(|_| invalid())?;
        ClockTime::new(hour, minute).map_err(|_| invalid())
    }
}

impl Serialize for ClockTime {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for ClockTime {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// Composite `(weekday, hour)` bucket key, written `Monday-09:00`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DayHour {
    pub day: DayOfWeek,
    pub hour: u32,
}

impl DayHour {
    pub fn new(day: DayOfWeek, hour: u32) -> Self {
        Self { day, hour }
    }

    pub fn of(at: DateTime<Utc>) -> Self {
        Self::new(DayOfWeek::of(at), at.hour())
    }
}

impl fmt::Display for DayHour {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{:02}:00", self.day, self.hour)
    }
}

impl FromStr for DayHour {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (day, time) = s
            .split_once('-')
            .ok_or_else(|| ValidationError::InvalidValue {
                field: "day_hour".into(),
                message: format!("expected Day-HH:MM, got '{s}'"),
            })?;
        let clock: ClockTime = time.parse()?;
        Ok(DayHour::new(day.parse()?, clock.hour()))
    }
}

impl Serialize for DayHour {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for DayHour {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// `HH:00` label for an hour bucket.
pub fn hour_label(hour: u32) -> String {
    ClockTime::from_hour(hour).to_string()
}

/// Next `day` strictly after the date of `from` (same weekday rolls a full
/// week), at `hour:00`.
pub fn next_weekday_at(from: DateTime<Utc>, day: DayOfWeek, hour: u32) -> DateTime<Utc> {
    let mut days = DayOfWeek::of(from).days_until(day);
    if days == 0 {
        days = 7;
    }
    let date = from.date_naive() + Duration::days(days);
    ClockTime::from_hour(hour).on(date)
}

/// Next occurrence of `day` at `time` relative to `now`.
///
/// Today counts unless that instant is already in the past.
pub fn next_occurrence(now: DateTime<Utc>, day: DayOfWeek, time: ClockTime) -> DateTime<Utc> {
    let mut days = DayOfWeek::of(now).days_until(day);
    if days == 0 && time.on(now.date_naive()) < now {
        days = 7;
    }
    time.on(now.date_naive() + Duration::days(days))
}

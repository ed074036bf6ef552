//! # Cadence Core Library
//!
//! Calendar intelligence for Cadence: learn how someone actually uses their
//! calendar, then use that to judge new meetings and protect focus time.
//! Every operation is synchronous and works against a caller-supplied
//! [`CalendarDataSource`]; no state is kept between calls.
//!
//! ## Architecture
//!
//! - **Patterns**: reduce an event history into a [`MeetingPattern`]
//!   (acceptance, duration, timezone, productivity and per-participant stats)
//! - **Scoring**: rate a proposed meeting time against a pattern with a
//!   five-factor weighted model
//! - **Conflicts**: detect hard and soft conflicts and rank alternative slots
//! - **Focus**: recommend, create and adapt protected focus blocks
//!
//! ## Key Components
//!
//! - [`PatternLearner`]: history analysis
//! - [`MeetingScorer`]: meeting time scoring
//! - [`ConflictResolver`]: conflict detection and rescheduling
//! - [`FocusOptimizer`]: focus-time protection
//! - [`AnalyticsConfig`]: TOML configuration

pub mod calendar;
pub mod config;
pub mod conflicts;
pub mod context;
pub mod error;
pub mod focus;
pub mod patterns;
pub mod scoring;
pub mod time;

pub use calendar::{
    Calendar, CalendarDataSource, Event, EventQuery, EventStatus, InMemoryCalendar, NewEvent,
    Participant, RsvpStatus,
};
pub use config::AnalyticsConfig;
pub use conflicts::{
    Conflict, ConflictAnalysis, ConflictResolver, ConflictSeverity, ConflictType, RescheduleOption,
};
pub use context::CallContext;
pub use error::{ConfigError, CoreError, DataSourceError, Result, ValidationError};
pub use focus::{
    AdaptiveScheduleChange, AdaptiveTrigger, EventClassifier, FocusOptimizer, FocusTimeAnalysis,
    FocusTimeBlock, FocusTimeSettings, HeuristicClassifier, ProtectedBlock,
};
pub use patterns::{MeetingAnalysis, MeetingPattern, PatternLearner};
pub use scoring::{MeetingScore, MeetingScorer};
pub use time::{ClockTime, DayOfWeek};

//! TOML-based analytics configuration.
//!
//! Holds the tunables of the analytics pipeline:
//! - Working hours bounding the productivity scan
//! - History window and per-calendar fetch limit
//! - Conflict detection thresholds
//! - Focus block defaults
//!
//! Configuration is stored at `~/.config/cadence/analytics.toml`.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::ConfigError;
use crate::focus::FocusTimeSettings;
use crate::time::ClockTime;

/// Working-hours window scanned for productive blocks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkingHours {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_work_start")]
    pub start: ClockTime,
    #[serde(default = "default_work_end")]
    pub end: ClockTime,
}

impl WorkingHours {
    /// Hour range `[start, end)` used for bucket scans.
    ///
    /// A start with minutes past the hour rounds up to the next full hour.
    /// Disabled working hours fall back to 09-17.
    pub fn hour_range(&self) -> (u32, u32) {
        if !self.enabled {
            return (DEFAULT_START_HOUR, DEFAULT_END_HOUR);
        }
        let start = if self.start.minute() > 0 {
            self.start.hour() + 1
        } else {
            self.start.hour()
        };
        (start, self.end.hour())
    }
}

/// History analysis window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryConfig {
    #[serde(default = "default_window_days")]
    pub window_days: u32,
    /// Maximum events fetched per calendar.
    #[serde(default = "default_event_limit")]
    pub event_limit: usize,
}

/// Conflict detection thresholds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConflictConfig {
    #[serde(default = "default_search_padding")]
    pub search_padding_minutes: i64,
    #[serde(default = "default_near_miss")]
    pub near_miss_minutes: i64,
    /// Existing events on one day at which a new meeting counts as overload.
    #[serde(default = "default_overload_threshold")]
    pub overload_threshold: usize,
    /// Alternatives must score strictly above this.
    #[serde(default = "default_min_alternative_score")]
    pub min_alternative_score: u32,
    #[serde(default = "default_max_alternatives")]
    pub max_alternatives: usize,
}

/// Focus block creation and adaptive scheduling.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FocusConfig {
    #[serde(default = "default_adapt_horizon")]
    pub adapt_horizon_days: i64,
    #[serde(default = "default_protection_lookahead")]
    pub protection_lookahead_days: i64,
    #[serde(default = "default_block_title")]
    pub block_title: String,
    #[serde(default = "default_block_description")]
    pub block_description: String,
}

/// Analytics configuration.
///
/// Serialized to/from TOML at `~/.config/cadence/analytics.toml`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct AnalyticsConfig {
    #[serde(default)]
    pub working_hours: WorkingHours,
    #[serde(default)]
    pub history: HistoryConfig,
    #[serde(default)]
    pub conflicts: ConflictConfig,
    #[serde(default)]
    pub focus: FocusConfig,
    #[serde(default)]
    pub focus_settings: FocusTimeSettings,
}

const DEFAULT_START_HOUR: u32 = 9;
const DEFAULT_END_HOUR: u32 = 17;

fn default_true() -> bool {
    true
}
fn default_work_start() -> ClockTime {
    ClockTime::from_hour(DEFAULT_START_HOUR)
}
fn default_work_end() -> ClockTime {
    ClockTime::from_hour(DEFAULT_END_HOUR)
}
fn default_window_days() -> u32 {
    90
}
fn default_event_limit() -> usize {
    200
}
fn default_search_padding() -> i64 {
    120
}
fn default_near_miss() -> i64 {
    15
}
fn default_overload_threshold() -> usize {
    6
}
fn default_min_alternative_score() -> u32 {
    50
}
fn default_max_alternatives() -> usize {
    3
}
fn default_adapt_horizon() -> i64 {
    14
}
fn default_protection_lookahead() -> i64 {
    7
}
fn default_block_title() -> String {
    "Focus Time".into()
}
fn default_block_description() -> String {
    "Protected time for deep work".into()
}

impl Default for WorkingHours {
    fn default() -> Self {
        Self {
            enabled: true,
            start: default_work_start(),
            end: default_work_end(),
        }
    }
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            window_days: default_window_days(),
            event_limit: default_event_limit(),
        }
    }
}

impl Default for ConflictConfig {
    fn default() -> Self {
        Self {
            search_padding_minutes: default_search_padding(),
            near_miss_minutes: default_near_miss(),
            overload_threshold: default_overload_threshold(),
            min_alternative_score: default_min_alternative_score(),
            max_alternatives: default_max_alternatives(),
        }
    }
}

impl Default for FocusConfig {
    fn default() -> Self {
        Self {
            adapt_horizon_days: default_adapt_horizon(),
            protection_lookahead_days: default_protection_lookahead(),
            block_title: default_block_title(),
            block_description: default_block_description(),
        }
    }
}

/// Directory holding the configuration file.
///
/// Set CADENCE_ENV=dev to use the development directory.
pub fn config_dir() -> Result<PathBuf, ConfigError> {
    let base_dir = dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".config");

    let env = std::env::var("CADENCE_ENV").unwrap_or_else(|_| "production".to_string());
    let dir = if env == "dev" {
        base_dir.join("cadence-dev")
    } else {
        base_dir.join("cadence")
    };

    std::fs::create_dir_all(&dir).map_err(|e| ConfigError::SaveFailed {
        path: dir.clone(),
        message: e.to_string(),
    })?;
    Ok(dir)
}

impl AnalyticsConfig {
    pub fn path() -> Result<PathBuf, ConfigError> {
        Ok(config_dir()?.join("analytics.toml"))
    }

    /// Load from the default location, writing defaults when the file is missing.
    pub fn load() -> Result<Self, ConfigError> {
        let path = Self::path()?;
        if path.exists() {
            Self::load_from(&path)
        } else {
            let cfg = Self::default();
            cfg.save_to(&path)?;
            Ok(cfg)
        }
    }

    /// Load from disk, returning default on error.
    pub fn load_or_default() -> Self {
        Self::load().unwrap_or_default()
    }

    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::LoadFailed {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        let cfg: AnalyticsConfig = toml::from_str(&content)?;
        cfg.validate()?;
        debug!(path = %path.display(), "loaded analytics config");
        Ok(cfg)
    }

    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        let save_err = |message: String| ConfigError::SaveFailed {
            path: path.to_path_buf(),
            message,
        };
        let content = toml::to_string_pretty(self).map_err(|e| save_err(e.to_string()))?;
        std::fs::write(path, content).map_err(|e| save_err(e.to_string()))
    }

    /// Reject settings the pipeline cannot honor.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.working_hours.enabled && self.working_hours.start >= self.working_hours.end {
            return Err(ConfigError::InvalidValue {
                key: "working_hours".into(),
                message: format!(
                    "start {} must be before end {}",
                    self.working_hours.start, self.working_hours.end
                ),
            });
        }
        if self.history.window_days == 0 {
            return Err(ConfigError::InvalidValue {
                key: "history.window_days".into(),
                message: "must be at least 1".into(),
            });
        }
        let settings = &self.focus_settings;
        if settings.max_block_duration > 0
            && settings.min_block_duration > settings.max_block_duration
        {
            return Err(ConfigError::InvalidValue {
                key: "focus_settings.min_block_duration".into(),
                message: format!(
                    "{} exceeds max_block_duration {}",
                    settings.min_block_duration, settings.max_block_duration
                ),
            });
        }
        if settings.target_hours_per_week < 0.0 {
            return Err(ConfigError::InvalidValue {
                key: "focus_settings.target_hours_per_week".into(),
                message: "must not be negative".into(),
            });
        }
        Ok(())
    }

    /// Get a config value as string by dot-separated key.
    pub fn get(&self, key: &str) -> Option<String> {
        let json = serde_json::to_value(self).ok()?;
        let mut current = &json;
        for part in key.split('.').filter(|p| !p.is_empty()) {
            current = current.get(part)?;
        }
        match current {
            serde_json::Value::String(s) => Some(s.clone()),
            other => Some(other.to_string()),
        }
    }

    /// Set a config value by dot-separated key, then re-validate.
    pub fn set(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        let unknown = || ConfigError::InvalidValue {
            key: key.to_string(),
            message: "unknown config key".into(),
        };
        let invalid = |message: String| ConfigError::InvalidValue {
            key: key.to_string(),
            message,
        };

        let mut json = serde_json::to_value(&*self).map_err(|e| invalid(e.to_string()))?;
        let (parents, leaf) = match key.rsplit_once('.') {
            Some((parents, leaf)) => (Some(parents), leaf),
            None => (None, key),
        };

        let mut current = &mut json;
        if let Some(parents) = parents {
            for part in parents.split('.') {
                current = current.get_mut(part).ok_or_else(unknown)?;
            }
        }
        let obj = current.as_object_mut().ok_or_else(unknown)?;
        let existing = obj.get(leaf).ok_or_else(unknown)?;

        let new_value = match existing {
            serde_json::Value::Bool(_) => serde_json::Value::Bool(
                value
                    .parse::<bool>()
                    .map_err(|_| invalid(format!("cannot parse '{value}' as bool")))?,
            ),
            serde_json::Value::Number(_) => {
                if let Ok(n) = value.parse::<u64>() {
                    serde_json::Value::Number(n.into())
                } else {
                    value
                        .parse::<f64>()
                        .ok()
                        .and_then(serde_json::Number::from_f64)
                        .map(serde_json::Value::Number)
                        .ok_or_else(|| invalid(format!("cannot parse '{value}' as number")))?
                }
            }
            serde_json::Value::Object(_) | serde_json::Value::Array(_) => {
                serde_json::from_str(value).map_err(|e| invalid(e.to_string()))?
            }
            _ => serde_json::Value::String(value.into()),
        };
        obj.insert(leaf.to_string(), new_value);

        let updated: AnalyticsConfig =
            serde_json::from_value(json).map_err(|e| invalid(e.to_string()))?;
        updated.validate()?;
        *self = updated;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_roundtrip() {
        let cfg = AnalyticsConfig::default();
        let toml_str = toml::to_string_pretty(&cfg).unwrap();
        let parsed: AnalyticsConfig = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed, cfg);
        assert_eq!(parsed.history.window_days, 90);
        assert_eq!(parsed.conflicts.overload_threshold, 6);
    }

    #[test]
    fn partial_toml_fills_defaults() {
        let cfg: AnalyticsConfig = toml::from_str(
            r#"
            [working_hours]
            start = "08:30"

            [history]
            window_days = 30
            "#,
        )
        .unwrap();
        assert_eq!(cfg.working_hours.end, ClockTime::from_hour(17));
        assert_eq!(cfg.history.window_days, 30);
        assert_eq!(cfg.history.event_limit, 200);
        assert_eq!(cfg.focus.block_title, "Focus Time");
    }

    #[test]
    fn working_hours_round_start_up() {
        let mut hours = WorkingHours::default();
        assert_eq!(hours.hour_range(), (9, 17));

        hours.start = "08:30".parse().unwrap();
        hours.end = "18:00".parse().unwrap();
        assert_eq!(hours.hour_range(), (9, 18));

        hours.enabled = false;
        assert_eq!(hours.hour_range(), (9, 17));
    }

    #[test]
    fn validate_rejects_inverted_working_hours() {
        let mut cfg = AnalyticsConfig::default();
        cfg.working_hours.start = ClockTime::from_hour(18);
        assert!(matches!(
            cfg.validate(),
            Err(ConfigError::InvalidValue { .. })
        ));
    }

    #[test]
    fn get_and_set_by_path() {
        let mut cfg = AnalyticsConfig::default();
        assert_eq!(cfg.get("conflicts.near_miss_minutes").as_deref(), Some("15"));
        assert_eq!(cfg.get("working_hours.start").as_deref(), Some("09:00"));

        cfg.set("conflicts.near_miss_minutes", "20").unwrap();
        assert_eq!(cfg.conflicts.near_miss_minutes, 20);

        cfg.set("working_hours.start", "07:00").unwrap();
        assert_eq!(cfg.working_hours.start, ClockTime::from_hour(7));

        assert!(cfg.set("conflicts.nope", "1").is_err());
        assert!(cfg.set("working_hours.start", "19:00").is_err());
        assert_eq!(cfg.working_hours.start, ClockTime::from_hour(7));
    }
}

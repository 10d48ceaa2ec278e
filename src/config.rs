use crate::attendance::DateWindow;
use crate::clock::{self, SlotTime};
use crate::timetable::GridSpec;
use chrono::{FixedOffset, Offset, Utc};
use serde::{Deserialize, Serialize};
use std::env;
use thiserror::Error;

const MAX_OFFSET_MINUTES: i32 = 14 * 60;

fn offset_in_range(minutes: i32) -> bool {
    (-MAX_OFFSET_MINUTES..=MAX_OFFSET_MINUTES).contains(&minutes)
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("utcOffsetMinutes must be within ±840, got {0}")]
    OffsetOutOfRange(i32),
    #[error("gridStart {start} must be before gridEnd {end}")]
    EmptyGrid { start: SlotTime, end: SlotTime },
    #[error("gridStepMinutes must be positive")]
    ZeroStep,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CampusConfig {
    pub utc_offset_minutes: i32,
    pub default_window: DateWindow,
    pub grid_start: SlotTime,
    pub grid_end: SlotTime,
    pub grid_step_minutes: u16,
    #[serde(skip)]
    pub log_filter: String,
}

fn default_grid_start() -> SlotTime {
    SlotTime::from_minutes(8 * 60).unwrap_or_default()
}

fn default_grid_end() -> SlotTime {
    SlotTime::from_minutes(18 * 60).unwrap_or_default()
}

impl Default for CampusConfig {
    fn default() -> Self {
        Self {
            utc_offset_minutes: 0,
            default_window: DateWindow::All,
            grid_start: default_grid_start(),
            grid_end: default_grid_end(),
            grid_step_minutes: 60,
            log_filter: "warn".to_string(),
        }
    }
}

impl CampusConfig {
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds a config from a key lookup, falling back to defaults for values
    /// that are absent or do not parse.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let mut cfg = Self {
            utc_offset_minutes: lookup("CAMPUSD_UTC_OFFSET_MINUTES")
                .and_then(|v| v.trim().parse().ok())
                .filter(|m: &i32| offset_in_range(*m))
                .unwrap_or(defaults.utc_offset_minutes),
            default_window: lookup("CAMPUSD_DEFAULT_WINDOW")
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.default_window),
            grid_start: lookup("CAMPUSD_GRID_START")
                .and_then(|v| SlotTime::parse(v.trim()))
                .unwrap_or(defaults.grid_start),
            grid_end: lookup("CAMPUSD_GRID_END")
                .and_then(|v| SlotTime::parse(v.trim()))
                .unwrap_or(defaults.grid_end),
            grid_step_minutes: lookup("CAMPUSD_GRID_STEP_MINUTES")
                .and_then(|v| v.trim().parse().ok())
                .filter(|s: &u16| *s > 0)
                .unwrap_or(defaults.grid_step_minutes),
            log_filter: lookup("CAMPUSD_LOG")
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
                .unwrap_or(defaults.log_filter),
        };
        if cfg.grid_start >= cfg.grid_end {
            tracing::warn!(
                grid_start = %cfg.grid_start,
                grid_end = %cfg.grid_end,
                "ignoring empty timetable grid from environment"
            );
            cfg.grid_start = defaults.grid_start;
            cfg.grid_end = defaults.grid_end;
        }
        cfg
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !offset_in_range(self.utc_offset_minutes) {
            return Err(ConfigError::OffsetOutOfRange(self.utc_offset_minutes));
        }
        if self.grid_start >= self.grid_end {
            return Err(ConfigError::EmptyGrid {
                start: self.grid_start,
                end: self.grid_end,
            });
        }
        if self.grid_step_minutes == 0 {
            return Err(ConfigError::ZeroStep);
        }
        Ok(())
    }

    pub fn offset(&self) -> FixedOffset {
        clock::offset_from_minutes(self.utc_offset_minutes).unwrap_or_else(|| Utc.fix())
    }

    pub fn grid(&self) -> GridSpec {
        GridSpec {
            start: self.grid_start,
            end: self.grid_end,
            step_minutes: self.grid_step_minutes,
        }
    }

    /// Returns the config with `patch` applied, or the reason it would be
    /// invalid. `self` is never modified.
    pub fn patched(&self, patch: &SetupPatch) -> Result<CampusConfig, ConfigError> {
        let mut next = self.clone();
        if let Some(v) = patch.utc_offset_minutes {
            next.utc_offset_minutes = v;
        }
        if let Some(v) = patch.default_window {
            next.default_window = v;
        }
        if let Some(v) = patch.grid_start {
            next.grid_start = v;
        }
        if let Some(v) = patch.grid_end {
            next.grid_end = v;
        }
        if let Some(v) = patch.grid_step_minutes {
            next.grid_step_minutes = v;
        }
        next.validate()?;
        Ok(next)
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct SetupPatch {
    pub utc_offset_minutes: Option<i32>,
    pub default_window: Option<DateWindow>,
    pub grid_start: Option<SlotTime>,
    pub grid_end: Option<SlotTime>,
    pub grid_step_minutes: Option<u16>,
}

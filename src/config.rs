use std::collections::BTreeSet;
use std::path::PathBuf;

use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::Serialize;
use thiserror::Error;

use crate::calendar::{format_hhmm, parse_hhmm, BusinessCalendar, MINUTES_PER_DAY};
use crate::model::BookingType;

pub const DEFAULT_TIMEZONE: &str = "Europe/Oslo";
pub const DEFAULT_CUTOFF_MINUTES: u32 = 60;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{var}={value:?}: {reason}")]
    Invalid {
        var: &'static str,
        value: String,
        reason: String,
    },
    #[error("{0} has no ramps")]
    NoRamps(BookingType),
    #[error("ramp {0} is configured for both LOADING and UNLOADING")]
    SharedRamp(u32),
    #[error("{0} slot duration must be positive")]
    ZeroSlot(BookingType),
    #[error("{kind} window {window} does not fit a single {slot_minutes}-minute slot")]
    WindowTooShort {
        kind: BookingType,
        window: DailyWindow,
        slot_minutes: u32,
    },
}

/// Daily opening window as minutes past local midnight, `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyWindow {
    pub start_minute: u32,
    pub end_minute: u32,
}

impl DailyWindow {
    pub fn new(start_minute: u32, end_minute: u32) -> Self {
        Self { start_minute, end_minute }
    }

    /// Parse `HH:MM-HH:MM`.
    pub fn parse(s: &str) -> Option<Self> {
        let (start, end) = s.split_once('-')?;
        let window = Self::new(parse_hhmm(start).ok()?, parse_hhmm(end).ok()?);
        (window.start_minute < window.end_minute).then_some(window)
    }

    pub fn len_minutes(&self) -> u32 {
        self.end_minute.saturating_sub(self.start_minute)
    }
}

impl std::fmt::Display for DailyWindow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}-{}", format_hhmm(self.start_minute), format_hhmm(self.end_minute))
    }
}

/// Ramps, slot length and opening window for one booking type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RampConfig {
    /// Sorted ascending, no duplicates.
    pub ramps: Vec<u32>,
    pub slot_minutes: u32,
    pub window: DailyWindow,
}

impl RampConfig {
    pub fn new(ramps: impl IntoIterator<Item = u32>, slot_minutes: u32, window: DailyWindow) -> Self {
        let ramps: BTreeSet<u32> = ramps.into_iter().collect();
        Self {
            ramps: ramps.into_iter().collect(),
            slot_minutes,
            window,
        }
    }

    pub fn has_ramp(&self, ramp: u32) -> bool {
        self.ramps.binary_search(&ramp).is_ok()
    }

    pub fn slot_duration(&self) -> Duration {
        Duration::minutes(self.slot_minutes as i64)
    }

    /// Whole slots that fit in the window; partial trailing slots are dropped.
    pub fn slots_per_day(&self) -> u32 {
        if self.slot_minutes == 0 {
            return 0;
        }
        self.window.len_minutes() / self.slot_minutes
    }

    /// Slot start offsets (minutes past midnight), ascending.
    pub fn slot_starts(&self) -> impl Iterator<Item = u32> + '_ {
        (0..self.slots_per_day()).map(move |k| self.window.start_minute + k * self.slot_minutes)
    }

    /// True if a slot starting at `minute` is on the grid and ends inside the window.
    pub fn is_slot_start(&self, minute: u32) -> bool {
        self.slot_minutes > 0
            && minute >= self.window.start_minute
            && minute + self.slot_minutes <= self.window.end_minute
            && (minute - self.window.start_minute) % self.slot_minutes == 0
    }
}

/// The terminal: timezone, cutoff and per-type ramp configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TerminalConfig {
    pub calendar: BusinessCalendar,
    pub cutoff_minutes: u32,
    pub loading: RampConfig,
    pub unloading: RampConfig,
}

impl Default for TerminalConfig {
    fn default() -> Self {
        Self {
            calendar: BusinessCalendar::new(chrono_tz::Europe::Oslo),
            cutoff_minutes: DEFAULT_CUTOFF_MINUTES,
            loading: RampConfig::new([8, 9, 10], 60, DailyWindow::new(8 * 60, 17 * 60)),
            unloading: RampConfig::new([3, 4], 45, DailyWindow::new(8 * 60, 18 * 60)),
        }
    }
}

impl TerminalConfig {
    pub fn ramps(&self, kind: BookingType) -> &RampConfig {
        match kind {
            BookingType::Loading => &self.loading,
            BookingType::Unloading => &self.unloading,
        }
    }

    pub fn cutoff(&self) -> Duration {
        Duration::minutes(self.cutoff_minutes as i64)
    }

    /// Earliest start instant still bookable at `now`.
    pub fn cutoff_at(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        now + self.cutoff()
    }

    pub fn is_known_ramp(&self, ramp: u32) -> bool {
        self.loading.has_ramp(ramp) || self.unloading.has_ramp(ramp)
    }

    /// Opening window of `kind` on `date` as instants, `[start, end)`.
    pub fn window_bounds(&self, date: NaiveDate, kind: BookingType) -> Option<(DateTime<Utc>, DateTime<Utc>)> {
        let window = self.ramps(kind).window;
        let start = self.calendar.instant_at(date, window.start_minute)?;
        let end = self.calendar.boundary_at(date, window.end_minute)?;
        Some((start, end))
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        for kind in [BookingType::Loading, BookingType::Unloading] {
            let cfg = self.ramps(kind);
            if cfg.ramps.is_empty() {
                return Err(ConfigError::NoRamps(kind));
            }
            if cfg.slot_minutes == 0 {
                return Err(ConfigError::ZeroSlot(kind));
            }
            if cfg.window.end_minute > MINUTES_PER_DAY || cfg.slots_per_day() == 0 {
                return Err(ConfigError::WindowTooShort {
                    kind,
                    window: cfg.window,
                    slot_minutes: cfg.slot_minutes,
                });
            }
        }
        if let Some(shared) = self.loading.ramps.iter().find(|r| self.unloading.has_ramp(**r)) {
            return Err(ConfigError::SharedRamp(*shared));
        }
        Ok(())
    }

    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup, starting from the defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Some(name) = lookup("DOCKSLOT_TIMEZONE") {
            config.calendar = BusinessCalendar::from_name(&name).map_err(|e| ConfigError::Invalid {
                var: "DOCKSLOT_TIMEZONE",
                value: name.clone(),
                reason: e.to_string(),
            })?;
        }
        if let Some(v) = lookup("DOCKSLOT_CUTOFF_MINUTES") {
            config.cutoff_minutes = parse_number("DOCKSLOT_CUTOFF_MINUTES", &v)?;
        }

        apply_ramp_overrides(
            &lookup,
            &mut config.loading,
            ["DOCKSLOT_LOADING_RAMPS", "DOCKSLOT_LOADING_SLOT_MINUTES", "DOCKSLOT_LOADING_WINDOW"],
        )?;
        apply_ramp_overrides(
            &lookup,
            &mut config.unloading,
            ["DOCKSLOT_UNLOADING_RAMPS", "DOCKSLOT_UNLOADING_SLOT_MINUTES", "DOCKSLOT_UNLOADING_WINDOW"],
        )?;

        config.validate()?;
        Ok(config)
    }
}

fn apply_ramp_overrides(
    lookup: &impl Fn(&str) -> Option<String>,
    cfg: &mut RampConfig,
    [ramps_var, slot_var, window_var]: [&'static str; 3],
) -> Result<(), ConfigError> {
    if let Some(v) = lookup(ramps_var) {
        let ramps = v
            .split(',')
            .map(|r| parse_number(ramps_var, r))
            .collect::<Result<Vec<u32>, _>>()?;
        *cfg = RampConfig::new(ramps, cfg.slot_minutes, cfg.window);
    }
    if let Some(v) = lookup(slot_var) {
        cfg.slot_minutes = parse_number(slot_var, &v)?;
    }
    if let Some(v) = lookup(window_var) {
        cfg.window = DailyWindow::parse(&v).ok_or_else(|| ConfigError::Invalid {
            var: window_var,
            value: v.clone(),
            reason: "expected HH:MM-HH:MM with start before end".into(),
        })?;
    }
    Ok(())
}

fn parse_number(var: &'static str, value: &str) -> Result<u32, ConfigError> {
    value.trim().parse().map_err(|e: std::num::ParseIntError| ConfigError::Invalid {
        var,
        value: value.to_string(),
        reason: e.to_string(),
    })
}

/// Process-level settings for the HTTP server.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub bind: String,
    pub port: u16,
    pub data_dir: PathBuf,
    pub metrics_port: Option<u16>,
    pub users_file: PathBuf,
    pub notify_webhook: Option<String>,
    pub mail_bcc: Option<String>,
    pub compact_threshold: u64,
}

impl ServerConfig {
    pub fn from_env() -> Self {
        let var = |key: &str| std::env::var(key).ok().filter(|v| !v.trim().is_empty());
        Self {
            bind: var("DOCKSLOT_BIND").unwrap_or_else(|| "0.0.0.0".into()),
            port: var("DOCKSLOT_PORT").and_then(|s| s.parse().ok()).unwrap_or(3000),
            data_dir: var("DOCKSLOT_DATA_DIR").unwrap_or_else(|| "./data".into()).into(),
            metrics_port: var("DOCKSLOT_METRICS_PORT").and_then(|s| s.parse().ok()),
            users_file: var("DOCKSLOT_USERS_FILE").unwrap_or_else(|| "./users.json".into()).into(),
            notify_webhook: var("DOCKSLOT_NOTIFY_WEBHOOK"),
            mail_bcc: var("DOCKSLOT_MAIL_BCC"),
            compact_threshold: var("DOCKSLOT_COMPACT_THRESHOLD")
                .and_then(|s| s.parse().ok())
                .unwrap_or(1000),
        }
    }
}

//! Business-timezone time handling.
//!
//! Every window, weekday and cutoff computation in the crate goes through
//! [`BusinessCalendar`]. Instants are `DateTime<Utc>` everywhere else; the only
//! wall-clock conversions happen here.

use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveTime, TimeZone, Timelike, Utc, Weekday};
use chrono_tz::Tz;
use thiserror::Error;

pub const MINUTES_PER_DAY: u32 = 24 * 60;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CalendarError {
    #[error("invalid date {0:?}, expected YYYY-MM-DD")]
    InvalidDate(String),
    #[error("invalid time {0:?}, expected HH:MM")]
    InvalidTime(String),
    #[error("unknown timezone {0:?}")]
    UnknownTimezone(String),
}

/// The terminal's fixed local timezone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BusinessCalendar {
    tz: Tz,
}

impl BusinessCalendar {
    pub fn new(tz: Tz) -> Self {
        Self { tz }
    }

    pub fn from_name(name: &str) -> Result<Self, CalendarError> {
        name.trim()
            .parse::<Tz>()
            .map(Self::new)
            .map_err(|_| CalendarError::UnknownTimezone(name.to_string()))
    }

    pub fn timezone(&self) -> Tz {
        self.tz
    }

    /// Instant at `minute` past local midnight of `date`.
    ///
    /// Returns `None` when that wall-clock time does not exist (DST gap) or
    /// `minute` is past the end of the day. Ambiguous times resolve to the
    /// earlier instant.
    pub fn instant_at(&self, date: NaiveDate, minute: u32) -> Option<DateTime<Utc>> {
        if minute >= MINUTES_PER_DAY {
            return None;
        }
        let time = NaiveTime::from_hms_opt(minute / 60, minute % 60, 0)?;
        self.tz
            .from_local_datetime(&date.and_time(time))
            .earliest()
            .map(|t| t.with_timezone(&Utc))
    }

    /// Instant of `minute` past local midnight, where `minute == MINUTES_PER_DAY`
    /// means the next local midnight. Used for window end bounds.
    pub fn boundary_at(&self, date: NaiveDate, minute: u32) -> Option<DateTime<Utc>> {
        if minute == MINUTES_PER_DAY {
            return self.start_of_day(date.succ_opt()?);
        }
        self.instant_at(date, minute)
    }

    /// First existing instant of the local day. Local midnight in zones that
    /// skip it falls forward to the first valid minute.
    pub fn start_of_day(&self, date: NaiveDate) -> Option<DateTime<Utc>> {
        (0..180).find_map(|minute| self.instant_at(date, minute))
    }

    /// `[start of date, start of date + days)` in instants.
    pub fn day_range(&self, date: NaiveDate, days: u32) -> Option<(DateTime<Utc>, DateTime<Utc>)> {
        let start = self.start_of_day(date)?;
        let end = self.start_of_day(date.checked_add_days(chrono::Days::new(days as u64))?)?;
        Some((start, end))
    }

    pub fn local_date(&self, instant: DateTime<Utc>) -> NaiveDate {
        instant.with_timezone(&self.tz).date_naive()
    }

    pub fn minute_of_day(&self, instant: DateTime<Utc>) -> u32 {
        let local = instant.with_timezone(&self.tz);
        local.hour() * 60 + local.minute()
    }

    /// True when the instant sits exactly on a local minute boundary.
    pub fn is_whole_minute(&self, instant: DateTime<Utc>) -> bool {
        let local = instant.with_timezone(&self.tz);
        local.second() == 0 && local.nanosecond() == 0
    }

    pub fn today(&self, now: DateTime<Utc>) -> NaiveDate {
        self.local_date(now)
    }

    pub fn format(&self, instant: DateTime<Utc>, fmt: &str) -> String {
        instant.with_timezone(&self.tz).format(fmt).to_string()
    }
}

pub fn is_weekend(date: NaiveDate) -> bool {
    matches!(date.weekday(), Weekday::Sat | Weekday::Sun)
}

pub fn parse_date(s: &str) -> Result<NaiveDate, CalendarError> {
    NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d")
        .map_err(|_| CalendarError::InvalidDate(s.to_string()))
}

/// Parse `HH:MM` into a minute of day. `24:00` is accepted as end of day.
pub fn parse_hhmm(s: &str) -> Result<u32, CalendarError> {
    let invalid = || CalendarError::InvalidTime(s.to_string());
    let (h, m) = s.trim().split_once(':').ok_or_else(invalid)?;
    if h.is_empty() || h.len() > 2 || m.len() != 2 {
        return Err(invalid());
    }
    let hours: u32 = h.parse().map_err(|_| invalid())?;
    let minutes: u32 = m.parse().map_err(|_| invalid())?;
    if minutes >= 60 {
        return Err(invalid());
    }
    let total = hours * 60 + minutes;
    if total > MINUTES_PER_DAY {
        return Err(invalid());
    }
    Ok(total)
}

pub fn format_hhmm(minute: u32) -> String {
    format!("{:02}:{:02}", minute / 60, minute % 60)
}

/// Source of "now". Injected so cutoff behaviour is testable.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// A clock pinned to one instant.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock {
    now: DateTime<Utc>,
}

impl FixedClock {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self { now }
    }

    pub fn advanced(&self, by: Duration) -> Self {
        Self { now: self.now + by }
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.now
    }
}

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use ulid::Ulid;

/// Which ramp set, slot length and window applies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BookingType {
    Loading,
    Unloading,
}

impl BookingType {
    pub fn as_str(&self) -> &'static str {
        match self {
            BookingType::Loading => "LOADING",
            BookingType::Unloading => "UNLOADING",
        }
    }
}

impl fmt::Display for BookingType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BookingType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "LOADING" => Ok(BookingType::Loading),
            "UNLOADING" => Ok(BookingType::Unloading),
            other => Err(other.to_string()),
        }
    }
}

/// Booking types a closure applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ClosureScope {
    Loading,
    Unloading,
    Both,
}

impl ClosureScope {
    pub fn applies_to(&self, kind: BookingType) -> bool {
        matches!(
            (self, kind),
            (ClosureScope::Both, _)
                | (ClosureScope::Loading, BookingType::Loading)
                | (ClosureScope::Unloading, BookingType::Unloading)
        )
    }
}

impl FromStr for ClosureScope {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "LOADING" => Ok(ClosureScope::Loading),
            "UNLOADING" => Ok(ClosureScope::Unloading),
            "BOTH" => Ok(ClosureScope::Both),
            other => Err(other.to_string()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GoodsType {
    Ifco,
    GenCargo,
}

impl GoodsType {
    pub fn as_str(&self) -> &'static str {
        match self {
            GoodsType::Ifco => "IFCO",
            GoodsType::GenCargo => "GEN_CARGO",
        }
    }
}

impl FromStr for GoodsType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "IFCO" => Ok(GoodsType::Ifco),
            "GEN_CARGO" => Ok(GoodsType::GenCargo),
            other => Err(other.to_string()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    Admin,
    User,
}

/// An authenticated caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub id: String,
    pub role: Role,
    pub email: String,
}

impl Identity {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

/// Requester details attached to a booking.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookingDetails {
    pub reg_nr: String,
    pub company: String,
    pub email: String,
    pub phone: String,
    pub goods_type: GoodsType,
    pub reference: Option<String>,
}

/// A validated booking request, before it is written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewBooking {
    pub kind: BookingType,
    pub ramp_number: u32,
    pub start: DateTime<Utc>,
    pub details: BookingDetails,
}

/// A claimed (ramp, start) cell. Never mutated after creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Booking {
    pub id: Ulid,
    #[serde(rename = "type")]
    pub kind: BookingType,
    pub ramp_number: u32,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub reg_nr: String,
    pub company: String,
    pub email: String,
    pub phone: String,
    pub goods_type: GoodsType,
    pub reference: Option<String>,
    pub user_id: String,
    pub created_at: DateTime<Utc>,
}

/// An administrative closure on one local day.
///
/// `start_minute == None` closes the whole day and `duration_minutes` is
/// ignored. `duration_minutes == None` runs to midnight.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClosureInterval {
    pub id: Ulid,
    pub date: NaiveDate,
    #[serde(rename = "type")]
    pub scope: ClosureScope,
    pub ramp_number: Option<u32>,
    pub start_minute: Option<u32>,
    pub duration_minutes: Option<u32>,
    pub reason: Option<String>,
}

/// Wall-clock position given either as minutes past midnight or as `HH:MM`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TimeOfDay {
    Minutes(u32),
    Clock(String),
}

/// How a timed closure ends.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClosureEnd {
    Duration(u32),
    At(TimeOfDay),
}

/// Closure creation request. `scope` is the raw type string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewClosure {
    pub date: NaiveDate,
    pub scope: String,
    pub ramp_number: Option<u32>,
    pub start: Option<TimeOfDay>,
    pub end: Option<ClosureEnd>,
    pub reason: Option<String>,
}

/// One generated (ramp, interval) cell of the daily grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GridCell {
    pub ramp_number: u32,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SlotStatus {
    Free,
    Booked,
    Closed,
}

/// A grid cell with its computed status. Recomputed on every query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Slot {
    pub ramp_number: u32,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub status: SlotStatus,
    pub booking_id: Option<Ulid>,
    pub expired: bool,
    pub closed_reason: Option<String>,
}

/// WAL record format.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Event {
    BookingCreated(Booking),
    BookingDeleted { id: Ulid },
    ClosureCreated(ClosureInterval),
    ClosureDeleted { id: Ulid },
}

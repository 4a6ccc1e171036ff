use chrono::{DateTime, NaiveDate, Utc};
use thiserror::Error;
use ulid::Ulid;

use crate::model::BookingType;
use crate::store::StoreError;

/// Why an input was refused. `reason()` is the stable code callers see.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Rejection {
    #[error("missing required field `{0}`")]
    MissingField(&'static str),
    #[error("invalid {field}: {detail}")]
    InvalidInput { field: &'static str, detail: String },
    #[error("unknown type {0:?}")]
    InvalidType(String),
    #[error("ramp {ramp} is not a {kind} ramp")]
    UnknownRamp { kind: BookingType, ramp: u32 },
    #[error("{start} is not a {kind} slot start")]
    OutsideWindow { kind: BookingType, start: DateTime<Utc> },
    #[error("{0} is a weekend")]
    Weekend(NaiveDate),
    #[error("slot is closed{}", .0.as_deref().map(|r| format!(": {r}")).unwrap_or_default())]
    Closed(Option<String>),
    #[error("end time must be after start time")]
    InvalidTimeRange,
}

impl Rejection {
    pub fn reason(&self) -> &'static str {
        match self {
            Rejection::MissingField(_) => "missing-field",
            Rejection::InvalidInput { .. } => "invalid-input",
            Rejection::InvalidType(_) => "invalid-type",
            Rejection::UnknownRamp { .. } | Rejection::OutsideWindow { .. } => "invalid-slot",
            Rejection::Weekend(_) => "weekend",
            Rejection::Closed(_) => "closed",
            Rejection::InvalidTimeRange => "invalid-time-range",
        }
    }

    pub fn invalid(field: &'static str, detail: impl ToString) -> Self {
        Rejection::InvalidInput {
            field,
            detail: detail.to_string(),
        }
    }
}

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("validation failed: {0}")]
    Validation(#[from] Rejection),
    #[error("too late to book: slot starts {start}, earliest bookable start is {cutoff}")]
    Cutoff {
        start: DateTime<Utc>,
        cutoff: DateTime<Utc>,
    },
    #[error("slot already booked: ramp {ramp} at {start}")]
    Conflict { ramp: u32, start: DateTime<Utc> },
    #[error("not found: {0}")]
    NotFound(Ulid),
    #[error("store failure: {0}")]
    Store(String),
}

impl EngineError {
    pub fn reason(&self) -> &'static str {
        match self {
            EngineError::Validation(r) => r.reason(),
            EngineError::Cutoff { .. } => "too-late",
            EngineError::Conflict { .. } => "already-booked",
            EngineError::NotFound(_) => "not-found",
            EngineError::Store(_) => "internal",
        }
    }

    /// Cutoff is a validation failure with its own reason.
    pub fn is_validation(&self) -> bool {
        matches!(self, EngineError::Validation(_) | EngineError::Cutoff { .. })
    }
}

impl From<StoreError> for EngineError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::Conflict { ramp, start } => EngineError::Conflict { ramp, start },
            StoreError::NotFound(id) => EngineError::NotFound(id),
            StoreError::Wal(e) => EngineError::Store(e.to_string()),
            StoreError::Aborted(e) => EngineError::Store(e),
        }
    }
}

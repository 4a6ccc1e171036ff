//! Persistence for bookings and closures.
//!
//! The engine only talks to [`BookingStore`]. Uniqueness of `(ramp, start)` is
//! the store's job: `insert_booking` must fail with [`StoreError::Conflict`]
//! when the cell is taken, atomically with respect to concurrent inserts.

mod wal_store;

pub use wal_store::WalStore;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use thiserror::Error;
use ulid::Ulid;

use crate::model::{Booking, BookingType, ClosureInterval};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("ramp {ramp} at {start} is already booked")]
    Conflict { ramp: u32, start: DateTime<Utc> },
    #[error("not found: {0}")]
    NotFound(Ulid),
    #[error("WAL error: {0}")]
    Wal(#[from] crate::wal::WalError),
    #[error("write task failed: {0}")]
    Aborted(String),
}

#[async_trait]
pub trait BookingStore: Send + Sync {
    /// Bookings with `from <= start < to`, optionally of one type, ordered by (start, ramp).
    async fn find_bookings(
        &self,
        kind: Option<BookingType>,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<Booking>, StoreError>;

    async fn find_booking_by_ramp_and_start(
        &self,
        ramp: u32,
        start: DateTime<Utc>,
    ) -> Result<Option<Booking>, StoreError>;

    async fn insert_booking(&self, booking: Booking) -> Result<Booking, StoreError>;

    async fn delete_booking(&self, id: Ulid) -> Result<Booking, StoreError>;

    /// Closures on `date` whose scope covers `kind`, in creation order.
    async fn find_closures(
        &self,
        date: NaiveDate,
        kind: BookingType,
    ) -> Result<Vec<ClosureInterval>, StoreError>;

    /// Closures with `from <= date <= to`, ordered by date then creation.
    async fn list_closures(
        &self,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<ClosureInterval>, StoreError>;

    async fn insert_closure(&self, closure: ClosureInterval) -> Result<ClosureInterval, StoreError>;

    async fn delete_closure(&self, id: Ulid) -> Result<ClosureInterval, StoreError>;
}

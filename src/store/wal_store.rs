use std::future::Future;
use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use tokio::sync::RwLock;
use tracing::info;
use ulid::Ulid;

use crate::model::{Booking, BookingType, ClosureInterval, Event};
use crate::wal::{Wal, WalWriter};

use super::{BookingStore, StoreError};

type Cell = (u32, DateTime<Utc>);

/// In-memory indexes made durable by a write-ahead log.
///
/// `cells` is the unique index on `(ramp, start)`. A booking insert claims its
/// cell through the entry API before the WAL append; the claim is released
/// if the append fails.
///
/// Writes run on their own task, so the indexes and the log stay in step
/// even when the caller's future is dropped halfway through.
pub struct WalStore {
    state: Arc<State>,
}

struct State {
    bookings: DashMap<Ulid, Booking>,
    cells: DashMap<Cell, Ulid>,
    closures: DashMap<Ulid, ClosureInterval>,
    wal: WalWriter,
    /// Writers hold it shared; compaction holds it exclusively while it snapshots.
    gate: RwLock<()>,
}

/// Run a write to completion regardless of whether the caller keeps polling.
async fn detached<T, F>(write: F) -> Result<T, StoreError>
where
    T: Send + 'static,
    F: Future<Output = Result<T, StoreError>> + Send + 'static,
{
    tokio::spawn(write)
        .await
        .map_err(|e| StoreError::Aborted(e.to_string()))?
}

impl WalStore {
    /// Replay `path` and start the WAL writer. Must be called inside a tokio runtime.
    pub fn open(path: &Path) -> std::io::Result<Self> {
        let events = Wal::replay(path)?;
        let wal = WalWriter::spawn(Wal::open(path)?);
        let state = State {
            bookings: DashMap::new(),
            cells: DashMap::new(),
            closures: DashMap::new(),
            wal,
            gate: RwLock::new(()),
        };
        for event in events {
            state.apply(event);
        }
        info!(
            "store opened: {} bookings, {} closures from {}",
            state.bookings.len(),
            state.closures.len(),
            path.display()
        );
        Ok(Self {
            state: Arc::new(state),
        })
    }

    pub fn booking_count(&self) -> usize {
        self.state.bookings.len()
    }

    pub async fn appends_since_compact(&self) -> u64 {
        self.state.wal.appends_since_compact().await
    }

    /// Rewrite the log as one create event per live record.
    pub async fn compact(&self) -> Result<(), StoreError> {
        let state = Arc::clone(&self.state);
        detached(async move { state.compact().await }).await
    }
}

impl State {
    fn apply(&self, event: Event) {
        match event {
            Event::BookingCreated(booking) => {
                self.cells.insert((booking.ramp_number, booking.start), booking.id);
                self.bookings.insert(booking.id, booking);
            }
            Event::BookingDeleted { id } => {
                if let Some((_, booking)) = self.bookings.remove(&id) {
                    self.cells.remove(&(booking.ramp_number, booking.start));
                }
            }
            Event::ClosureCreated(closure) => {
                self.closures.insert(closure.id, closure);
            }
            Event::ClosureDeleted { id } => {
                self.closures.remove(&id);
            }
        }
    }

    async fn compact(&self) -> Result<(), StoreError> {
        let _exclusive = self.gate.write().await;
        let mut closures: Vec<ClosureInterval> = self.closures.iter().map(|e| e.value().clone()).collect();
        closures.sort_by_key(|c| c.id);
        let mut bookings: Vec<Booking> = self.bookings.iter().map(|e| e.value().clone()).collect();
        bookings.sort_by_key(|b| b.id);

        let events: Vec<Event> = closures
            .into_iter()
            .map(Event::ClosureCreated)
            .chain(bookings.into_iter().map(Event::BookingCreated))
            .collect();
        let count = events.len();
        self.wal.compact(events).await?;
        info!("WAL compacted to {count} events");
        Ok(())
    }

    async fn insert_booking(&self, booking: Booking) -> Result<Booking, StoreError> {
        let _shared = self.gate.read().await;
        let cell = (booking.ramp_number, booking.start);
        // The entry guard must be released before awaiting the WAL.
        match self.cells.entry(cell) {
            Entry::Occupied(_) => {
                return Err(StoreError::Conflict {
                    ramp: booking.ramp_number,
                    start: booking.start,
                });
            }
            Entry::Vacant(slot) => {
                slot.insert(booking.id);
            }
        }

        if let Err(e) = self.wal.append(Event::BookingCreated(booking.clone())).await {
            self.cells.remove(&cell);
            return Err(e.into());
        }
        self.bookings.insert(booking.id, booking.clone());
        Ok(booking)
    }

    async fn delete_booking(&self, id: Ulid) -> Result<Booking, StoreError> {
        let _shared = self.gate.read().await;
        let (_, booking) = self.bookings.remove(&id).ok_or(StoreError::NotFound(id))?;
        if let Err(e) = self.wal.append(Event::BookingDeleted { id }).await {
            self.bookings.insert(id, booking);
            return Err(e.into());
        }
        self.cells.remove(&(booking.ramp_number, booking.start));
        Ok(booking)
    }

    async fn insert_closure(&self, closure: ClosureInterval) -> Result<ClosureInterval, StoreError> {
        let _shared = self.gate.read().await;
        self.wal.append(Event::ClosureCreated(closure.clone())).await?;
        self.closures.insert(closure.id, closure.clone());
        Ok(closure)
    }

    async fn delete_closure(&self, id: Ulid) -> Result<ClosureInterval, StoreError> {
        let _shared = self.gate.read().await;
        let (_, closure) = self.closures.remove(&id).ok_or(StoreError::NotFound(id))?;
        if let Err(e) = self.wal.append(Event::ClosureDeleted { id }).await {
            self.closures.insert(id, closure);
            return Err(e.into());
        }
        Ok(closure)
    }
}

#[async_trait]
impl BookingStore for WalStore {
    async fn find_bookings(
        &self,
        kind: Option<BookingType>,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<Booking>, StoreError> {
        let mut found: Vec<Booking> = self
            .state
            .bookings
            .iter()
            .filter(|e| {
                let b = e.value();
                kind.is_none_or(|k| b.kind == k) && b.start >= from && b.start < to
            })
            .map(|e| e.value().clone())
            .collect();
        found.sort_by_key(|b| (b.start, b.ramp_number));
        Ok(found)
    }

    async fn find_booking_by_ramp_and_start(
        &self,
        ramp: u32,
        start: DateTime<Utc>,
    ) -> Result<Option<Booking>, StoreError> {
        let Some(id) = self.state.cells.get(&(ramp, start)).map(|e| *e.value()) else {
            return Ok(None);
        };
        Ok(self.state.bookings.get(&id).map(|e| e.value().clone()))
    }

    async fn insert_booking(&self, booking: Booking) -> Result<Booking, StoreError> {
        let state = Arc::clone(&self.state);
        detached(async move { state.insert_booking(booking).await }).await
    }

    async fn delete_booking(&self, id: Ulid) -> Result<Booking, StoreError> {
        let state = Arc::clone(&self.state);
        detached(async move { state.delete_booking(id).await }).await
    }

    async fn find_closures(
        &self,
        date: NaiveDate,
        kind: BookingType,
    ) -> Result<Vec<ClosureInterval>, StoreError> {
        let mut found: Vec<ClosureInterval> = self
            .state
            .closures
            .iter()
            .filter(|e| e.value().date == date && e.value().scope.applies_to(kind))
            .map(|e| e.value().clone())
            .collect();
        found.sort_by_key(|c| c.id);
        Ok(found)
    }

    async fn list_closures(
        &self,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<ClosureInterval>, StoreError> {
        let mut found: Vec<ClosureInterval> = self
            .state
            .closures
            .iter()
            .filter(|e| e.value().date >= from && e.value().date <= to)
            .map(|e| e.value().clone())
            .collect();
        found.sort_by_key(|c| (c.date, c.id));
        Ok(found)
    }

    async fn insert_closure(&self, closure: ClosureInterval) -> Result<ClosureInterval, StoreError> {
        let state = Arc::clone(&self.state);
        detached(async move { state.insert_closure(closure).await }).await
    }

    async fn delete_closure(&self, id: Ulid) -> Result<ClosureInterval, StoreError> {
        let state = Arc::clone(&self.state);
        detached(async move { state.delete_closure(id).await }).await
    }
}

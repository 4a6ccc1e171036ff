//! Booking engine: grid generation, closure resolution, availability
//! assembly, booking and closure writes.
//!
//! The pure parts (`generate_grid`, `resolve`, `assemble`, `validate_slot`)
//! take configuration explicitly. [`Engine`] wires them to a
//! [`BookingStore`], a [`Notifier`] and a [`Clock`].

mod availability;
mod booking;
mod closure;
mod closures;
mod error;
mod grid;

pub use availability::assemble;
pub use booking::{normalize_details, validate_slot};
pub use closure::{effective_duration, resolve};
pub use closures::{normalize_closure, MAX_REASON_CHARS};
pub use error::{EngineError, Rejection};
pub use grid::generate_grid;

use std::sync::{Arc, Mutex};

use chrono::{DateTime, NaiveDate, Utc};
use ulid::{Generator, Ulid};

use crate::calendar::Clock;
use crate::config::TerminalConfig;
use crate::notify::Notifier;
use crate::store::BookingStore;

pub struct Engine {
    config: Arc<TerminalConfig>,
    store: Arc<dyn BookingStore>,
    notifier: Arc<dyn Notifier>,
    clock: Arc<dyn Clock>,
    /// Closure ids are monotonic so id order is creation order.
    closure_ids: Mutex<Generator>,
}

impl Engine {
    pub fn new(
        config: TerminalConfig,
        store: Arc<dyn BookingStore>,
        notifier: Arc<dyn Notifier>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            config: Arc::new(config),
            store,
            notifier,
            clock,
            closure_ids: Mutex::new(Generator::new()),
        }
    }

    pub fn config(&self) -> &TerminalConfig {
        &self.config
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    fn next_closure_id(&self) -> Ulid {
        let mut ids = self.closure_ids.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        ids.generate().unwrap_or_else(|_| Ulid::new())
    }

    /// Today's date in the business timezone.
    pub fn today(&self) -> NaiveDate {
        self.config.calendar.today(self.clock.now())
    }
}

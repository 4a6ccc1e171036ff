use std::collections::HashMap;

use chrono::{DateTime, NaiveDate, Utc};
use tracing::debug;

use crate::calendar::BusinessCalendar;
use crate::model::*;

use super::closure::resolve;
use super::grid::generate_grid;
use super::{Engine, EngineError};

// ── Availability Algorithm ────────────────────────────────────────

/// Classify every grid cell against one snapshot of bookings and closures.
///
/// Precedence per cell: BOOKED (exact ramp + start match), then CLOSED
/// (closures already filtered to the cell's type), then FREE. Closed cells
/// are always expired; other cells expire when they start before `cutoff`.
pub fn assemble(
    calendar: &BusinessCalendar,
    cells: &[GridCell],
    bookings: &[Booking],
    closures: &[ClosureInterval],
    cutoff: DateTime<Utc>,
) -> Vec<Slot> {
    let booked: HashMap<(u32, DateTime<Utc>), &Booking> = bookings
        .iter()
        .map(|b| ((b.ramp_number, b.start), b))
        .collect();

    cells
        .iter()
        .map(|cell| {
            let expired = cell.start < cutoff;
            if let Some(booking) = booked.get(&(cell.ramp_number, cell.start)) {
                return Slot {
                    ramp_number: cell.ramp_number,
                    start: cell.start,
                    end: cell.end,
                    status: SlotStatus::Booked,
                    booking_id: Some(booking.id),
                    expired,
                    closed_reason: None,
                };
            }
            let minute = calendar.minute_of_day(cell.start);
            match resolve(closures, cell.ramp_number, minute) {
                Some(closure) => Slot {
                    ramp_number: cell.ramp_number,
                    start: cell.start,
                    end: cell.end,
                    status: SlotStatus::Closed,
                    booking_id: None,
                    expired: true,
                    closed_reason: closure.reason.clone(),
                },
                None => Slot {
                    ramp_number: cell.ramp_number,
                    start: cell.start,
                    end: cell.end,
                    status: SlotStatus::Free,
                    booking_id: None,
                    expired,
                    closed_reason: None,
                },
            }
        })
        .collect()
}

impl Engine {
    /// Per-cell status for `kind` on the local day `date`.
    pub async fn availability(&self, date: NaiveDate, kind: BookingType) -> Result<Vec<Slot>, EngineError> {
        metrics::counter!(crate::observability::AVAILABILITY_QUERIES_TOTAL, "type" => kind.as_str())
            .increment(1);

        let cells = generate_grid(&self.config, date, kind);
        if cells.is_empty() {
            return Ok(Vec::new());
        }
        let Some((open, close)) = self.config.window_bounds(date, kind) else {
            return Ok(Vec::new());
        };

        // One snapshot for the whole grid.
        let (bookings, closures) = tokio::try_join!(
            self.store.find_bookings(Some(kind), open, close),
            self.store.find_closures(date, kind),
        )?;

        let cutoff = self.config.cutoff_at(self.clock.now());
        let slots = assemble(&self.config.calendar, &cells, &bookings, &closures, cutoff);
        debug!(
            %date,
            %kind,
            bookings = bookings.len(),
            closures = closures.len(),
            "assembled {} slots",
            slots.len()
        );
        Ok(slots)
    }
}

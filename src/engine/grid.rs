use chrono::NaiveDate;

use crate::calendar::is_weekend;
use crate::config::TerminalConfig;
use crate::model::{BookingType, GridCell};

/// The canonical cells offered for `kind` on the local day `date`.
///
/// Empty on weekends. Otherwise one cell per ramp for every whole slot in the
/// window, ordered by start then ramp. Partial trailing slots are never
/// produced.
pub fn generate_grid(config: &TerminalConfig, date: NaiveDate, kind: BookingType) -> Vec<GridCell> {
    if is_weekend(date) {
        return Vec::new();
    }
    let ramps = config.ramps(kind);
    let duration = ramps.slot_duration();
    let mut cells = Vec::with_capacity(ramps.ramps.len() * ramps.slots_per_day() as usize);

    for minute in ramps.slot_starts() {
        // Skipped only if the wall-clock time falls in a DST gap.
        let Some(start) = config.calendar.instant_at(date, minute) else {
            continue;
        };
        for &ramp_number in &ramps.ramps {
            cells.push(GridCell {
                ramp_number,
                start,
                end: start + duration,
            });
        }
    }
    cells
}

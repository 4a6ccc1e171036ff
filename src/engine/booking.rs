use std::sync::Arc;

use chrono::{DateTime, NaiveDate, Utc};
use tracing::{debug, info, warn};
use ulid::Ulid;

use crate::calendar::is_weekend;
use crate::config::TerminalConfig;
use crate::model::*;
use crate::observability::{
    BOOKINGS_CREATED_TOTAL, BOOKING_CONFLICTS_TOTAL, BOOKING_REJECTIONS_TOTAL, NOTIFICATION_FAILURES_TOTAL,
};
use crate::store::StoreError;

use super::closure::resolve;
use super::{Engine, EngineError, Rejection};

/// Checks (a)-(d) for a booking of `kind` on `ramp` starting at `start`.
///
/// Uses the same cutoff as the availability side: a start is too late when
/// `start < now + cutoff`.
pub fn validate_slot(
    config: &TerminalConfig,
    kind: BookingType,
    ramp: u32,
    start: DateTime<Utc>,
    now: DateTime<Utc>,
) -> Result<(), EngineError> {
    let ramps = config.ramps(kind);
    if !ramps.has_ramp(ramp) {
        return Err(Rejection::UnknownRamp { kind, ramp }.into());
    }

    let cal = &config.calendar;
    if !cal.is_whole_minute(start) || !ramps.is_slot_start(cal.minute_of_day(start)) {
        return Err(Rejection::OutsideWindow { kind, start }.into());
    }

    let date = cal.local_date(start);
    if is_weekend(date) {
        return Err(Rejection::Weekend(date).into());
    }

    let cutoff = config.cutoff_at(now);
    if start < cutoff {
        return Err(EngineError::Cutoff { start, cutoff });
    }
    Ok(())
}

/// Trim the free-text fields. Required ones must be non-empty; an empty
/// reference is dropped.
pub fn normalize_details(details: BookingDetails) -> Result<BookingDetails, Rejection> {
    fn required(value: String, field: &'static str) -> Result<String, Rejection> {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            return Err(Rejection::MissingField(field));
        }
        Ok(trimmed.to_string())
    }

    Ok(BookingDetails {
        reg_nr: required(details.reg_nr, "regNr")?,
        company: required(details.company, "company")?,
        email: required(details.email, "email")?,
        phone: required(details.phone, "phone")?,
        goods_type: details.goods_type,
        reference: details
            .reference
            .map(|r| r.trim().to_string())
            .filter(|r| !r.is_empty()),
    })
}

impl Engine {
    /// Validate and write one booking for `caller`.
    ///
    /// The cell is claimed by the store's unique index; a lost race comes back
    /// as [`EngineError::Conflict`]. The confirmation is sent in the background
    /// and never affects the result.
    pub async fn create_booking(&self, request: NewBooking, caller: &Identity) -> Result<Booking, EngineError> {
        let kind = request.kind;
        match self.write_booking(request, caller).await {
            Ok(booking) => {
                metrics::counter!(BOOKINGS_CREATED_TOTAL, "type" => kind.as_str()).increment(1);
                info!(
                    booking = %booking.id,
                    %kind,
                    ramp = booking.ramp_number,
                    start = %booking.start,
                    user = %booking.user_id,
                    "booking created"
                );
                self.spawn_confirmation(booking.clone());
                Ok(booking)
            }
            Err(e) => {
                if e.is_validation() || matches!(e, EngineError::Conflict { .. }) {
                    metrics::counter!(BOOKING_REJECTIONS_TOTAL, "reason" => e.reason()).increment(1);
                    debug!(%kind, reason = e.reason(), "booking rejected: {e}");
                }
                Err(e)
            }
        }
    }

    async fn write_booking(&self, request: NewBooking, caller: &Identity) -> Result<Booking, EngineError> {
        let details = normalize_details(request.details)?;
        let NewBooking {
            kind,
            ramp_number,
            start,
            ..
        } = request;

        let now = self.clock.now();
        validate_slot(&self.config, kind, ramp_number, start, now)?;

        let cal = &self.config.calendar;
        let closures = self.store.find_closures(cal.local_date(start), kind).await?;
        if let Some(closure) = resolve(&closures, ramp_number, cal.minute_of_day(start)) {
            return Err(Rejection::Closed(closure.reason.clone()).into());
        }

        let booking = Booking {
            id: Ulid::new(),
            kind,
            ramp_number,
            start,
            end: start + self.config.ramps(kind).slot_duration(),
            reg_nr: details.reg_nr,
            company: details.company,
            email: details.email,
            phone: details.phone,
            goods_type: details.goods_type,
            reference: details.reference,
            user_id: caller.id.clone(),
            created_at: now,
        };

        match self.store.insert_booking(booking).await {
            Ok(booking) => Ok(booking),
            Err(StoreError::Conflict { ramp, start }) => {
                metrics::counter!(BOOKING_CONFLICTS_TOTAL).increment(1);
                let holder = self
                    .store
                    .find_booking_by_ramp_and_start(ramp, start)
                    .await
                    .ok()
                    .flatten();
                debug!(ramp, %start, holder = ?holder.map(|b| b.id), "cell already claimed");
                Err(EngineError::Conflict { ramp, start })
            }
            Err(e) => Err(e.into()),
        }
    }

    fn spawn_confirmation(&self, booking: Booking) {
        let notifier = Arc::clone(&self.notifier);
        tokio::spawn(async move {
            if let Err(e) = notifier.booking_confirmed(&booking).await {
                metrics::counter!(NOTIFICATION_FAILURES_TOTAL).increment(1);
                warn!(booking = %booking.id, error = %e, "booking confirmation not delivered");
            }
        });
    }

    pub async fn delete_booking(&self, id: Ulid) -> Result<Booking, EngineError> {
        let booking = self.store.delete_booking(id).await?;
        info!(booking = %id, ramp = booking.ramp_number, start = %booking.start, "booking deleted");
        Ok(booking)
    }

    /// Every booking, both types, starting on the local day `date`.
    pub async fn bookings_on(&self, date: NaiveDate) -> Result<Vec<Booking>, EngineError> {
        self.bookings_between(date, 1).await
    }

    /// Bookings starting in `[date, date + days)` local days.
    pub async fn bookings_between(&self, date: NaiveDate, days: u32) -> Result<Vec<Booking>, EngineError> {
        let (from, to) = self
            .config
            .calendar
            .day_range(date, days)
            .ok_or_else(|| Rejection::invalid("date", format!("{date} + {days} days is out of range")))?;
        Ok(self.store.find_bookings(None, from, to).await?)
    }
}

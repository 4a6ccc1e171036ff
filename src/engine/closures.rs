use chrono::NaiveDate;
use tracing::info;
use ulid::Ulid;

use crate::calendar::{parse_hhmm, MINUTES_PER_DAY};
use crate::config::TerminalConfig;
use crate::model::*;

use super::{Engine, EngineError, Rejection};

pub const MAX_REASON_CHARS: usize = 200;

/// Validate a closure request into the stored shape, without an id.
///
/// Returns `(scope, start_minute, duration_minutes, reason)`.
pub fn normalize_closure(
    config: &TerminalConfig,
    request: &NewClosure,
) -> Result<(ClosureScope, Option<u32>, Option<u32>, Option<String>), Rejection> {
    let scope: ClosureScope = request
        .scope
        .parse()
        .map_err(Rejection::InvalidType)?;

    if let Some(ramp) = request.ramp_number
        && !config.is_known_ramp(ramp)
    {
        return Err(Rejection::invalid("rampNumber", format!("ramp {ramp} does not exist")));
    }

    let start = request
        .start
        .as_ref()
        .map(|t| minute_of(t, "startTime"))
        .transpose()?;
    if let Some(s) = start
        && s >= MINUTES_PER_DAY
    {
        return Err(Rejection::invalid("startTime", "must be before 24:00"));
    }

    let duration = match (start, &request.end) {
        (_, None) => None,
        (None, Some(_)) => return Err(Rejection::invalid("endTime", "end given without a start")),
        (Some(_), Some(ClosureEnd::Duration(0))) => return Err(Rejection::InvalidTimeRange),
        (Some(s), Some(ClosureEnd::Duration(d))) => Some((*d).min(MINUTES_PER_DAY - s)),
        (Some(s), Some(ClosureEnd::At(t))) => {
            let end = minute_of(t, "endTime")?;
            if end <= s {
                return Err(Rejection::InvalidTimeRange);
            }
            Some(end - s)
        }
    };

    Ok((scope, start, duration, clean_reason(request.reason.as_deref())))
}

fn minute_of(t: &TimeOfDay, field: &'static str) -> Result<u32, Rejection> {
    match t {
        TimeOfDay::Minutes(m) if *m <= MINUTES_PER_DAY => Ok(*m),
        TimeOfDay::Minutes(m) => Err(Rejection::invalid(field, format!("{m} is past the end of the day"))),
        TimeOfDay::Clock(s) => parse_hhmm(s).map_err(|e| Rejection::invalid(field, e)),
    }
}

fn clean_reason(reason: Option<&str>) -> Option<String> {
    let trimmed = reason?.trim();
    if trimmed.is_empty() {
        return None;
    }
    Some(trimmed.chars().take(MAX_REASON_CHARS).collect())
}

impl Engine {
    pub async fn create_closure(&self, request: NewClosure) -> Result<ClosureInterval, EngineError> {
        let (scope, start_minute, duration_minutes, reason) = normalize_closure(&self.config, &request)?;
        let closure = ClosureInterval {
            id: self.next_closure_id(),
            date: request.date,
            scope,
            ramp_number: request.ramp_number,
            start_minute,
            duration_minutes,
            reason,
        };
        let closure = self.store.insert_closure(closure).await?;
        info!(
            closure = %closure.id,
            date = %closure.date,
            scope = ?closure.scope,
            ramp = ?closure.ramp_number,
            start_minute = ?closure.start_minute,
            duration_minutes = ?closure.duration_minutes,
            "closure created"
        );
        Ok(closure)
    }

    /// Closures dated `from..=to`.
    pub async fn list_closures(&self, from: NaiveDate, to: NaiveDate) -> Result<Vec<ClosureInterval>, EngineError> {
        if to < from {
            return Err(Rejection::invalid("end", "end date is before start date").into());
        }
        Ok(self.store.list_closures(from, to).await?)
    }

    pub async fn delete_closure(&self, id: Ulid) -> Result<ClosureInterval, EngineError> {
        let closure = self.store.delete_closure(id).await?;
        info!(closure = %id, date = %closure.date, "closure deleted");
        Ok(closure)
    }
}

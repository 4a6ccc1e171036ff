use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Query, State};
use axum::Json;
use chrono::Days;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::engine::Rejection;
use crate::model::{ClosureEnd, ClosureInterval, NewClosure, TimeOfDay};

use super::bookings::{parse_id, IdQuery};
use super::extract::{optional_date, required_date, Admin};
use super::{ApiError, AppState};

pub const DEFAULT_LIST_DAYS: u64 = 60;

/// POST /closed body. A bound is given either in minutes or as `HH:MM`, not both.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClosureRequest {
    pub date: Option<String>,
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub ramp_number: Option<u32>,
    pub start_minute: Option<u32>,
    pub duration_minutes: Option<u32>,
    pub start_time: Option<String>,
    pub end_time: Option<String>,
    pub reason: Option<String>,
}

impl ClosureRequest {
    pub fn into_new_closure(self) -> Result<NewClosure, ApiError> {
        let date = required_date(self.date.as_deref(), "dato")?;
        let scope = self
            .kind
            .filter(|k| !k.trim().is_empty())
            .ok_or(Rejection::MissingField("type"))?;

        let start_time = non_blank(self.start_time);
        let end_time = non_blank(self.end_time);

        let start = match (self.start_minute, start_time) {
            (Some(_), Some(_)) => {
                return Err(Rejection::invalid("startTime", "give startMinute or startTime, not both").into());
            }
            (Some(m), None) => Some(TimeOfDay::Minutes(m)),
            (None, Some(t)) => Some(TimeOfDay::Clock(t)),
            (None, None) => None,
        };
        let end = match (self.duration_minutes, end_time) {
            (Some(_), Some(_)) => {
                return Err(Rejection::invalid("endTime", "give durationMinutes or endTime, not both").into());
            }
            (Some(d), None) => Some(ClosureEnd::Duration(d)),
            (None, Some(t)) => Some(ClosureEnd::At(TimeOfDay::Clock(t))),
            (None, None) => None,
        };

        Ok(NewClosure {
            date,
            scope,
            ramp_number: self.ramp_number,
            start,
            end,
            reason: self.reason,
        })
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    start: Option<String>,
    end: Option<String>,
}

/// GET /closed?start=&end=
///
/// Defaults to today through today + 60 days, both inclusive.
#[tracing::instrument(skip_all)]
pub async fn list_closures(
    State(state): State<AppState>,
    _admin: Admin,
    query: Result<Query<ListQuery>, QueryRejection>,
) -> Result<Json<Vec<ClosureInterval>>, ApiError> {
    let Query(query) = query.map_err(|e| ApiError::bad_request("invalid-input", e.body_text()))?;
    let today = state.engine.today();
    let from = optional_date(query.start.as_deref(), "start")?.unwrap_or(today);
    let to = match optional_date(query.end.as_deref(), "end")? {
        Some(d) => d,
        None => today
            .checked_add_days(Days::new(DEFAULT_LIST_DAYS))
            .unwrap_or(today),
    };
    Ok(Json(state.engine.list_closures(from, to).await?))
}

/// POST /closed
#[tracing::instrument(skip_all, fields(admin = %admin.0.id))]
pub async fn create_closure(
    State(state): State<AppState>,
    admin: Admin,
    body: Result<Json<ClosureRequest>, JsonRejection>,
) -> Result<Json<ClosureInterval>, ApiError> {
    let Json(body) = body.map_err(|e| ApiError::bad_request("invalid-input", e.body_text()))?;
    let closure = state.engine.create_closure(body.into_new_closure()?).await?;
    Ok(Json(closure))
}

/// DELETE /closed?id=
#[tracing::instrument(skip_all, fields(admin = %admin.0.id))]
pub async fn delete_closure(
    State(state): State<AppState>,
    admin: Admin,
    query: Result<Query<IdQuery>, QueryRejection>,
) -> Result<Json<Value>, ApiError> {
    let Query(query) = query.map_err(|e| ApiError::bad_request("invalid-input", e.body_text()))?;
    let id = parse_id(query.id.as_deref())?;
    state.engine.delete_closure(id).await?;
    Ok(Json(json!({ "message": "Slettet" })))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request() -> ClosureRequest {
        ClosureRequest {
            date: Some("2025-03-10".into()),
            kind: Some("BOTH".into()),
            ..ClosureRequest::default()
        }
    }

    #[test]
    fn minute_form() {
        let r = ClosureRequest {
            start_minute: Some(600),
            duration_minutes: Some(30),
            ..request()
        };
        let c = r.into_new_closure().unwrap();
        assert_eq!(c.start, Some(TimeOfDay::Minutes(600)));
        assert_eq!(c.end, Some(ClosureEnd::Duration(30)));
    }

    #[test]
    fn clock_form() {
        let r = ClosureRequest {
            start_time: Some("12:00".into()),
            end_time: Some("13:00".into()),
            ..request()
        };
        let c = r.into_new_closure().unwrap();
        assert_eq!(c.start, Some(TimeOfDay::Clock("12:00".into())));
        assert_eq!(c.end, Some(ClosureEnd::At(TimeOfDay::Clock("13:00".into()))));
    }

    #[test]
    fn mixed_forms_rejected() {
        let r = ClosureRequest {
            start_minute: Some(600),
            start_time: Some("10:00".into()),
            ..request()
        };
        assert_eq!(r.into_new_closure().unwrap_err().reason(), "invalid-input");
    }

    #[test]
    fn date_and_type_required() {
        let r = ClosureRequest {
            date: None,
            ..request()
        };
        assert_eq!(r.into_new_closure().unwrap_err().reason(), "missing-field");

        let r = ClosureRequest {
            kind: Some(" ".into()),
            ..request()
        };
        assert_eq!(r.into_new_closure().unwrap_err().reason(), "missing-field");
    }
}

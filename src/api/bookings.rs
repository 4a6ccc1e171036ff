use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Query, State};
use axum::Json;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use ulid::Ulid;

use crate::engine::Rejection;
use crate::model::{Booking, BookingDetails, BookingType, GoodsType, NewBooking};

use super::extract::{required_date, Admin, Caller};
use super::{ApiError, AppState};

pub const DEFAULT_RANGE_DAYS: u32 = 7;
pub const MAX_RANGE_DAYS: u32 = 31;

/// POST /bookings body. Everything optional so missing fields get a proper reason.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookingRequest {
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub ramp_number: Option<u32>,
    pub start: Option<String>,
    pub reg_nr: Option<String>,
    pub company: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub goods_type: Option<String>,
    pub reference: Option<String>,
}

impl BookingRequest {
    pub fn into_new_booking(self) -> Result<NewBooking, Rejection> {
        let kind: BookingType = require(self.kind, "type")?
            .parse()
            .map_err(Rejection::InvalidType)?;
        let ramp_number = self.ramp_number.ok_or(Rejection::MissingField("rampNumber"))?;
        let start = require(self.start, "start")?;
        let start = DateTime::parse_from_rfc3339(start.trim())
            .map_err(|e| Rejection::invalid("start", e))?
            .with_timezone(&Utc);
        let goods_type: GoodsType = require(self.goods_type, "goodsType")?
            .parse()
            .map_err(|v| Rejection::invalid("goodsType", format!("{v:?} is not IFCO or GEN_CARGO")))?;

        Ok(NewBooking {
            kind,
            ramp_number,
            start,
            details: BookingDetails {
                reg_nr: require(self.reg_nr, "regNr")?,
                company: require(self.company, "company")?,
                email: require(self.email, "email")?,
                phone: require(self.phone, "phone")?,
                goods_type,
                reference: self.reference,
            },
        })
    }
}

fn require(value: Option<String>, field: &'static str) -> Result<String, Rejection> {
    value
        .filter(|v| !v.trim().is_empty())
        .ok_or(Rejection::MissingField(field))
}

#[derive(Debug, Deserialize)]
pub struct DateQuery {
    date: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct IdQuery {
    pub id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct RangeQuery {
    start: Option<String>,
    days: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct RangeResponse {
    pub start: NaiveDate,
    pub days: u32,
    pub bookings: Vec<Booking>,
}

fn query_error(e: QueryRejection) -> ApiError {
    ApiError::bad_request("invalid-input", e.body_text())
}

/// GET /bookings?date=YYYY-MM-DD
#[tracing::instrument(skip_all)]
pub async fn list_bookings(
    State(state): State<AppState>,
    _caller: Caller,
    query: Result<Query<DateQuery>, QueryRejection>,
) -> Result<Json<Vec<Booking>>, ApiError> {
    let Query(query) = query.map_err(query_error)?;
    let date = required_date(query.date.as_deref(), "dato")?;
    Ok(Json(state.engine.bookings_on(date).await?))
}

/// POST /bookings
#[tracing::instrument(skip_all, fields(user = %caller.0.id))]
pub async fn create_booking(
    State(state): State<AppState>,
    caller: Caller,
    body: Result<Json<BookingRequest>, JsonRejection>,
) -> Result<Json<Booking>, ApiError> {
    let Json(body) = body.map_err(|e| ApiError::bad_request("invalid-input", e.body_text()))?;
    let request = body.into_new_booking()?;
    let booking = state.engine.create_booking(request, &caller.0).await?;
    Ok(Json(booking))
}

/// DELETE /bookings?id=
#[tracing::instrument(skip_all, fields(admin = %admin.0.id))]
pub async fn delete_booking(
    State(state): State<AppState>,
    admin: Admin,
    query: Result<Query<IdQuery>, QueryRejection>,
) -> Result<Json<Value>, ApiError> {
    let Query(query) = query.map_err(query_error)?;
    let id = parse_id(query.id.as_deref())?;
    state.engine.delete_booking(id).await?;
    Ok(Json(json!({ "message": "Slettet" })))
}

/// GET /bookings/range?start=YYYY-MM-DD&days=N
#[tracing::instrument(skip_all)]
pub async fn bookings_range(
    State(state): State<AppState>,
    _admin: Admin,
    query: Result<Query<RangeQuery>, QueryRejection>,
) -> Result<Json<RangeResponse>, ApiError> {
    let Query(query) = query.map_err(query_error)?;
    let start = required_date(query.start.as_deref(), "start")?;
    let days = clamp_days(query.days.as_deref());
    let bookings = state.engine.bookings_between(start, days).await?;
    Ok(Json(RangeResponse { start, days, bookings }))
}

/// Unparseable or missing means the default; anything else is clamped.
pub fn clamp_days(raw: Option<&str>) -> u32 {
    raw.and_then(|d| d.trim().parse::<i64>().ok())
        .filter(|d| *d != 0)
        .map(|d| d.clamp(1, MAX_RANGE_DAYS as i64) as u32)
        .unwrap_or(DEFAULT_RANGE_DAYS)
}

pub(super) fn parse_id(raw: Option<&str>) -> Result<Ulid, ApiError> {
    let raw = raw
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .ok_or_else(|| ApiError::bad_request("missing-field", "Mangler id"))?;
    Ulid::from_string(raw).map_err(|_| ApiError::bad_request("invalid-input", format!("Ugyldig id: {raw}")))
}

use axum::extract::rejection::QueryRejection;
use axum::extract::{Query, State};
use axum::Json;
use serde::Deserialize;

use crate::engine::Rejection;
use crate::model::{BookingType, Slot};

use super::extract::{required_date, Caller};
use super::{ApiError, AppState};

#[derive(Debug, Deserialize)]
pub struct AvailabilityQuery {
    date: Option<String>,
    #[serde(rename = "type")]
    kind: Option<String>,
}

/// GET /availability?date=YYYY-MM-DD&type=LOADING|UNLOADING
///
/// `type` defaults to LOADING.
#[tracing::instrument(skip_all, fields(user = %caller.0.id))]
pub async fn get_availability(
    State(state): State<AppState>,
    caller: Caller,
    query: Result<Query<AvailabilityQuery>, QueryRejection>,
) -> Result<Json<Vec<Slot>>, ApiError> {
    let Query(query) = query.map_err(|e| ApiError::bad_request("invalid-input", e.body_text()))?;
    let date = required_date(query.date.as_deref(), "dato")?;
    let kind = match query.kind.as_deref().map(str::trim).filter(|k| !k.is_empty()) {
        None => BookingType::Loading,
        Some(k) => k.parse().map_err(Rejection::InvalidType)?,
    };
    let slots = state.engine.availability(date, kind).await?;
    Ok(Json(slots))
}

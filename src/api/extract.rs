use axum::extract::FromRequestParts;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use chrono::NaiveDate;

use crate::calendar::parse_date;
use crate::model::Identity;

use super::{ApiError, AppState};

/// Any authenticated caller. 401 when the bearer token is missing or unknown.
#[derive(Debug, Clone)]
pub struct Caller(pub Identity);

/// An authenticated administrator. 401 or 403 otherwise.
#[derive(Debug, Clone)]
pub struct Admin(pub Identity);

impl FromRequestParts<AppState> for Caller {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let token = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "))
            .map(str::trim)
            .ok_or(ApiError::Unauthenticated)?;
        state
            .identities
            .identify(token)
            .await
            .map(Caller)
            .ok_or(ApiError::Unauthenticated)
    }
}

impl FromRequestParts<AppState> for Admin {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let Caller(identity) = Caller::from_request_parts(parts, state).await?;
        if !identity.is_admin() {
            return Err(ApiError::Forbidden);
        }
        Ok(Admin(identity))
    }
}

/// Required `YYYY-MM-DD` query parameter.
pub fn required_date(value: Option<&str>, name: &'static str) -> Result<NaiveDate, ApiError> {
    optional_date(value, name)?.ok_or_else(|| ApiError::bad_request("missing-field", format!("Mangler {name}")))
}

/// Optional `YYYY-MM-DD` query parameter; blank counts as absent.
pub fn optional_date(value: Option<&str>, name: &'static str) -> Result<Option<NaiveDate>, ApiError> {
    match value.map(str::trim).filter(|v| !v.is_empty()) {
        None => Ok(None),
        Some(v) => parse_date(v)
            .map(Some)
            .map_err(|_| ApiError::bad_request("invalid-input", format!("Ugyldig {name}: {v}"))),
    }
}

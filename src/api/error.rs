use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use tracing::error;

use crate::engine::{EngineError, Rejection};

/// Everything a handler can fail with. Rendered as
/// `{"error": <reason code>, "message": <text>}`.
#[derive(Debug)]
pub enum ApiError {
    Unauthenticated,
    Forbidden,
    BadRequest { reason: &'static str, message: String },
    Engine(EngineError),
}

impl ApiError {
    pub fn bad_request(reason: &'static str, message: impl Into<String>) -> Self {
        ApiError::BadRequest {
            reason,
            message: message.into(),
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Unauthenticated => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden => StatusCode::FORBIDDEN,
            ApiError::BadRequest { .. } => StatusCode::BAD_REQUEST,
            ApiError::Engine(e) => match e {
                EngineError::Validation(_) | EngineError::Cutoff { .. } | EngineError::Conflict { .. } => {
                    StatusCode::BAD_REQUEST
                }
                EngineError::NotFound(_) => StatusCode::NOT_FOUND,
                EngineError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
        }
    }

    pub fn reason(&self) -> &'static str {
        match self {
            ApiError::Unauthenticated => "unauthenticated",
            ApiError::Forbidden => "forbidden",
            ApiError::BadRequest { reason, .. } => reason,
            ApiError::Engine(e) => e.reason(),
        }
    }

    pub fn message(&self) -> String {
        match self {
            ApiError::Unauthenticated => "Ikke innlogget".into(),
            ApiError::Forbidden => "Ingen tilgang".into(),
            ApiError::BadRequest { message, .. } => message.clone(),
            ApiError::Engine(e) => engine_message(e),
        }
    }
}

fn engine_message(e: &EngineError) -> String {
    match e {
        EngineError::Validation(r) => rejection_message(r),
        EngineError::Cutoff { .. } => "For sent å booke denne tiden (må være >= 1 time før)".into(),
        EngineError::Conflict { .. } => "Slot allerede booket".into(),
        EngineError::NotFound(_) => "Ikke funnet".into(),
        EngineError::Store(_) => "Intern feil".into(),
    }
}

fn rejection_message(r: &Rejection) -> String {
    match r {
        Rejection::MissingField(field) => format!("Mangler felt: {field}"),
        Rejection::InvalidInput { field, detail } => format!("Ugyldig {field}: {detail}"),
        Rejection::InvalidType(_) => "Ugyldig type".into(),
        Rejection::UnknownRamp { .. } | Rejection::OutsideWindow { .. } => "Ugyldig slot".into(),
        Rejection::Weekend(_) => "Kan ikke booke i helg".into(),
        Rejection::Closed(Some(reason)) => format!("Slot er stengt: {reason}"),
        Rejection::Closed(None) => "Slot er stengt".into(),
        Rejection::InvalidTimeRange => "Sluttid må være etter starttid".into(),
    }
}

impl From<EngineError> for ApiError {
    fn from(e: EngineError) -> Self {
        ApiError::Engine(e)
    }
}

impl From<Rejection> for ApiError {
    fn from(r: Rejection) -> Self {
        ApiError::Engine(EngineError::Validation(r))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if let ApiError::Engine(EngineError::Store(detail)) = &self {
            error!("store failure: {detail}");
        }
        let status = self.status();
        let body = Json(json!({
            "error": self.reason(),
            "message": self.message(),
        }));
        (status, body).into_response()
    }
}

use axum::extract::State;
use axum::Json;
use serde::Serialize;

use crate::config::RampConfig;
use crate::model::Identity;

use super::extract::Caller;
use super::AppState;

/// Liveness probe. No auth.
pub async fn health() -> &'static str {
    "OK"
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RampsResponse {
    pub loading: RampConfig,
    pub unloading: RampConfig,
    pub timezone: String,
    pub cutoff_minutes: u32,
    pub version: &'static str,
}

/// GET /ramps
pub async fn ramps(State(state): State<AppState>) -> Json<RampsResponse> {
    let config = state.engine.config();
    Json(RampsResponse {
        loading: config.loading.clone(),
        unloading: config.unloading.clone(),
        timezone: config.calendar.timezone().name().to_string(),
        cutoff_minutes: config.cutoff_minutes,
        version: env!("CARGO_PKG_VERSION"),
    })
}

#[derive(Debug, Serialize)]
pub struct MeResponse {
    pub user: Identity,
}

/// GET /me
pub async fn me(Caller(user): Caller) -> Json<MeResponse> {
    Json(MeResponse { user })
}

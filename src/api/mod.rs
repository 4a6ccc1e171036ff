//! HTTP API.
//!
//! - `availability`: slot grid per day and type
//! - `bookings`: create, list, range listing, delete
//! - `closures`: admin closure management
//! - `meta`: health, ramp configuration, current user

mod availability;
mod bookings;
mod closures;
mod error;
mod extract;
mod meta;

pub use bookings::{BookingRequest, RangeResponse};
pub use closures::ClosureRequest;
pub use error::ApiError;
pub use extract::{Admin, Caller};

use std::sync::Arc;

use axum::middleware;
use axum::routing::get;
use axum::Router;

use crate::auth::IdentitySource;
use crate::engine::Engine;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<Engine>,
    pub identities: Arc<dyn IdentitySource>,
}

/// Create the API router with all endpoints
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/availability", get(availability::get_availability))
        .route(
            "/bookings",
            get(bookings::list_bookings)
                .post(bookings::create_booking)
                .delete(bookings::delete_booking),
        )
        .route("/bookings/range", get(bookings::bookings_range))
        .route(
            "/closed",
            get(closures::list_closures)
                .post(closures::create_closure)
                .delete(closures::delete_closure),
        )
        .route("/ramps", get(meta::ramps))
        .route("/me", get(meta::me))
        .route("/health", get(meta::health))
        .route_layer(middleware::from_fn(crate::observability::track_requests))
        .with_state(state)
}

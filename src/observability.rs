use std::net::SocketAddr;
use std::time::Instant;

use axum::extract::{MatchedPath, Request};
use axum::middleware::Next;
use axum::response::Response;
use tracing::Instrument;
use tracing_subscriber::EnvFilter;

// ── RED metrics (request-driven) ────────────────────────────────

/// Counter: availability grids computed. Labels: type.
pub const AVAILABILITY_QUERIES_TOTAL: &str = "dockslot_availability_queries_total";

/// Counter: bookings written. Labels: type.
pub const BOOKINGS_CREATED_TOTAL: &str = "dockslot_bookings_created_total";

/// Counter: booking attempts refused. Labels: reason.
pub const BOOKING_REJECTIONS_TOTAL: &str = "dockslot_booking_rejections_total";

/// Counter: inserts that lost the race for a cell.
pub const BOOKING_CONFLICTS_TOTAL: &str = "dockslot_booking_conflicts_total";

/// Counter: confirmations that could not be delivered.
pub const NOTIFICATION_FAILURES_TOTAL: &str = "dockslot_notification_failures_total";

/// Histogram: HTTP handler latency in seconds. Labels: method, route, status.
pub const REQUEST_DURATION_SECONDS: &str = "dockslot_request_duration_seconds";

// ── USE metrics (resource utilization) ──────────────────────────

/// Histogram: WAL group-commit flush duration in seconds.
pub const WAL_FLUSH_DURATION_SECONDS: &str = "dockslot_wal_flush_duration_seconds";

/// Histogram: WAL group-commit batch size (events per flush).
pub const WAL_FLUSH_BATCH_SIZE: &str = "dockslot_wal_flush_batch_size";

/// Install the fmt subscriber, filtered by `RUST_LOG` (default `info`).
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

/// Install Prometheus metrics exporter on the given port. No-op if port is None.
pub fn init(port: Option<u16>) -> Result<(), metrics_exporter_prometheus::BuildError> {
    let Some(port) = port else { return Ok(()) };
    let addr: SocketAddr = ([0, 0, 0, 0], port).into();
    metrics_exporter_prometheus::PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()?;
    tracing::info!("metrics endpoint: http://0.0.0.0:{port}/metrics");
    Ok(())
}

/// Wraps every request in a span and records its latency by route template.
pub async fn track_requests(request: Request, next: Next) -> Response {
    let method = request.method().to_string();
    let route = request
        .extensions()
        .get::<MatchedPath>()
        .map(|p| p.as_str().to_string())
        .unwrap_or_else(|| "unmatched".to_string());

    let span = tracing::info_span!("http.request", method = %method, route = %route);
    let started = Instant::now();
    let response = next.run(request).instrument(span).await;

    metrics::histogram!(
        REQUEST_DURATION_SECONDS,
        "method" => method,
        "route" => route,
        "status" => response.status().as_u16().to_string()
    )
    .record(started.elapsed().as_secs_f64());
    response
}

use std::sync::Arc;

use tokio::net::TcpListener;
use tracing::{info, warn};

use dockslot::api::{build_router, AppState};
use dockslot::auth::StaticTokens;
use dockslot::calendar::SystemClock;
use dockslot::config::{ServerConfig, TerminalConfig};
use dockslot::engine::Engine;
use dockslot::notify::{LogNotifier, Notifier, WebhookNotifier};
use dockslot::store::WalStore;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dockslot::observability::init_tracing();

    let server = ServerConfig::from_env();
    let terminal = TerminalConfig::from_env()?;
    dockslot::observability::init(server.metrics_port)?;

    // Ensure data directory exists
    std::fs::create_dir_all(&server.data_dir)?;
    let wal_path = server.data_dir.join("dockslot.wal");
    let store = Arc::new(WalStore::open(&wal_path)?);

    let identities = StaticTokens::load(&server.users_file)?;
    if identities.is_empty() {
        warn!("users file {} has no entries; every request will be rejected", server.users_file.display());
    }

    let notifier: Arc<dyn Notifier> = match &server.notify_webhook {
        Some(url) => Arc::new(WebhookNotifier::new(
            url.clone(),
            terminal.calendar,
            server.mail_bcc.clone(),
        )?),
        None => Arc::new(LogNotifier::new(terminal.calendar, server.mail_bcc.clone())),
    };

    info!("dockslot starting");
    info!("  timezone: {}", terminal.calendar.timezone().name());
    info!("  cutoff: {} minutes", terminal.cutoff_minutes);
    info!(
        "  loading: ramps {:?}, {} min slots, {}",
        terminal.loading.ramps, terminal.loading.slot_minutes, terminal.loading.window
    );
    info!(
        "  unloading: ramps {:?}, {} min slots, {}",
        terminal.unloading.ramps, terminal.unloading.slot_minutes, terminal.unloading.window
    );
    info!("  wal: {}", wal_path.display());
    info!("  users: {}", identities.len());
    info!("  notifications: {}", server.notify_webhook.as_deref().unwrap_or("log only"));
    info!(
        "  metrics: {}",
        server
            .metrics_port
            .map_or("disabled".to_string(), |p| format!("http://0.0.0.0:{p}/metrics"))
    );

    tokio::spawn(dockslot::compactor::run_compactor(
        Arc::clone(&store),
        server.compact_threshold,
    ));

    let engine = Arc::new(Engine::new(terminal, store, notifier, Arc::new(SystemClock)));
    let app = build_router(AppState {
        engine,
        identities: Arc::new(identities),
    });

    let addr = format!("{}:{}", server.bind, server.port);
    let listener = TcpListener::bind(&addr).await?;
    info!("dockslot listening on {addr}");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("dockslot stopped");
    Ok(())
}

/// Resolves on ctrl-c or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("ctrl-c handler failed: {e}");
        }
    };
    #[cfg(unix)]
    {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                tokio::select! {
                    _ = ctrl_c => {}
                    _ = sigterm.recv() => {}
                }
            }
            Err(e) => {
                warn!("SIGTERM handler unavailable: {e}");
                ctrl_c.await;
            }
        }
    }
    #[cfg(not(unix))]
    {
        ctrl_c.await;
    }
    info!("shutdown signal received, draining requests");
}

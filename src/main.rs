use std::sync::Arc;
use std::time::Duration;

use tokio::net::TcpListener;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use studiobook::api::{self, AppState};
use studiobook::compactor;
use studiobook::config::Config;
use studiobook::engine::{Engine, SlotStep};
use studiobook::notify::NotifyHub;
use studiobook::session::SessionStore;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = Config::from_env()?;
    studiobook::observability::init(config.metrics_port)?;

    if config.policy.slot_step == SlotStep::ServiceDuration && config.policy.slot_granularity > 1 {
        warn!(
            "slot step follows service duration; slots off the {}-minute grid are not offered",
            config.policy.slot_granularity
        );
    }

    std::fs::create_dir_all(&config.data_dir)?;
    let wal_path = config.data_dir.join("studiobook.wal");

    let notify = Arc::new(NotifyHub::new());
    let engine = Arc::new(Engine::new(wal_path, notify, config.policy.clone())?);
    let sessions = Arc::new(
        SessionStore::new(
            config.admin_user.clone(),
            config.admin_password.clone(),
            config.session_ttl,
        )
        .with_secure_cookies(config.secure_cookies),
    );

    tokio::spawn(compactor::run_compactor(
        engine.clone(),
        sessions.clone(),
        config.compact_threshold,
        Duration::from_secs(30),
    ));

    let app = api::router(AppState::new(engine, sessions, &config.studio_name));

    let addr = format!("{}:{}", config.bind, config.port);
    let listener = TcpListener::bind(&addr).await?;
    info!("studiobook listening on http://{addr}");
    info!("  data_dir: {}", config.data_dir.display());
    info!("  slot step: {:?}, granularity: {} min", config.policy.slot_step, config.policy.slot_granularity);
    info!(
        "  metrics: {}",
        config
            .metrics_port
            .map_or("disabled".to_string(), |p| format!("http://0.0.0.0:{p}/metrics"))
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("studiobook stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("failed to listen for ctrl-c: {e}");
            std::future::pending::<()>().await;
        }
    };
    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!("failed to register SIGTERM handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
    info!("shutdown signal received, draining requests");
}

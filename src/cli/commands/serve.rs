use anyhow::Result;
use axum::routing::get;
use axum_prometheus::PrometheusMetricLayer;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tracing::{debug, error, info, trace, warn};

use crate::config::{Settings, initialize_app_state_with_url};
use crate::router::create_router;
use crate::scheduler::Scheduler;
use crate::schemas::AppState;

pub async fn serve(settings: Settings) -> Result<()> {
    info!("Clinic server starting up");
    debug!("Bind address: {}", settings.bind_address);

    let state = initialize_app_state_with_url(&settings.database_url)
        .await
        .map_err(|e| {
            error!("Failed to initialize application state: {}", e);
            e
        })?;

    run_server(state, &settings).await
}

/// Serve HTTP until Ctrl-C, running the cleanup scheduler alongside.
pub async fn run_server(state: AppState, settings: &Settings) -> Result<()> {
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let jobs = if settings.scheduler.enabled {
        Scheduler::new(state.db.clone(), &settings.scheduler)?.spawn(shutdown_rx)
    } else {
        info!("Cleanup scheduler disabled");
        Vec::new()
    };

    trace!("Creating application router");
    let (prometheus_layer, metric_handle) = PrometheusMetricLayer::pair();
    let app = create_router(state)
        .route(
            "/metrics",
            get(move || {
                let handle = metric_handle.clone();
                async move { handle.render() }
            }),
        )
        .layer(prometheus_layer);

    let listener = TcpListener::bind(&settings.bind_address).await.map_err(|e| {
        error!("Failed to bind to address {}: {}", settings.bind_address, e);
        e
    })?;

    info!("Clinic API server running on http://{}", settings.bind_address);
    info!("Swagger UI available at http://{}/swagger-ui", settings.bind_address);

    if let Err(e) = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(shutdown_tx))
        .await
    {
        error!("Server error: {}", e);
        return Err(e.into());
    }

    for job in jobs {
        if let Err(e) = job.await {
            warn!("Scheduler task ended abnormally: {}", e);
        }
    }

    info!("Server shutdown gracefully");
    Ok(())
}

async fn shutdown_signal(shutdown: watch::Sender<bool>) {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
    // No receivers when the scheduler is disabled
    let _ = shutdown.send(true);
}

use anyhow::Context;
use campusdesk::logging::{init_tracing, shutdown_tracer};
use campusdesk::metrics::{init_metrics, metrics_app};
use campusdesk::router::init_router;
use campusdesk::state::init_app_state;
use campusdesk::sweep::spawn_reconciliation_sweep;
use campusdesk_config::ServerConfig;
use dotenvy::dotenv;
use tracing::{error, info};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();

    let server = ServerConfig::from_env();
    let export_traces =
        server.observability_enabled && std::env::var("OTEL_EXPORTER_OTLP_ENDPOINT").is_ok();
    init_tracing(export_traces)?;

    if let Some(handle) = init_metrics() {
        let metrics_addr = format!("0.0.0.0:{}", server.metrics_port);
        let listener = tokio::net::TcpListener::bind(&metrics_addr)
            .await
            .with_context(|| format!("Failed to bind metrics listener on {}", metrics_addr))?;
        info!("📊 Metrics available at http://localhost:{}/metrics", server.metrics_port);
        tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, metrics_app(handle)).await {
                error!(error = %e, "Metrics server stopped");
            }
        });
    }

    let state = init_app_state(&server).await?;

    let sweep = state
        .enrollment_config
        .sweep_interval
        .map(|period| spawn_reconciliation_sweep(state.engine.reconciler.clone(), period));

    let app = init_router(state);

    let addr = format!("0.0.0.0:{}", server.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    info!("🚀 Server running on http://localhost:{}", server.port);
    info!("📚 Swagger UI available at http://localhost:{}/swagger-ui", server.port);
    info!("📖 Scalar UI available at http://localhost:{}/scalar", server.port);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    if let Some(sweep) = sweep {
        sweep.abort();
    }
    shutdown_tracer();
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("Shutting down");
}

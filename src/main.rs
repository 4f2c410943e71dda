use std::sync::Arc;
use ticket_classifier::{
    api::{build_router, build_router_with_cors, AppState},
    config::Config,
    logging::init_tracing,
    ml::ClassificationService,
};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load configuration
    let config = Config::load().unwrap_or_else(|e| {
        eprintln!("Failed to load configuration: {}", e);
        eprintln!("Using default configuration");
        Config::default()
    });

    // Initialize tracing
    init_tracing(&config.observability);

    tracing::info!(
        "Starting {} v{}",
        config.observability.service_name,
        env!("CARGO_PKG_VERSION")
    );

    // Resolve and load the model before accepting any request
    let model_config = config.model.clone();
    let service = tokio::task::spawn_blocking(move || ClassificationService::from_config(&model_config))
        .await?;

    let service = match service {
        Ok(service) => Arc::new(service),
        Err(e) => {
            tracing::error!("{}", e);
            tracing::error!("Refusing to start without a loaded model");
            std::process::exit(1);
        }
    };

    let info = service.model_info();
    tracing::info!(
        "✅ Model loaded from {} on {} ({} labels: {})",
        info.artifact_path.display(),
        info.device,
        info.labels.len(),
        info.labels.join(", ")
    );

    // Build HTTP router
    let app_state = AppState::new(service);
    let app = if config.server.cors_permissive {
        build_router_with_cors(app_state)
    } else {
        build_router(app_state)
    };

    // Start HTTP server
    let http_addr = config.http_addr();
    let http_listener = tokio::net::TcpListener::bind(&http_addr).await?;

    tracing::info!("🚀 HTTP API server listening on http://{}", http_addr);
    tracing::info!("   Readiness: http://{}/", http_addr);
    tracing::info!("   Health check: http://{}/health", http_addr);
    tracing::info!("   Predict: POST http://{}/predict", http_addr);
    tracing::info!("Press Ctrl+C to shutdown");

    axum::serve(http_listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Shutting down gracefully...");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}

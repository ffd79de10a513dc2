use devcamper_api::{create_app, AppState, AuthService, Config, Database, Geocoder};
use std::sync::Arc;
use tokio::signal;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "devcamper_api=debug,tower_http=debug".into()),
        )
        .init();

    // Load configuration
    let config = Arc::new(Config::from_env()?);
    info!(
        environment = ?config.environment,
        database = %config.database.name,
        "Starting DevCamper API"
    );

    // Initialize database connection
    let db = Database::connect(&config.database).await?;
    db.ensure_indexes().await?;

    tokio::fs::create_dir_all(&config.upload.upload_path).await?;

    let geocoder = Geocoder::from_config(&config.geocoder);
    if geocoder.is_none() {
        warn!("GEOCODER_API_KEY not set; addresses are stored without coordinates");
    }

    let state = AppState {
        db: db.clone(),
        auth_service: Arc::new(AuthService::new(db.clone(), config.clone())),
        config: config.clone(),
        geocoder,
    };
    let app = create_app(state);

    // Run the server with graceful shutdown
    let listener =
        tokio::net::TcpListener::bind((config.server.host.as_str(), config.server.port)).await?;
    info!("Server listening on {}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    db.shutdown().await;
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl+C: {}", err);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(err) => {
                warn!("Failed to install SIGTERM handler: {}", err);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down");
        }
        _ = terminate => {
            info!("Received terminate signal, shutting down");
        }
    }
}

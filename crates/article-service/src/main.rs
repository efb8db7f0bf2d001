use article_service::{
    DefaultAppState, config::ServiceConfig, create_served_app, db::establish_connection,
    shutdown::ShutdownState,
};
use std::sync::{Arc, Mutex};
use tokio::signal;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("article_service=debug,tower_http=info")),
        )
        .init();

    let config = ServiceConfig::from_env().unwrap_or_else(|err| {
        error!(error = %err, "Invalid configuration");
        std::process::exit(1);
    });

    let connection = establish_connection(&config.database_url, config.run_migrations)
        .unwrap_or_else(|err| {
            error!(database_url = %config.database_url, error = %err, "Failed to open database");
            std::process::exit(1);
        });

    info!(database_url = %config.database_url, "Connected to database");

    let app_state = DefaultAppState::new(Arc::new(Mutex::new(connection)));
    let shutdown_state = ShutdownState::new();

    let app = create_served_app(app_state, shutdown_state.clone(), config.request_timeout);

    let listener = tokio::net::TcpListener::bind(config.bind_address)
        .await
        .unwrap_or_else(|err| {
            error!(bind_address = %config.bind_address, error = %err, "Failed to bind to address");
            std::process::exit(1);
        });

    info!(bind_address = %config.bind_address, "Server running");

    let server = axum::serve(listener, app).with_graceful_shutdown(shutdown_signal(shutdown_state));

    if let Err(err) = server.await {
        error!(error = %err, "Server error");
        std::process::exit(1);
    }
}

async fn shutdown_signal(shutdown_state: ShutdownState) {
    let ctrl_c = async {
        if let Err(err) = signal::ctrl_c().await {
            error!(error = %err, "Failed to install Ctrl+C handler");
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
                error!(error = %err, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received, starting graceful shutdown");
    let shutdown_completed = shutdown_state.completed();
    shutdown_state.start_shutdown();

    shutdown_completed.await;
    info!(
        in_flight = shutdown_state.in_flight_count(),
        "Graceful shutdown completed - all requests finished"
    );
}

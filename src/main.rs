use site_hook::config::{Config, DEFAULT_CONFIG_FILE};
use site_hook::error::HookError;
use site_hook::logging::{FileLogger, setup_logging};
use site_hook::{AppState, router};
use std::path::PathBuf;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{self, error, info};

const DEFAULT_BIND_ADDRESS: &str = "0.0.0.0:8080";

// The env file is applied to the process environment here, before the
// runtime starts any worker threads.
fn main() {
    dotenv::dotenv().ok();

    let config_path =
        std::env::var("HOOK_ENV_FILE").unwrap_or_else(|_| DEFAULT_CONFIG_FILE.to_string());
    let config = match Config::load(&config_path) {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            std::process::exit(1);
        }
    };

    let file_logger = std::env::var("LOG_DIR").ok().map(|dir| FileLogger::new(PathBuf::from(dir)));
    let _log_guard = match setup_logging(file_logger.as_ref()) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("Logging setup failed: {}", e);
            std::process::exit(1);
        }
    };

    let runtime = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("Failed to start async runtime: {}", e);
            std::process::exit(1);
        }
    };

    if let Err(e) = runtime.block_on(serve(config, config_path)) {
        error!("Server error: {}", e);
        std::process::exit(1);
    }
}

async fn serve(config: Config, config_path: String) -> Result<(), HookError> {
    let bind_address =
        std::env::var("BIND_ADDRESS").unwrap_or_else(|_| DEFAULT_BIND_ADDRESS.to_string());

    info!("Using config at {:?}: {:?}", config_path, config);
    let state = Arc::new(AppState::new(config));
    let shutdown = state.shutdown.clone();
    let app = router(state);

    let listener = tokio::net::TcpListener::bind(&bind_address).await?;
    info!("Server started, listening on {}", bind_address);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(shutdown))
        .await?;

    info!("Server stopped");
    Ok(())
}

/// Waits for Ctrl-C or SIGTERM, then cancels running commands.
async fn shutdown_signal(shutdown: CancellationToken) {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                error!("Failed to listen for SIGTERM: {}", e);
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

    info!("Shutdown signal received");
    shutdown.cancel();
}

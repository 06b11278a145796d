//! storefront-translate: serves the storefront's UI strings translated on
//! demand. A fixed Portuguese source document is translated through DeepL,
//! with an in-memory TTL cache in front and batched, rate-paced upstream
//! calls behind. When DeepL is unreachable the response still has the full
//! document shape, with affected strings tagged by target language.

pub mod config;
pub mod error;
pub mod metrics;
pub mod routes;
pub mod source;
pub mod state;
pub mod translate;

use chrono::{SecondsFormat, Utc};
use tokio::net::TcpListener;
use tokio::signal;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use config::Config;
use error::StartupError;
use state::AppState;

/// RFC 3339 UTC timestamp with millisecond precision.
pub fn utc_timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("storefront_translate=info,tower_http=info"));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true);

    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

/// Load configuration, build state and serve until SIGINT/SIGTERM.
pub async fn run() -> Result<(), StartupError> {
    // LOG_FORMAT is read before the subscriber exists, so config logging
    // starts after this point.
    let json_logs = std::env::var("LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);
    init_tracing(json_logs);

    info!("storefront-translate starting");
    let config = Config::load();
    let address = format!("{}:{}", config.bind_addr, config.port);

    let state = AppState::from_config(config)?;
    let app = routes::router(state);

    let listener = TcpListener::bind(&address).await?;
    info!("Server running on {address}");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server shut down");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        match signal::ctrl_c().await {
            Ok(()) => info!("Received Ctrl+C, shutting down"),
            Err(e) => {
                warn!(error = %e, "failed to install Ctrl+C handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
                info!("Received terminate signal, shutting down");
            }
            Err(e) => {
                warn!(error = %e, "failed to install terminate handler");
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
}

//! murmur: anonymous feedback intake API.
//!
//! The HTTP layer over [`murmur_core`]. The embeddable widget posts
//! submissions here; an admin console lists, moderates and configures
//! notifications through the same API.
//!
//! # Routes
//!
//! | Method | Path | Handler |
//! |--------|------|---------|
//! | `POST` | `/api/feedback` | [`routes::submit_feedback`] |
//! | `GET` | `/api/feedback` | [`routes::list_feedback`] |
//! | `PUT` | `/api/feedback/{id}/moderate` | [`routes::moderate_feedback`] |
//! | `GET` | `/api/settings` | [`routes::get_settings`] |
//! | `PUT` | `/api/settings` | [`routes::update_settings`] |
//! | `GET` | `/health` | [`routes::health`] |

use std::fs::{File, OpenOptions};
use std::net::SocketAddr;
use std::path::Path;

use anyhow::Context;
use axum::extract::DefaultBodyLimit;
use axum::http::{header, HeaderValue, StatusCode};
use axum::routing::{get, put};
use axum::Router;
use tokio::net::TcpListener;
use tokio::signal;
use tower_http::cors::CorsLayer;
use tower_http::set_header::SetResponseHeaderLayer;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, info};

use murmur_core::config::Config;
use murmur_core::store::Store;

pub mod error;
pub mod routes;
pub mod state;

pub use state::AppState;

/// Largest request body accepted.
pub const MAX_BODY_BYTES: usize = 10 * 1024 * 1024;

/// Build the application router around `state`.
pub fn router(state: AppState, config: &Config) -> Router {
    Router::new()
        .route(
            "/api/feedback",
            get(routes::list_feedback).post(routes::submit_feedback),
        )
        .route("/api/feedback/{id}/moderate", put(routes::moderate_feedback))
        .route(
            "/api/settings",
            get(routes::get_settings).put(routes::update_settings),
        )
        .route("/health", get(routes::health))
        .fallback(routes::not_found)
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .layer(SetResponseHeaderLayer::if_not_present(
            header::X_CONTENT_TYPE_OPTIONS,
            HeaderValue::from_static("nosniff"),
        ))
        .layer(SetResponseHeaderLayer::if_not_present(
            header::X_FRAME_OPTIONS,
            HeaderValue::from_static("SAMEORIGIN"),
        ))
        .layer(SetResponseHeaderLayer::if_not_present(
            header::REFERRER_POLICY,
            HeaderValue::from_static("no-referrer"),
        ))
        .layer(CorsLayer::permissive())
        .layer(TimeoutLayer::with_status_code(
            StatusCode::REQUEST_TIMEOUT,
            config.request_timeout(),
        ))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Open `path` for appending, creating it if needed. The `--debug` log
/// writer goes here.
pub fn open_debug_log(path: &Path) -> anyhow::Result<File> {
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("opening debug log {}", path.display()))
}

/// Open the store, wire the services and serve until Ctrl+C / SIGTERM.
pub async fn serve(config: Config) -> anyhow::Result<()> {
    info!("Initializing store...");
    let store = Store::open(&config.data_path, config.io_timeout())
        .await
        .with_context(|| format!("opening store at {}", config.data_path.display()))?;

    let mailer = murmur_smtp::from_config(&config).context("configuring SMTP transport")?;
    let state = AppState::new(store, &config, mailer);
    let app = router(state, &config);

    let address = config
        .listen_addr()
        .with_context(|| format!("invalid bind address {}:{}", config.bind_address, config.port))?;
    let listener = TcpListener::bind(address)
        .await
        .with_context(|| format!("binding {address}"))?;
    info!("Anonymous feedback API running on {address}");

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
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
                error!(error = %e, "failed to install Ctrl+C handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
                info!("Received terminate signal, shutting down");
            }
            Err(e) => {
                error!(error = %e, "failed to install SIGTERM handler");
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

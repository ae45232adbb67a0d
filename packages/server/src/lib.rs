#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Actix-Web server for the case tracker.
//!
//! Exposes the refresh entry point and read-only access to the cached
//! views it publishes:
//!
//! | Route | Description |
//! |---|---|
//! | `GET/POST /api/refresh?debug&only=cases\|hospitals` | Run a refresh |
//! | `GET /api/cached/{key}` | A `cached_*` entry, verbatim |
//! | `GET /api/health` | Liveness |

mod handlers;

use std::sync::Arc;

use actix_cors::Cors;
use actix_web::{App, HttpServer, middleware, web};
use case_tracker_refresh::{CaseCountRefresher, Refreshers, TrackerConfig};
use case_tracker_store::KvStore;

/// Shared application state.
pub struct AppState {
    /// Official-source refreshers.
    pub refreshers: Refreshers,
    /// Store the cached views are read from.
    pub store: Arc<dyn KvStore>,
}

/// Registers the `/api` routes.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api")
            .route("/health", web::get().to(handlers::health))
            .route("/refresh", web::get().to(handlers::refresh))
            .route("/refresh", web::post().to(handlers::refresh))
            .route("/cached/{key}", web::get().to(handlers::cached)),
    );
}

/// Starts the case tracker API server.
///
/// Loads [`TrackerConfig`], opens the configured store, and serves on
/// `BIND_ADDR:PORT` (default `127.0.0.1:8080`). The caller provides the
/// async runtime (e.g. via `#[actix_web::main]`).
///
/// # Errors
///
/// Returns an `std::io::Result` error if the HTTP server fails to bind or
/// encounters a runtime error.
///
/// # Panics
///
/// Panics if the configuration cannot be loaded or the store cannot be
/// opened.
#[allow(clippy::future_not_send)]
pub async fn run_server() -> std::io::Result<()> {
    pretty_env_logger::init_custom_env("RUST_LOG");

    log::info!("Loading configuration...");
    let config = TrackerConfig::load().expect("Failed to load configuration");

    log::info!("Opening store...");
    let store = config.open_store().expect("Failed to open store");

    let cases = CaseCountRefresher::from_config(&config, store.clone())
        .expect("Failed to build case-count refresher");

    let state = web::Data::new(AppState {
        refreshers: Refreshers::new(Arc::new(cases)),
        store,
    });

    let bind_addr = std::env::var("BIND_ADDR").unwrap_or_else(|_| "127.0.0.1".to_string());
    let port: u16 = std::env::var("PORT")
        .ok()
        .and_then(|p| p.parse().ok())
        .unwrap_or(8080);

    log::info!("Starting server on {bind_addr}:{port}");

    HttpServer::new(move || {
        App::new()
            .wrap(Cors::permissive())
            .wrap(middleware::Logger::default())
            .app_data(state.clone())
            .configure(configure)
    })
    .bind((bind_addr, port))?
    .run()
    .await
}

//! HTTP surface of ARC-14: an axum router over the tracker store plus the
//! server lifecycle that owns the reminder scheduler.

mod error;
mod routes;

use std::any::Any;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use arc14_common::{Arc14Config, NotificationConfig};
use arc14_core::window::SchedulingWindow;
use arc14_core::{Clock, SystemClock};
use arc14_notify::{Notifier, ReminderScheduler, ReminderSettings, SendGridMailer};
use arc14_store::TrackerStore;
use axum::http::{HeaderValue, Method, StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::{Json, Router};
use serde_json::json;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::cors::{Any as AnyOrigin, CorsLayer};
use tracing::{error, info, warn};

pub use error::{ApiError, internal_error};

/// Shared by every handler. Each request opens its own store handle.
pub struct AppState {
    pub db_path: PathBuf,
    pub clock: Arc<dyn Clock>,
    pub window: SchedulingWindow,
    pub notifier: Arc<dyn Notifier>,
    pub notifications: NotificationConfig,
}

impl AppState {
    pub fn from_config(config: &Arc14Config) -> Result<Self> {
        let mailer = SendGridMailer::from_config(&config.notifications)?;
        Ok(Self {
            db_path: config.database.path.clone(),
            clock: Arc::new(SystemClock),
            window: SchedulingWindow::new(config.scheduling.cutoff_hour),
            notifier: Arc::new(mailer),
            notifications: config.notifications.clone(),
        })
    }
}

pub fn router(state: Arc<AppState>) -> Router {
    routes::api().with_state(state)
}

fn cors_layer(allowed_origins: &[String]) -> Result<CorsLayer> {
    let layer = CorsLayer::new()
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION]);
    if allowed_origins.is_empty() {
        return Ok(layer.allow_origin(AnyOrigin));
    }
    let origins = allowed_origins
        .iter()
        .map(|origin| {
            HeaderValue::from_str(origin).with_context(|| format!("invalid CORS origin: {origin}"))
        })
        .collect::<Result<Vec<_>>>()?;
    Ok(layer.allow_origin(origins))
}

fn panic_response(err: Box<dyn Any + Send + 'static>) -> Response {
    let detail = err
        .downcast_ref::<String>()
        .map(String::as_str)
        .or_else(|| err.downcast_ref::<&str>().copied())
        .unwrap_or("unknown panic");
    error!(panic = detail, "handler panicked");
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({ "message": "Something went wrong!" })),
    )
        .into_response()
}

/// Router with the CORS and panic layers applied, as served.
pub fn app(state: Arc<AppState>, allowed_origins: &[String]) -> Result<Router> {
    Ok(router(state)
        .layer(CatchPanicLayer::custom(panic_response))
        .layer(cors_layer(allowed_origins)?))
}

/// Runs the API until ctrl-c, with the reminder scheduler alongside it.
pub async fn serve(config: &Arc14Config) -> Result<()> {
    // Fail fast on an unusable database before binding.
    TrackerStore::open(&config.database.path)?;

    let state = Arc::new(AppState::from_config(config)?);
    let scheduler = match ReminderSettings::from_config(
        &config.notifications,
        config.database.path.clone(),
    )? {
        Some(settings) => Some(ReminderScheduler::start(
            settings,
            state.notifier.clone(),
            state.clock.clone(),
        )),
        None => {
            warn!("reminder scheduler disabled: notifications off or no recipient configured");
            None
        }
    };

    let service = app(state, &config.server.allowed_origins)?;
    let bind_addr = config.server.bind.as_str();
    let addr: SocketAddr = bind_addr
        .parse()
        .with_context(|| format!("invalid bind address: {bind_addr}"))?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(
        %addr,
        cutoff_hour = config.scheduling.cutoff_hour,
        db = %config.database.path.display(),
        "ARC-14 API listening"
    );
    axum::serve(listener, service)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    if let Some(scheduler) = scheduler {
        scheduler.stop().await;
    }
    info!("server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        error!(error = %err, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
}

fn open_store(state: &AppState) -> Result<TrackerStore, ApiError> {
    TrackerStore::open(&state.db_path).map_err(internal_error)
}

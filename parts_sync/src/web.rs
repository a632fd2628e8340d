//! Control surface for the scrape worker
//!
//! Read-only catalog endpoints plus a trigger for the next batch run.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{Html, Json},
    routing::{get, post},
    Router,
};
use rusqlite::Connection;
use serde::Serialize;
use std::sync::{Arc, Mutex, MutexGuard};

use crate::database::{get_part, list_parts};
use crate::models::CatalogItem;
use crate::trigger::ScrapeTrigger;
use crate::worker::{SharedStatus, WorkerStatus};

/// Shared application state (thread-safe database connection + worker handles)
#[derive(Clone)]
struct AppState {
    db: Arc<Mutex<Connection>>,
    trigger: ScrapeTrigger,
    status: SharedStatus,
}

impl AppState {
    fn conn(&self) -> Result<MutexGuard<'_, Connection>, ApiError> {
        self.db.lock().map_err(|_| {
            log::error!("Database lock poisoned");
            ApiResponse::err(StatusCode::INTERNAL_SERVER_ERROR, "database unavailable")
        })
    }
}

/// API response wrapper
#[derive(Serialize)]
struct ApiResponse<T> {
    success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

/// Failed request: status code plus an `ApiResponse` carrying the message
type ApiError = (StatusCode, Json<ApiResponse<()>>);

impl<T> ApiResponse<T> {
    fn ok(data: T) -> Json<Self> {
        Json(Self {
            success: true,
            data: Some(data),
            error: None,
        })
    }
}

impl ApiResponse<()> {
    fn err(status: StatusCode, message: impl Into<String>) -> ApiError {
        (
            status,
            Json(Self {
                success: false,
                data: None,
                error: Some(message.into()),
            }),
        )
    }
}

#[derive(Serialize)]
struct UpdateQueued {
    /// False when a run was already pending
    queued: bool,
}

/// GET / - Serve the control page
async fn index_handler() -> Html<&'static str> {
    Html(include_str!("../static/index.html"))
}

/// GET /api/parts
async fn parts_handler(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<Vec<CatalogItem>>>, ApiError> {
    let conn = state.conn()?;

    match list_parts(&conn) {
        Ok(parts) => Ok(ApiResponse::ok(parts)),
        Err(e) => {
            log::error!("Failed to list parts: {}", e);
            Err(ApiResponse::err(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))
        }
    }
}

/// GET /api/parts/{mpn}
async fn part_handler(
    State(state): State<AppState>,
    Path(mpn): Path<String>,
) -> Result<Json<ApiResponse<CatalogItem>>, ApiError> {
    let conn = state.conn()?;

    match get_part(&conn, &mpn) {
        Ok(Some(part)) => Ok(ApiResponse::ok(part)),
        Ok(None) => Err(ApiResponse::err(
            StatusCode::NOT_FOUND,
            format!("Part {} not found", mpn),
        )),
        Err(e) => {
            log::error!("Failed to look up part {}: {}", mpn, e);
            Err(ApiResponse::err(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))
        }
    }
}

/// POST /api/update - queue a batch run
async fn update_handler(State(state): State<AppState>) -> Json<ApiResponse<UpdateQueued>> {
    let queued = state.trigger.request();
    ApiResponse::ok(UpdateQueued { queued })
}

/// GET /api/status
async fn status_handler(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<WorkerStatus>>, ApiError> {
    let status = state
        .status
        .lock()
        .map_err(|_| {
            ApiResponse::err(StatusCode::INTERNAL_SERVER_ERROR, "worker status unavailable")
        })?
        .clone();
    Ok(ApiResponse::ok(status))
}

/// Build the control surface router
pub fn create_router(db: Arc<Mutex<Connection>>, trigger: ScrapeTrigger, status: SharedStatus) -> Router {
    let state = AppState {
        db,
        trigger,
        status,
    };

    Router::new()
        .route("/", get(index_handler))
        .route("/api/parts", get(parts_handler))
        .route("/api/parts/{mpn}", get(part_handler))
        .route("/api/update", post(update_handler))
        .route("/api/status", get(status_handler))
        .with_state(state)
}

/// Start the control surface and run until Ctrl-C
///
/// Binds to 0.0.0.0 (all interfaces). Dropping the router on return also
/// drops its triggers, which lets the worker thread exit.
pub async fn serve(app: Router, port: u16) -> std::io::Result<()> {
    let addr = format!("0.0.0.0:{}", port);
    log::info!("Control surface listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                log::error!("Failed to listen for Ctrl-C: {}", e);
            }
            log::info!("Shutting down control surface");
        })
        .await
}

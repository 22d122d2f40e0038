use axum::{
    extract::{rejection::JsonRejection, MatchedPath, Query, Request, State},
    http::{header, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use log::{error, info};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;
use tower_http::cors::{Any, CorsLayer};

use crate::error::SegmentError;
use crate::history::{month_bounds, render_csv};
use crate::service::SegmentService;

type DynError = Box<dyn std::error::Error + Send + Sync>;

// State for segment API handlers
pub struct AppState {
    pub service: SegmentService,
}

#[derive(Debug, Deserialize)]
pub struct CreateSegmentBody {
    /// Name of the new segment; names of current or past segments are refused
    pub name: String,
    /// Share of users enrolled without asking, 0..=100 (default: 0)
    #[serde(default)]
    pub percent: i64,
}

#[derive(Debug, Deserialize)]
pub struct DeleteSegmentBody {
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub struct GetSegmentsBody {
    pub id: i64,
}

#[derive(Debug, Deserialize)]
pub struct UpdateUserBody {
    pub id: i64,
    #[serde(default)]
    pub add_to_segments: Vec<String>,
    #[serde(default)]
    pub remove_from_segments: Vec<String>,
    /// Seconds until the added segments are taken away again (0 = never)
    #[serde(default)]
    pub ttl: u64,
}

#[derive(Debug, Deserialize)]
pub struct HistoryBody {
    pub year: i32,
    pub month: u32,
}

/// `status` is `ok` or `error`; `error` is set only in the latter case
#[derive(Debug, PartialEq, Serialize, Deserialize)]
pub struct ResponseUsual {
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, PartialEq, Serialize, Deserialize)]
pub struct ResponseGetSegments {
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub segments: Vec<String>,
}

#[derive(Debug, PartialEq, Serialize, Deserialize)]
pub struct ResponseHistory {
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Relative link to the CSV export, set when `status` is `ok`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub link: Option<String>,
}

impl ResponseUsual {
    fn ok() -> Self {
        Self {
            status: "ok".to_string(),
            error: None,
        }
    }

    fn error(message: impl Into<String>) -> Self {
        Self {
            status: "error".to_string(),
            error: Some(message.into()),
        }
    }
}

/// Build the API router around a running service
pub fn router(service: SegmentService) -> Router {
    let app_state = Arc::new(AppState { service });

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/", get(index_handler))
        .route("/health", get(health_handler))
        .route("/create_segment", post(create_segment_handler))
        .route("/delete_segment", post(delete_segment_handler))
        .route("/get_segments", post(get_segments_handler))
        .route("/update_user", post(update_user_handler))
        .route("/history", get(history_csv_handler).post(history_link_handler))
        .route_layer(middleware::from_fn(log_request))
        .layer(cors)
        .with_state(app_state)
}

/// Serve the API until Ctrl-C, then close the store
pub async fn serve(service: SegmentService, port: u16) -> Result<(), DynError> {
    let app = router(service.clone());

    let listener = tokio::net::TcpListener::bind(format!("[::]:{}", port))
        .await
        .map_err(|e| format!("Failed to bind to port {}: {}", port, e))?;

    info!("Listening on: http://[::]:{} (IPv4 + IPv6)", port);
    info!("Endpoints:");
    info!("  POST /create_segment  - Create a segment");
    info!("  POST /delete_segment  - Delete a segment");
    info!("  POST /update_user  - Add/remove user segments");
    info!("  POST /get_segments  - List user segments");
    info!("  POST /history  - Link to a monthly history export");
    info!("  GET /history?year=<Y>&month=<M>  - Monthly history as CSV");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| format!("Server error: {}", e))?;

    service.close().await;
    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for shutdown signal: {}", e);
    }
    info!("Shutting down");
}

async fn log_request(request: Request, next: Next) -> Response {
    let method = request.method().clone();
    let uri = request.uri().clone();
    let route = request
        .extensions()
        .get::<MatchedPath>()
        .map(|p| p.as_str().to_string())
        .unwrap_or_default();
    let start = Instant::now();

    let response = next.run(request).await;

    info!(
        "{} {} {} {} {:?}",
        method,
        uri,
        route,
        response.status().as_u16(),
        start.elapsed()
    );
    response
}

// Domain errors go back verbatim; store errors are logged and stay opaque.
fn error_message(e: &SegmentError) -> String {
    if !e.is_domain() {
        error!("Request failed: {}", e.detail());
    }
    e.to_string()
}

fn usual(result: Result<(), SegmentError>) -> Json<ResponseUsual> {
    match result {
        Ok(()) => Json(ResponseUsual::ok()),
        Err(e) => Json(ResponseUsual::error(error_message(&e))),
    }
}

async fn index_handler() -> impl IntoResponse {
    (StatusCode::OK, "Segment service")
}

// Health check endpoint - returns 200 OK if server is running
async fn health_handler() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}

async fn create_segment_handler(
    State(state): State<Arc<AppState>>,
    body: Result<Json<CreateSegmentBody>, JsonRejection>,
) -> Json<ResponseUsual> {
    let Json(body) = match body {
        Ok(body) => body,
        Err(e) => return Json(ResponseUsual::error(e.body_text())),
    };
    usual(state.service.create_segment(&body.name, body.percent).await)
}

async fn delete_segment_handler(
    State(state): State<Arc<AppState>>,
    body: Result<Json<DeleteSegmentBody>, JsonRejection>,
) -> Json<ResponseUsual> {
    let Json(body) = match body {
        Ok(body) => body,
        Err(e) => return Json(ResponseUsual::error(e.body_text())),
    };
    usual(state.service.delete_segment(&body.name).await)
}

async fn update_user_handler(
    State(state): State<Arc<AppState>>,
    body: Result<Json<UpdateUserBody>, JsonRejection>,
) -> Json<ResponseUsual> {
    let Json(body) = match body {
        Ok(body) => body,
        Err(e) => return Json(ResponseUsual::error(e.body_text())),
    };
    usual(
        state
            .service
            .update_user(
                body.id,
                &body.add_to_segments,
                &body.remove_from_segments,
                body.ttl,
            )
            .await,
    )
}

async fn get_segments_handler(
    State(state): State<Arc<AppState>>,
    body: Result<Json<GetSegmentsBody>, JsonRejection>,
) -> Json<ResponseGetSegments> {
    let Json(body) = match body {
        Ok(body) => body,
        Err(e) => {
            return Json(ResponseGetSegments {
                status: "error".to_string(),
                error: Some(e.body_text()),
                segments: Vec::new(),
            })
        }
    };

    match state.service.get_segments(body.id).await {
        Ok(segments) => Json(ResponseGetSegments {
            status: "ok".to_string(),
            error: None,
            segments,
        }),
        Err(e) => Json(ResponseGetSegments {
            status: "error".to_string(),
            error: Some(error_message(&e)),
            segments: Vec::new(),
        }),
    }
}

async fn history_link_handler(
    body: Result<Json<HistoryBody>, JsonRejection>,
) -> Json<ResponseHistory> {
    let Json(body) = match body {
        Ok(body) => body,
        Err(e) => {
            return Json(ResponseHistory {
                status: "error".to_string(),
                error: Some(e.body_text()),
                link: None,
            })
        }
    };

    match month_bounds(body.year, body.month) {
        Ok(_) => Json(ResponseHistory {
            status: "ok".to_string(),
            error: None,
            link: Some(format!(
                "/history?year={}&month={}",
                body.year, body.month
            )),
        }),
        Err(e) => Json(ResponseHistory {
            status: "error".to_string(),
            error: Some(e.to_string()),
            link: None,
        }),
    }
}

fn plain_status(status: StatusCode) -> Response {
    (
        status,
        [(header::CONTENT_TYPE, "text/plain; charset=UTF-8")],
        format!("{}\n", status.as_u16()),
    )
        .into_response()
}

async fn history_csv_handler(
    State(state): State<Arc<AppState>>,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    let year = params.get("year").and_then(|v| v.parse::<i32>().ok());
    let month = params.get("month").and_then(|v| v.parse::<u32>().ok());
    let (year, month) = match (year, month) {
        (Some(year), Some(month)) => (year, month),
        _ => return plain_status(StatusCode::NOT_FOUND),
    };

    match state.service.get_history(year, month).await {
        Ok(records) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "text/csv; charset=UTF-8")],
            render_csv(&records),
        )
            .into_response(),
        Err(SegmentError::BadTime) => plain_status(StatusCode::NOT_FOUND),
        Err(e) => {
            error!("Failed to export history for {}-{}: {}", year, month, e.detail());
            plain_status(StatusCode::INTERNAL_SERVER_ERROR)
        }
    }
}

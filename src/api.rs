//! HTTP query surface.
//!
//! | Route            | Response                                   |
//! |------------------|--------------------------------------------|
//! | `GET /`          | plaintext acknowledgment                   |
//! | `GET /status`    | `True` / `False` for `?line=`              |
//! | `GET /uptime`    | uptime fraction for `?line=`               |
//! | `GET /lines`     | JSON snapshot of every tracked line        |

use axum::Json;
use axum::Router;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use serde::Deserialize;

use crate::error::QueryError;
use crate::query::QueryService;
use crate::tracker::TrackerSnapshot;

pub const ROOT_MESSAGE: &str = "Monitoring subway delays. Check console for alerts.";

/// Query string accepted by `/status` and `/uptime`.
#[derive(Debug, Deserialize)]
pub struct LineParams {
    pub line: Option<String>,
}

impl LineParams {
    fn line(&self) -> Result<&str, QueryError> {
        self.line
            .as_deref()
            .filter(|line| !line.is_empty())
            .ok_or(QueryError::MissingLine)
    }
}

impl IntoResponse for QueryError {
    fn into_response(self) -> Response {
        let status = match self {
            QueryError::MissingLine | QueryError::InvalidLine(_) => StatusCode::BAD_REQUEST,
            QueryError::UndefinedUptime => StatusCode::SERVICE_UNAVAILABLE,
        };
        (status, format!("ERROR: {self}")).into_response()
    }
}

pub fn router(service: QueryService) -> Router {
    Router::new()
        .route("/", get(show_started))
        .route("/status", get(is_delayed))
        .route("/uptime", get(uptime))
        .route("/lines", get(lines))
        .with_state(service)
}

async fn show_started() -> &'static str {
    ROOT_MESSAGE
}

async fn is_delayed(
    State(service): State<QueryService>,
    Query(params): Query<LineParams>,
) -> Result<&'static str, QueryError> {
    let status = service.status(params.line()?).await?;
    Ok(if status.is_delayed() { "True" } else { "False" })
}

async fn uptime(
    State(service): State<QueryService>,
    Query(params): Query<LineParams>,
) -> Result<String, QueryError> {
    let uptime = service.uptime(params.line()?).await?;
    // Debug keeps the trailing ".0" on whole numbers.
    Ok(format!("{uptime:?}"))
}

async fn lines(State(service): State<QueryService>) -> Json<TrackerSnapshot> {
    Json(service.snapshot().await)
}

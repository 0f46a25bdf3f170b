use std::path::{Component, Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use axum::Router;
use axum::extract::{self, DefaultBodyLimit, State};
use axum::http::{StatusCode, header};
use axum::response::{Html, IntoResponse, Response};
use axum::routing::{get, post};
use tokio::sync::oneshot;

use super::state::{CollectorState, DeliveryRejection};
use crate::models::RunReport;

const INDEX_PAGE: &str = include_str!("../../data/index.html");

/// State shared between the HTTP handlers and the owning [`Collector`](super::Collector).
pub(crate) struct Shared {
    state: Mutex<CollectorState>,
    waiter: Mutex<Option<oneshot::Sender<RunReport>>>,
    assets: Option<PathBuf>,
}

impl Shared {
    pub(crate) fn new(waiter: oneshot::Sender<RunReport>, assets: Option<PathBuf>) -> Self {
        Self {
            state: Mutex::new(CollectorState::Idle),
            waiter: Mutex::new(Some(waiter)),
            assets,
        }
    }

    pub(crate) fn state(&self) -> MutexGuard<'_, CollectorState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn hand_over(&self, report: RunReport) {
        let waiter = self
            .waiter
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(waiter) = waiter
            && waiter.send(report).is_err()
        {
            tracing::warn!("report delivered but nobody is waiting for it");
        }
    }
}

/// `max_payload` of `None` accepts a report of any size.
pub(crate) fn router(shared: Arc<Shared>, max_payload: Option<usize>) -> Router {
    let body_limit = match max_payload {
        Some(bytes) => DefaultBodyLimit::max(bytes),
        None => DefaultBodyLimit::disable(),
    };
    Router::new()
        .route("/", get(index))
        .route("/submit", post(submit).layer(body_limit))
        .route("/assets/{*path}", get(asset))
        .with_state(shared)
}

async fn submit(State(shared): State<Arc<Shared>>, body: String) -> (StatusCode, String) {
    let delivered = shared.state().deliver(&body);
    match delivered {
        Ok(report) => {
            tracing::info!(
                groups = report.group_reports.len(),
                bytes = body.len(),
                "report delivered"
            );
            shared.hand_over(report);
            (StatusCode::OK, "Success".to_string())
        }
        Err(DeliveryRejection::Malformed(reason)) => {
            tracing::warn!(%reason, "rejected malformed report, still waiting");
            (StatusCode::BAD_REQUEST, reason)
        }
        Err(rejection) => {
            tracing::warn!(%rejection, "rejected delivery");
            (StatusCode::CONFLICT, rejection.to_string())
        }
    }
}

async fn index(State(shared): State<Arc<Shared>>) -> Response {
    if let Some(dir) = &shared.assets
        && let Ok(page) = tokio::fs::read(dir.join("index.html")).await
    {
        return ([(header::CONTENT_TYPE, "text/html; charset=utf-8")], page).into_response();
    }
    Html(INDEX_PAGE).into_response()
}

async fn asset(
    State(shared): State<Arc<Shared>>,
    extract::Path(path): extract::Path<String>,
) -> Response {
    let Some(dir) = &shared.assets else {
        return StatusCode::NOT_FOUND.into_response();
    };
    let Some(relative) = asset_path(&path) else {
        return (StatusCode::BAD_REQUEST, "invalid asset path").into_response();
    };

    match tokio::fs::read(dir.join(&relative)).await {
        Ok(bytes) => ([(header::CONTENT_TYPE, content_type(&relative))], bytes).into_response(),
        Err(err) => {
            tracing::debug!(path = %relative.display(), %err, "asset not served");
            StatusCode::NOT_FOUND.into_response()
        }
    }
}

/// Only plain relative paths below the assets directory are served.
fn asset_path(raw: &str) -> Option<PathBuf> {
    let path = Path::new(raw);
    let mut components = path.components().peekable();
    components.peek()?;
    components
        .all(|component| matches!(component, Component::Normal(_)))
        .then(|| path.to_path_buf())
}

fn content_type(path: &Path) -> &'static str {
    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase);
    match extension.as_deref() {
        Some("html" | "htm") => "text/html; charset=utf-8",
        Some("js" | "mjs") => "text/javascript; charset=utf-8",
        Some("css") => "text/css; charset=utf-8",
        Some("json" | "map") => "application/json",
        Some("wasm") => "application/wasm",
        Some("svg") => "image/svg+xml",
        Some("png") => "image/png",
        Some("ico") => "image/x-icon",
        Some("txt") => "text/plain; charset=utf-8",
        _ => "application/octet-stream",
    }
}

//! HTTP routes for the task gateway.
//!
//! | Method | Path                  | Coordinator call |
//! |--------|-----------------------|------------------|
//! | GET    | `/api/v1/health`      | none             |
//! | POST   | `/api/v1/tasks`       | `submit`         |
//! | GET    | `/api/v1/tasks`       | `list_tasks`     |
//! | GET    | `/api/v1/tasks/{id}`  | `get_status`     |
//!
//! Every request runs under a deadline (`server.write_timeout_ms`). When it
//! fires the handler future is dropped, which cancels whatever store or
//! backend call was in flight, and the client receives 408.

use std::sync::Arc;
use std::time::Duration;

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use taskgate_tasks::constants::DEFAULT_LIST_LIMIT;
use taskgate_tasks::{ListQuery, Submission, SubmitTask, TaskCoordinator, TaskError, TaskState, TaskView};
use tower::ServiceBuilder;
use tower_http::timeout::{RequestBodyTimeoutLayer, TimeoutLayer};
use tower_http::trace::TraceLayer;

use crate::error::ApiError;

/// Shared state handed to every handler.
#[derive(Debug, Clone)]
pub struct AppState {
    pub coordinator: TaskCoordinator,
}

/// Per-request time limits.
#[derive(Debug, Clone, Copy)]
pub struct Timeouts {
    /// Limit for receiving the request body.
    pub read: Duration,
    /// Limit for producing the whole response.
    pub request: Duration,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            read: Duration::from_secs(15),
            request: Duration::from_secs(15),
        }
    }
}

/// Builds the gateway router.
pub fn router(coordinator: TaskCoordinator, timeouts: Timeouts) -> Router {
    let state = Arc::new(AppState { coordinator });

    let api = Router::new()
        .route("/health", get(health))
        .route("/tasks", get(list_tasks).post(submit_task))
        .route("/tasks/{id}", get(get_task));

    Router::new()
        .nest("/api/v1", api)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(RequestBodyTimeoutLayer::new(timeouts.read))
                .layer(TimeoutLayer::with_status_code(
                    StatusCode::REQUEST_TIMEOUT,
                    timeouts.request,
                )),
        )
        .with_state(state)
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

async fn submit_task(
    State(state): State<Arc<AppState>>,
    body: Result<Json<SubmitTask>, JsonRejection>,
) -> Result<Json<TaskView>, ApiError> {
    let Json(body) = body.map_err(|rejection| {
        tracing::debug!(error = %rejection, "unreadable submission body");
        ApiError::InvalidRequest
    })?;
    body.validate()?;

    let id = state.coordinator.submit(Submission::from(body)).await?;
    Ok(Json(TaskView::accepted(id)))
}

async fn get_task(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<TaskView>, ApiError> {
    let view = state.coordinator.get_status(&id).await?;
    Ok(Json(view))
}

/// Raw listing parameters.
///
/// Kept as strings so unusable `limit`/`offset` values fall back to their
/// defaults instead of failing extraction.
#[derive(Debug, Default, Deserialize)]
pub struct ListParams {
    pub status: Option<String>,
    pub limit: Option<String>,
    pub offset: Option<String>,
}

impl ListParams {
    /// Resolves the parameters into a [`ListQuery`].
    ///
    /// An empty `status` means no filter; an unknown one is rejected.
    /// `limit` falls back to 10 unless it is a positive integer, `offset`
    /// to 0 unless it is a non-negative integer.
    pub fn into_query(self) -> Result<ListQuery, ApiError> {
        let mut query = ListQuery::default();

        if let Some(status) = self.status.as_deref().filter(|s| !s.trim().is_empty()) {
            let status: TaskState = status.parse().map_err(|e| match e {
                TaskError::InvalidRequest(message) => ApiError::BadQuery(message),
                other => ApiError::from(other),
            })?;
            query = query.with_status(status);
        }

        let limit = self
            .limit
            .and_then(|l| l.trim().parse::<i64>().ok())
            .filter(|l| *l > 0)
            .and_then(|l| usize::try_from(l).ok())
            .unwrap_or(DEFAULT_LIST_LIMIT);
        let offset = self
            .offset
            .and_then(|o| o.trim().parse::<i64>().ok())
            .and_then(|o| usize::try_from(o).ok())
            .unwrap_or(0);

        Ok(query.with_limit(limit).with_offset(offset))
    }
}

/// A page of tasks.
#[derive(Debug, Serialize, Deserialize)]
pub struct TaskList {
    pub tasks: Vec<TaskView>,
    pub meta: PageMeta,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageMeta {
    pub limit: usize,
    pub offset: usize,
    /// Number of tasks in this page.
    pub total: usize,
}

async fn list_tasks(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ListParams>,
) -> Result<Json<TaskList>, ApiError> {
    let query = params.into_query()?;
    let tasks = state.coordinator.list_tasks(&query).await?;
    tracing::debug!(
        status = ?query.status,
        limit = query.limit,
        offset = query.offset,
        returned = tasks.len(),
        "listed tasks"
    );
    let meta = PageMeta {
        limit: query.limit,
        offset: query.offset,
        total: tasks.len(),
    };
    Ok(Json(TaskList { tasks, meta }))
}

//! HTTP Request Handlers
//!
//! Maps the REST surface onto `TieredStore` operations and translates store
//! errors into HTTP statuses:
//!
//! - missing fields and `DuplicateTitle` -> 400
//! - `NotFound` -> 404
//! - `Unavailable` surviving both tiers -> 500 "No storage available"
//! - anything else -> 500 with the failure echoed in `details`
//!
//! A primary that cannot be reached never surfaces to the client as an
//! error; the request is re-run against the fallback inside `TieredStore`.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use super::protocol::{Confirmation, DbHealth, ErrorBody, TodoCreated, TodoPayload};
use crate::store::document::DocumentStore;
use crate::store::failover::TieredStore;
use crate::store::types::{StoreError, Todo};

/// Dependencies shared by every handler.
///
/// Both stores are injected, so tests can wire any backend pair. The
/// document store appears twice: inside `TieredStore` as the primary tier,
/// and directly for the health probe, which must not fail over.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<TieredStore>,
    pub primary: Arc<DocumentStore>,
}

/// Builds the public router. Tests drive this exact router through
/// `tower::ServiceExt::oneshot`.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(banner))
        .route("/todos", get(list_todos).post(create_todo))
        .route(
            "/todos/:id",
            get(get_todo).put(update_todo).delete(delete_todo),
        )
        .route("/health/db", get(db_health))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Error that renders as `{"error": ..., "details": ...}` with the matching
/// HTTP status.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    error: String,
    details: Option<String>,
}

impl ApiError {
    fn new(status: StatusCode, error: impl Into<String>) -> Self {
        Self {
            status,
            error: error.into(),
            details: None,
        }
    }

    fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    /// Translates a store failure. `action` names the operation for the 500
    /// payload ("Failed to fetch todos" and friends); data-level errors use
    /// their canonical messages instead.
    fn from_store(err: StoreError, action: &str) -> Self {
        match err {
            StoreError::DuplicateTitle => Self::new(
                StatusCode::BAD_REQUEST,
                "Todo with this title already exists",
            ),
            StoreError::NotFound => Self::new(StatusCode::NOT_FOUND, "Todo not found"),
            StoreError::Unavailable(details) => {
                Self::new(StatusCode::INTERNAL_SERVER_ERROR, "No storage available")
                    .with_details(details)
            }
            StoreError::Unexpected(details) => {
                Self::new(StatusCode::INTERNAL_SERVER_ERROR, action).with_details(details)
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            tracing::error!(
                "{}: {}",
                self.error,
                self.details.as_deref().unwrap_or("no details")
            );
        }

        let body = ErrorBody {
            error: self.error,
            details: self.details,
        };
        (self.status, Json(body)).into_response()
    }
}

async fn banner() -> &'static str {
    "Todo API is running!"
}

async fn list_todos(State(state): State<AppState>) -> Result<Json<Vec<Todo>>, ApiError> {
    let (todos, tier) = state
        .store
        .list_all()
        .await
        .map_err(|e| ApiError::from_store(e, "Failed to fetch todos"))?;

    tracing::debug!("Listed {} todos from {} store", todos.len(), tier);
    Ok(Json(todos))
}

async fn create_todo(
    State(state): State<AppState>,
    Json(payload): Json<TodoPayload>,
) -> Result<(StatusCode, Json<TodoCreated>), ApiError> {
    let (title, description) = require_fields(&payload)?;

    let (todo, storage) = state
        .store
        .create(title, description)
        .await
        .map_err(|e| ApiError::from_store(e, "Failed to create todo"))?;

    tracing::info!("Created todo {} on {} store", todo.id, storage);
    Ok((
        StatusCode::CREATED,
        Json(TodoCreated {
            message: "Todo created successfully".to_string(),
            todo,
            storage,
        }),
    ))
}

async fn get_todo(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Todo>, ApiError> {
    let (todo, _) = state
        .store
        .get_by_id(&id)
        .await
        .map_err(|e| ApiError::from_store(e, "Failed to fetch todo"))?;

    Ok(Json(todo))
}

async fn update_todo(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(payload): Json<TodoPayload>,
) -> Result<Json<Confirmation>, ApiError> {
    let (title, description) = require_fields(&payload)?;

    let (todo, storage) = state
        .store
        .update(&id, title, description)
        .await
        .map_err(|e| ApiError::from_store(e, "Failed to update todo"))?;

    tracing::info!("Updated todo {} on {} store", todo.id, storage);
    Ok(Json(Confirmation {
        message: "Todo updated successfully".to_string(),
        storage,
    }))
}

async fn delete_todo(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Confirmation>, ApiError> {
    let ((), storage) = state
        .store
        .delete(&id)
        .await
        .map_err(|e| ApiError::from_store(e, "Failed to delete todo"))?;

    tracing::info!("Deleted todo {} on {} store", id, storage);
    Ok(Json(Confirmation {
        message: "Todo deleted successfully".to_string(),
        storage,
    }))
}

async fn db_health(State(state): State<AppState>) -> Result<Json<DbHealth>, ApiError> {
    let version = state.primary.probe().await.map_err(|e| {
        ApiError::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            "Database connection failed",
        )
        .with_details(e.to_string())
    })?;

    Ok(Json(DbHealth {
        message: "Database connection successful!".to_string(),
        database: state.primary.database().to_string(),
        version,
        status: "connected".to_string(),
    }))
}

/// Presence check shared by create and update: both fields must exist and
/// contain something other than whitespace.
fn require_fields(payload: &TodoPayload) -> Result<(&str, &str), ApiError> {
    match (payload.title.as_deref(), payload.description.as_deref()) {
        (Some(title), Some(description))
            if !title.trim().is_empty() && !description.trim().is_empty() =>
        {
            Ok((title, description))
        }
        _ => Err(ApiError::new(
            StatusCode::BAD_REQUEST,
            "Title and description are required",
        )),
    }
}

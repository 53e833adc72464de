//! API Router Tests
//!
//! Drives the real router through `tower::ServiceExt::oneshot`. The primary
//! document store points at an unreachable endpoint, so by default every
//! request exercises the failover path; one memory-backed state stands in
//! for a healthy primary to pin the tier reporting, and an in-process
//! stand-in server backs the healthy half of the database health check.
//!
//! ## Test Scopes
//! - **Status mapping**: validation, duplicate titles, missing records.
//! - **Response shapes**: bare reads, enveloped mutations, error bodies.
//! - **Failover**: all endpoints stay functional with the primary down.

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use axum::body::{Body, to_bytes};
    use axum::http::{Request, StatusCode, header};
    use axum::routing::{get, put};
    use axum::{Json, Router};
    use chrono::{DateTime, Utc};
    use serde_json::{Value, json};
    use tower::ServiceExt;

    use crate::api::handlers::{AppState, router};
    use crate::store::document::{DocumentStore, DocumentStoreConfig};
    use crate::store::failover::TieredStore;
    use crate::store::memory::MemoryStore;

    fn unreachable_primary() -> Arc<DocumentStore> {
        Arc::new(
            DocumentStore::new(DocumentStoreConfig {
                endpoint: "http://127.0.0.1:9".to_string(),
                database: "todo-test".to_string(),
                request_timeout: Duration::from_millis(250),
                connect_timeout: Duration::from_millis(250),
            })
            .unwrap(),
        )
    }

    /// State whose primary refuses connections: requests succeed through
    /// the fallback and report `"storage": "fallback"`.
    fn fallback_state() -> AppState {
        let primary = unreachable_primary();
        let store = Arc::new(TieredStore::new(
            primary.clone(),
            Arc::new(MemoryStore::new()),
        ));
        AppState { store, primary }
    }

    /// State whose tiered primary is a healthy memory store; the document
    /// store only backs the health endpoint.
    fn memory_primary_state() -> AppState {
        let store = Arc::new(TieredStore::new(
            Arc::new(MemoryStore::new()),
            Arc::new(MemoryStore::new()),
        ));
        AppState {
            store,
            primary: unreachable_primary(),
        }
    }

    /// Stand-in for the document server covering just the health probe's
    /// handshake: server info plus database creation.
    async fn spawn_stub_db() -> String {
        let app = Router::new()
            .route(
                "/",
                get(|| async { Json(json!({"couchdb": "Welcome", "version": "3.3.0"})) }),
            )
            .route("/:db", put(|| async { StatusCode::CREATED }));

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let endpoint = format!("http://{}", listener.local_addr().unwrap());
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        endpoint
    }

    /// State whose primary handshake succeeds against the in-process
    /// stand-in server.
    async fn live_primary_state() -> AppState {
        let primary = Arc::new(
            DocumentStore::new(DocumentStoreConfig {
                endpoint: spawn_stub_db().await,
                database: "todo-test".to_string(),
                request_timeout: Duration::from_secs(2),
                connect_timeout: Duration::from_secs(2),
            })
            .unwrap(),
        );
        let store = Arc::new(TieredStore::new(
            primary.clone(),
            Arc::new(MemoryStore::new()),
        ));
        AppState { store, primary }
    }

    async fn send(
        app: &Router,
        method: &str,
        uri: &str,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let request = match body {
            Some(value) => Request::builder()
                .method(method)
                .uri(uri)
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(value.to_string()))
                .unwrap(),
            None => Request::builder()
                .method(method)
                .uri(uri)
                .body(Body::empty())
                .unwrap(),
        };

        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        // The banner endpoint answers plain text; everything else is JSON.
        let value = serde_json::from_slice(&bytes)
            .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).to_string()));

        (status, value)
    }

    fn timestamp(value: &Value) -> DateTime<Utc> {
        value.as_str().unwrap().parse().unwrap()
    }

    // ============================================================
    // BANNER & LIST SHAPES
    // ============================================================

    #[tokio::test]
    async fn test_banner() {
        let app = router(fallback_state());

        let (status, body) = send(&app, "GET", "/", None).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, Value::String("Todo API is running!".to_string()));
    }

    #[tokio::test]
    async fn test_list_returns_bare_array_in_creation_order() {
        let app = router(fallback_state());
        send(
            &app,
            "POST",
            "/todos",
            Some(json!({"title": "one", "description": "a"})),
        )
        .await;
        send(
            &app,
            "POST",
            "/todos",
            Some(json!({"title": "two", "description": "b"})),
        )
        .await;

        let (status, body) = send(&app, "GET", "/todos", None).await;

        assert_eq!(status, StatusCode::OK);
        let titles: Vec<&str> = body
            .as_array()
            .unwrap()
            .iter()
            .map(|todo| todo["title"].as_str().unwrap())
            .collect();
        assert_eq!(titles, ["one", "two"]);
    }

    // ============================================================
    // CREATE
    // ============================================================

    #[tokio::test]
    async fn test_create_returns_created_todo_and_tier() {
        let app = router(fallback_state());

        let (status, body) = send(
            &app,
            "POST",
            "/todos",
            Some(json!({"title": "Buy milk", "description": "Two liters"})),
        )
        .await;

        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["message"], "Todo created successfully");
        assert_eq!(body["storage"], "fallback");
        assert_eq!(body["todo"]["id"], "1");
        assert_eq!(body["todo"]["title"], "Buy milk");
        assert_eq!(body["todo"]["description"], "Two liters");
        assert!(body["todo"]["createdAt"].is_string());
        assert!(body["todo"]["updatedAt"].is_string());
    }

    #[tokio::test]
    async fn test_create_requires_both_fields() {
        let app = router(fallback_state());

        for payload in [
            json!({}),
            json!({"title": "Buy milk"}),
            json!({"description": "Two liters"}),
            json!({"title": "   ", "description": "Two liters"}),
            json!({"title": "Buy milk", "description": ""}),
        ] {
            let (status, body) = send(&app, "POST", "/todos", Some(payload)).await;
            assert_eq!(status, StatusCode::BAD_REQUEST);
            assert_eq!(body["error"], "Title and description are required");
        }

        // None of the rejected payloads was persisted.
        let (_, todos) = send(&app, "GET", "/todos", None).await;
        assert!(todos.as_array().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_create_rejects_duplicate_title() {
        let app = router(fallback_state());
        send(
            &app,
            "POST",
            "/todos",
            Some(json!({"title": "Buy milk", "description": "x"})),
        )
        .await;

        let (status, body) = send(
            &app,
            "POST",
            "/todos",
            Some(json!({"title": "Buy milk", "description": "y"})),
        )
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Todo with this title already exists");

        // Exactly one record survived, with the first description.
        let (_, todos) = send(&app, "GET", "/todos", None).await;
        assert_eq!(todos.as_array().unwrap().len(), 1);
        assert_eq!(todos[0]["description"], "x");
    }

    // ============================================================
    // POINT READ
    // ============================================================

    #[tokio::test]
    async fn test_get_todo_by_id() {
        let app = router(fallback_state());
        let (_, created) = send(
            &app,
            "POST",
            "/todos",
            Some(json!({"title": "Buy milk", "description": "x"})),
        )
        .await;
        let id = created["todo"]["id"].as_str().unwrap().to_string();

        let (status, body) = send(&app, "GET", &format!("/todos/{}", id), None).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["title"], "Buy milk");
        // Point reads return the bare record, no envelope.
        assert!(body.get("message").is_none());
        assert!(body.get("storage").is_none());
    }

    #[tokio::test]
    async fn test_get_unknown_todo_is_404() {
        let app = router(fallback_state());

        let (status, body) = send(&app, "GET", "/todos/999", None).await;

        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"], "Todo not found");
    }

    // ============================================================
    // UPDATE
    // ============================================================

    #[tokio::test]
    async fn test_update_replaces_fields_and_bumps_updated_at() {
        let app = router(fallback_state());
        let (_, created) = send(
            &app,
            "POST",
            "/todos",
            Some(json!({"title": "Buy milk", "description": "x"})),
        )
        .await;
        let id = created["todo"]["id"].as_str().unwrap().to_string();

        tokio::time::sleep(Duration::from_millis(5)).await;
        let (status, body) = send(
            &app,
            "PUT",
            &format!("/todos/{}", id),
            Some(json!({"title": "Buy oat milk", "description": "y"})),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["message"], "Todo updated successfully");
        assert_eq!(body["storage"], "fallback");

        let (_, fetched) = send(&app, "GET", &format!("/todos/{}", id), None).await;
        assert_eq!(fetched["title"], "Buy oat milk");
        assert_eq!(fetched["description"], "y");
        assert_eq!(fetched["createdAt"], created["todo"]["createdAt"]);
        assert!(timestamp(&fetched["updatedAt"]) > timestamp(&created["todo"]["updatedAt"]));
    }

    #[tokio::test]
    async fn test_update_validates_and_maps_errors() {
        let app = router(fallback_state());
        send(
            &app,
            "POST",
            "/todos",
            Some(json!({"title": "first", "description": "a"})),
        )
        .await;
        let (_, created) = send(
            &app,
            "POST",
            "/todos",
            Some(json!({"title": "second", "description": "b"})),
        )
        .await;
        let id = created["todo"]["id"].as_str().unwrap().to_string();

        // Missing description -> 400.
        let (status, body) = send(
            &app,
            "PUT",
            &format!("/todos/{}", id),
            Some(json!({"title": "second"})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Title and description are required");

        // Another record's title -> 400.
        let (status, body) = send(
            &app,
            "PUT",
            &format!("/todos/{}", id),
            Some(json!({"title": "first", "description": "b"})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Todo with this title already exists");

        // Keeping its own title -> 200.
        let (status, _) = send(
            &app,
            "PUT",
            &format!("/todos/{}", id),
            Some(json!({"title": "second", "description": "changed"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);

        // Unknown id -> 404.
        let (status, _) = send(
            &app,
            "PUT",
            "/todos/999",
            Some(json!({"title": "new", "description": "x"})),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    // ============================================================
    // DELETE
    // ============================================================

    #[tokio::test]
    async fn test_delete_todo() {
        let app = router(fallback_state());
        let (_, created) = send(
            &app,
            "POST",
            "/todos",
            Some(json!({"title": "Buy milk", "description": "x"})),
        )
        .await;
        let id = created["todo"]["id"].as_str().unwrap().to_string();

        let (status, body) = send(&app, "DELETE", &format!("/todos/{}", id), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["message"], "Todo deleted successfully");
        assert_eq!(body["storage"], "fallback");

        let (status, _) = send(&app, "GET", &format!("/todos/{}", id), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, body) = send(&app, "DELETE", &format!("/todos/{}", id), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"], "Todo not found");
    }

    // ============================================================
    // TIER REPORTING & HEALTH
    // ============================================================

    #[tokio::test]
    async fn test_healthy_primary_reports_primary_tier() {
        let app = router(memory_primary_state());

        let (_, body) = send(
            &app,
            "POST",
            "/todos",
            Some(json!({"title": "Buy milk", "description": "x"})),
        )
        .await;

        assert_eq!(body["storage"], "primary");
    }

    #[tokio::test]
    async fn test_db_health_reports_failure_when_unreachable() {
        let app = router(fallback_state());

        let (status, body) = send(&app, "GET", "/health/db", None).await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["error"], "Database connection failed");
        assert!(body["details"].is_string());
    }

    #[tokio::test]
    async fn test_db_health_reports_connected_when_reachable() {
        let app = router(live_primary_state().await);

        let (status, body) = send(&app, "GET", "/health/db", None).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["message"], "Database connection successful!");
        assert_eq!(body["database"], "todo-test");
        assert_eq!(body["version"], "3.3.0");
        assert_eq!(body["status"], "connected");
    }

    // ============================================================
    // FULL SESSION WITH PRIMARY DOWN
    // ============================================================

    #[tokio::test]
    async fn test_all_endpoints_work_with_primary_down() {
        let app = router(fallback_state());

        let (status, created) = send(
            &app,
            "POST",
            "/todos",
            Some(json!({"title": "Buy milk", "description": "Two liters"})),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        let id = created["todo"]["id"].as_str().unwrap().to_string();

        let (status, todos) = send(&app, "GET", "/todos", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(todos.as_array().unwrap().len(), 1);

        let (status, fetched) = send(&app, "GET", &format!("/todos/{}", id), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(fetched["title"], "Buy milk");

        let (status, _) = send(
            &app,
            "PUT",
            &format!("/todos/{}", id),
            Some(json!({"title": "Buy oat milk", "description": "One liter"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);

        let (status, _) = send(&app, "DELETE", &format!("/todos/{}", id), None).await;
        assert_eq!(status, StatusCode::OK);

        let (_, todos) = send(&app, "GET", "/todos", None).await;
        assert!(todos.as_array().unwrap().is_empty());
    }
}

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::Html;
use axum::{Json, Router, routing::get};
use serde::Serialize;
use std::net::SocketAddr;

#[derive(Clone)]
struct AppState {
    api_url: String,
    client: reqwest::Client,
}

/// Envelope handed to the browser: the upstream status travels in the body
/// so the page can branch on it without the fetch promise rejecting.
#[derive(Serialize)]
struct ProxyResponse {
    status: u16,
    body: serde_json::Value,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .init();

    let api_url =
        std::env::var("API_URL").unwrap_or_else(|_| "http://127.0.0.1:4000".to_string());
    let bind_addr: SocketAddr = std::env::var("UI_BIND")
        .unwrap_or_else(|_| "127.0.0.1:8080".to_string())
        .parse()?;

    let state = AppState {
        api_url: api_url.trim_end_matches('/').to_string(),
        client: reqwest::Client::new(),
    };

    let app = Router::new()
        .route("/", get(ui))
        .route("/api/todos", get(api_list).post(api_create))
        .route(
            "/api/todos/:id",
            get(api_get).put(api_update).delete(api_delete),
        )
        .with_state(state);

    tracing::info!("Todo UI listening on {}", bind_addr);
    tracing::info!("Proxying to API at {}", api_url);
    axum::serve(tokio::net::TcpListener::bind(bind_addr).await?, app).await?;

    Ok(())
}

async fn ui() -> Html<&'static str> {
    Html(include_str!("ui.html"))
}

async fn api_list(
    State(state): State<AppState>,
) -> Result<Json<ProxyResponse>, (StatusCode, String)> {
    let url = format!("{}/todos", state.api_url);
    let resp = state
        .client
        .get(url)
        .send()
        .await
        .map_err(|e| (StatusCode::BAD_GATEWAY, e.to_string()))?;

    Ok(Json(relay(resp).await))
}

async fn api_create(
    State(state): State<AppState>,
    Json(payload): Json<serde_json::Value>,
) -> Result<Json<ProxyResponse>, (StatusCode, String)> {
    let url = format!("{}/todos", state.api_url);
    let resp = state
        .client
        .post(url)
        .json(&payload)
        .send()
        .await
        .map_err(|e| (StatusCode::BAD_GATEWAY, e.to_string()))?;

    Ok(Json(relay(resp).await))
}

async fn api_get(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ProxyResponse>, (StatusCode, String)> {
    let url = format!("{}/todos/{}", state.api_url, urlencoding::encode(&id));
    let resp = state
        .client
        .get(url)
        .send()
        .await
        .map_err(|e| (StatusCode::BAD_GATEWAY, e.to_string()))?;

    Ok(Json(relay(resp).await))
}

async fn api_update(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(payload): Json<serde_json::Value>,
) -> Result<Json<ProxyResponse>, (StatusCode, String)> {
    let url = format!("{}/todos/{}", state.api_url, urlencoding::encode(&id));
    let resp = state
        .client
        .put(url)
        .json(&payload)
        .send()
        .await
        .map_err(|e| (StatusCode::BAD_GATEWAY, e.to_string()))?;

    Ok(Json(relay(resp).await))
}

async fn api_delete(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ProxyResponse>, (StatusCode, String)> {
    let url = format!("{}/todos/{}", state.api_url, urlencoding::encode(&id));
    let resp = state
        .client
        .delete(url)
        .send()
        .await
        .map_err(|e| (StatusCode::BAD_GATEWAY, e.to_string()))?;

    Ok(Json(relay(resp).await))
}

async fn relay(resp: reqwest::Response) -> ProxyResponse {
    let status = resp.status().as_u16();
    let body = resp
        .json::<serde_json::Value>()
        .await
        .unwrap_or_else(|_| serde_json::json!({"error": "invalid json"}));

    ProxyResponse { status, body }
}

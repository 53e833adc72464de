use std::sync::Arc;

use todo_server::api::handlers::{AppState, router};
use todo_server::store::document::{DocumentStore, DocumentStoreConfig};
use todo_server::store::failover::TieredStore;
use todo_server::store::memory::MemoryStore;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        // .with_max_level(tracing::Level::DEBUG)
        .with_max_level(tracing::Level::INFO)
        .init();

    let bind_addr = std::env::var("TODO_BIND").unwrap_or_else(|_| "127.0.0.1:4000".to_string());
    let db_url =
        std::env::var("TODO_DB_URL").unwrap_or_else(|_| "http://127.0.0.1:5984".to_string());
    let db_name = std::env::var("TODO_DB_NAME").unwrap_or_else(|_| "todo-app".to_string());

    // 1. Storage tiers: document store first, memory fallback second.
    let primary = Arc::new(DocumentStore::new(DocumentStoreConfig {
        endpoint: db_url.clone(),
        database: db_name.clone(),
        ..Default::default()
    })?);
    let fallback = Arc::new(MemoryStore::new());
    let store = Arc::new(TieredStore::new(primary.clone(), fallback));

    // 2. HTTP router:
    let app = router(AppState { store, primary });

    // 3. Start HTTP server:
    tracing::info!("Todo API listening on {}", bind_addr);
    tracing::info!("Document store endpoint: {} (database: {})", db_url, db_name);
    tracing::info!("Press Ctrl+C to shutdown");

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

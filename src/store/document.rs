//! Document Database Store
//!
//! Primary storage backend speaking the CouchDB HTTP dialect. Each todo is
//! one document under a backend-minted UUID identifier.
//!
//! ## Session Lifecycle
//! The constructor only builds the connection pool; nothing touches the
//! network until the first operation. That first caller runs a handshake
//! (server answers, database exists) whose success is cached for the process
//! lifetime. Concurrent first callers wait on the same in-flight handshake,
//! and a failed handshake caches nothing, so the next request starts over
//! from scratch.
//!
//! ## Error Mapping
//! Transport failures and auth rejections become `StoreError::Unavailable`,
//! the signal the failover layer switches on; a connection lost while the
//! body is still arriving counts as transport. A 404 on a point read or
//! delete is a data answer (`NotFound`), not an outage, and an answer that
//! arrived intact but does not parse is `Unexpected`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::sync::OnceCell;
use uuid::Uuid;

use super::failover::RecordStore;
use super::types::{StoreError, Todo};

// Fixed connection behavior: 10 s to conclude the server is gone, a bounded
// pool with a 45 s idle window so connections are reused across requests.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
const POOL_IDLE_TIMEOUT: Duration = Duration::from_secs(45);
const MAX_IDLE_PER_HOST: usize = 10;

/// Connection settings for [`DocumentStore`].
///
/// Defaults target a local CouchDB-compatible server; tests shrink the
/// timeouts to fail fast against unreachable endpoints.
#[derive(Debug, Clone)]
pub struct DocumentStoreConfig {
    /// Server base URL, e.g. `http://127.0.0.1:5984`.
    pub endpoint: String,
    /// Database name; created during the handshake if missing.
    pub database: String,
    pub request_timeout: Duration,
    pub connect_timeout: Duration,
}

impl Default for DocumentStoreConfig {
    fn default() -> Self {
        Self {
            endpoint: "http://127.0.0.1:5984".to_string(),
            database: "todo-app".to_string(),
            request_timeout: REQUEST_TIMEOUT,
            connect_timeout: CONNECT_TIMEOUT,
        }
    }
}

/// Wire form of a todo inside the document database. `_id` and `_rev` are
/// the backend's addressing fields; everything else matches the public
/// record shape.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StoredTodo {
    #[serde(rename = "_id")]
    id: String,
    #[serde(rename = "_rev", skip_serializing_if = "Option::is_none")]
    rev: Option<String>,
    title: String,
    description: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<StoredTodo> for Todo {
    fn from(doc: StoredTodo) -> Self {
        Self {
            id: doc.id,
            title: doc.title,
            description: doc.description,
            created_at: doc.created_at,
            updated_at: doc.updated_at,
        }
    }
}

#[derive(Debug, Deserialize)]
struct ServerInfo {
    #[serde(default)]
    version: String,
}

#[derive(Debug, Deserialize)]
struct AllDocsResponse {
    rows: Vec<AllDocsRow>,
}

#[derive(Debug, Deserialize)]
struct AllDocsRow {
    doc: Option<StoredTodo>,
}

#[derive(Debug, Deserialize)]
struct FindResponse {
    docs: Vec<StoredTodo>,
}

pub struct DocumentStore {
    client: reqwest::Client,
    endpoint: String,
    database: String,
    session: OnceCell<()>,
}

impl DocumentStore {
    /// Builds the connection pool without touching the network.
    pub fn new(config: DocumentStoreConfig) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .connect_timeout(config.connect_timeout)
            .pool_idle_timeout(POOL_IDLE_TIMEOUT)
            .pool_max_idle_per_host(MAX_IDLE_PER_HOST)
            .build()?;

        Ok(Self {
            client,
            endpoint: config.endpoint.trim_end_matches('/').to_string(),
            database: config.database,
            session: OnceCell::new(),
        })
    }

    pub fn database(&self) -> &str {
        &self.database
    }

    /// Reachability probe for the health endpoint. Always re-checks the
    /// server, even when a session is already cached, and reports the server
    /// version on success.
    pub async fn probe(&self) -> Result<String, StoreError> {
        let info = self.server_info().await?;
        self.ensure_session().await?;
        Ok(info.version)
    }

    /// Runs the handshake at most once per process. Concurrent first callers
    /// share one attempt; a failure leaves the cell empty.
    async fn ensure_session(&self) -> Result<(), StoreError> {
        self.session.get_or_try_init(|| self.handshake()).await?;
        Ok(())
    }

    async fn handshake(&self) -> Result<(), StoreError> {
        self.server_info().await?;
        self.ensure_database().await?;
        tracing::info!(
            "Connected to document store at {} (database: {})",
            self.endpoint,
            self.database
        );
        Ok(())
    }

    async fn server_info(&self) -> Result<ServerInfo, StoreError> {
        let response = self
            .client
            .get(format!("{}/", self.endpoint))
            .send()
            .await
            .map_err(transport_error)?;

        let status = response.status();
        if !status.is_success() {
            return Err(status_error(status, "server probe"));
        }

        read_json(response).await
    }

    async fn ensure_database(&self) -> Result<(), StoreError> {
        let response = self
            .client
            .put(self.db_url())
            .send()
            .await
            .map_err(transport_error)?;

        // 201 creates the database, 412 means it already exists. Both leave
        // a usable database behind.
        match response.status() {
            StatusCode::CREATED | StatusCode::PRECONDITION_FAILED => Ok(()),
            status => Err(status_error(status, "database setup")),
        }
    }

    /// Point read keeping the backend's revision marker, which updates and
    /// deletes must quote to address the document.
    async fn fetch_doc(&self, id: &str) -> Result<StoredTodo, StoreError> {
        let response = self
            .client
            .get(self.doc_url(id))
            .send()
            .await
            .map_err(transport_error)?;

        match response.status() {
            StatusCode::NOT_FOUND => Err(StoreError::NotFound),
            status if !status.is_success() => Err(status_error(status, "document read")),
            _ => read_json(response).await,
        }
    }

    async fn put_doc(&self, doc: &StoredTodo) -> Result<(), StoreError> {
        let response = self
            .client
            .put(self.doc_url(&doc.id))
            .json(doc)
            .send()
            .await
            .map_err(transport_error)?;

        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            Err(status_error(status, "document write"))
        }
    }

    fn db_url(&self) -> String {
        format!("{}/{}", self.endpoint, self.database)
    }

    fn doc_url(&self, id: &str) -> String {
        // Identifiers arrive from request paths, so they are encoded rather
        // than spliced into the URL as-is.
        format!(
            "{}/{}/{}",
            self.endpoint,
            self.database,
            urlencoding::encode(id)
        )
    }
}

#[async_trait]
impl RecordStore for DocumentStore {
    async fn list_all(&self) -> Result<Vec<Todo>, StoreError> {
        self.ensure_session().await?;

        let response = self
            .client
            .get(format!("{}/_all_docs", self.db_url()))
            .query(&[("include_docs", "true")])
            .send()
            .await
            .map_err(transport_error)?;

        let status = response.status();
        if !status.is_success() {
            return Err(status_error(status, "list"));
        }

        let listing: AllDocsResponse = read_json(response).await?;
        Ok(listing
            .rows
            .into_iter()
            .filter_map(|row| row.doc.map(Todo::from))
            .collect())
    }

    async fn create(&self, title: &str, description: &str) -> Result<Todo, StoreError> {
        self.ensure_session().await?;

        if self.find_by_title(title).await?.is_some() {
            return Err(StoreError::DuplicateTitle);
        }

        let now = Utc::now();
        let doc = StoredTodo {
            id: Uuid::new_v4().to_string(),
            rev: None,
            title: title.to_string(),
            description: description.to_string(),
            created_at: now,
            updated_at: now,
        };
        self.put_doc(&doc).await?;
        Ok(doc.into())
    }

    async fn get_by_id(&self, id: &str) -> Result<Todo, StoreError> {
        self.ensure_session().await?;
        Ok(self.fetch_doc(id).await?.into())
    }

    async fn update(&self, id: &str, title: &str, description: &str) -> Result<Todo, StoreError> {
        self.ensure_session().await?;

        // The uniqueness check excludes the record being updated, so keeping
        // a title while changing the description is allowed.
        if let Some(existing) = self.find_by_title(title).await? {
            if existing.id != id {
                return Err(StoreError::DuplicateTitle);
            }
        }

        let current = self.fetch_doc(id).await?;
        let doc = StoredTodo {
            id: current.id,
            rev: current.rev,
            title: title.to_string(),
            description: description.to_string(),
            created_at: current.created_at,
            updated_at: Utc::now(),
        };
        self.put_doc(&doc).await?;
        Ok(doc.into())
    }

    async fn delete(&self, id: &str) -> Result<(), StoreError> {
        self.ensure_session().await?;

        let current = self.fetch_doc(id).await?;
        let rev = current.rev.unwrap_or_default();

        let response = self
            .client
            .delete(self.doc_url(id))
            .query(&[("rev", rev.as_str())])
            .send()
            .await
            .map_err(transport_error)?;

        match response.status() {
            StatusCode::NOT_FOUND => Err(StoreError::NotFound),
            status if !status.is_success() => Err(status_error(status, "document delete")),
            _ => Ok(()),
        }
    }

    async fn find_by_title(&self, title: &str) -> Result<Option<Todo>, StoreError> {
        self.ensure_session().await?;

        let query = serde_json::json!({
            "selector": { "title": title },
            "limit": 1,
        });
        let response = self
            .client
            .post(format!("{}/_find", self.db_url()))
            .json(&query)
            .send()
            .await
            .map_err(transport_error)?;

        let status = response.status();
        if !status.is_success() {
            return Err(status_error(status, "title lookup"));
        }

        let found: FindResponse = read_json(response).await?;
        Ok(found.docs.into_iter().next().map(Todo::from))
    }
}

/// Collects and parses a JSON body in two phases: a body that cannot be
/// received means the store went away mid-response, while a body that
/// arrived intact but does not parse is a server-side surprise.
async fn read_json<T>(response: reqwest::Response) -> Result<T, StoreError>
where
    T: serde::de::DeserializeOwned,
{
    let bytes = response.bytes().await.map_err(StoreError::unavailable)?;
    serde_json::from_slice(&bytes).map_err(StoreError::unexpected)
}

/// Failures sending a request mean the store is unreachable.
fn transport_error(err: reqwest::Error) -> StoreError {
    StoreError::unavailable(err)
}

/// Maps non-success statuses. Auth rejections count as unavailability, not
/// data errors.
fn status_error(status: StatusCode, op: &str) -> StoreError {
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
            StoreError::unavailable(format!("{} rejected with {}", op, status))
        }
        _ => StoreError::unexpected(format!("{} failed with {}", op, status)),
    }
}

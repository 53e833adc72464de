//! Record Store Interface and Failover
//!
//! `RecordStore` is the uniform contract every backend implements. The HTTP
//! handlers never talk to a backend directly; they go through `TieredStore`,
//! which tries the primary and falls back to the secondary only when the
//! primary reports `Unavailable`.
//!
//! ## Failover Rules
//! - Failover is decided per request. No circuit breaker, no retry loop:
//!   one attempt against the primary, then at most one against the fallback.
//! - Only `Unavailable` triggers the fallback. `DuplicateTitle` and
//!   `NotFound` are answers, not outages, and pass through unchanged.
//! - Every result is tagged with the `StorageTier` that produced it so the
//!   API can tell callers which store served them.

use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::types::{StoreError, Todo};

/// Uniform contract for todo storage backends.
///
/// All methods take `&self`; backends handle their own interior mutability.
/// `find_by_title` exists for uniqueness checks and uses exact, case-sensitive
/// comparison.
#[async_trait]
pub trait RecordStore: Send + Sync {
    async fn list_all(&self) -> Result<Vec<Todo>, StoreError>;

    async fn create(&self, title: &str, description: &str) -> Result<Todo, StoreError>;

    async fn get_by_id(&self, id: &str) -> Result<Todo, StoreError>;

    async fn update(
        &self,
        id: &str,
        title: &str,
        description: &str,
    ) -> Result<Todo, StoreError>;

    async fn delete(&self, id: &str) -> Result<(), StoreError>;

    async fn find_by_title(&self, title: &str) -> Result<Option<Todo>, StoreError>;
}

/// Which backend actually served a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageTier {
    Primary,
    Fallback,
}

impl std::fmt::Display for StorageTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StorageTier::Primary => write!(f, "primary"),
            StorageTier::Fallback => write!(f, "fallback"),
        }
    }
}

/// Two-tier store: a primary backend plus a fallback that steps in when the
/// primary cannot be reached.
///
/// Both backends are injected, so tests can pair any two `RecordStore`
/// implementations.
pub struct TieredStore {
    primary: Arc<dyn RecordStore>,
    fallback: Arc<dyn RecordStore>,
}

impl TieredStore {
    pub fn new(primary: Arc<dyn RecordStore>, fallback: Arc<dyn RecordStore>) -> Self {
        Self { primary, fallback }
    }

    /// Runs one operation with failover. The fallback future is only awaited
    /// when the primary reports `Unavailable`, so a healthy primary never
    /// causes fallback side effects.
    async fn run<T>(
        &self,
        op: &'static str,
        primary: impl Future<Output = Result<T, StoreError>>,
        fallback: impl Future<Output = Result<T, StoreError>>,
    ) -> Result<(T, StorageTier), StoreError> {
        match primary.await {
            Err(StoreError::Unavailable(reason)) => {
                tracing::warn!(
                    "Primary store unavailable during {}, using fallback: {}",
                    op,
                    reason
                );
                Ok((fallback.await?, StorageTier::Fallback))
            }
            result => Ok((result?, StorageTier::Primary)),
        }
    }

    pub async fn list_all(&self) -> Result<(Vec<Todo>, StorageTier), StoreError> {
        self.run("list", self.primary.list_all(), self.fallback.list_all())
            .await
    }

    pub async fn create(
        &self,
        title: &str,
        description: &str,
    ) -> Result<(Todo, StorageTier), StoreError> {
        self.run(
            "create",
            self.primary.create(title, description),
            self.fallback.create(title, description),
        )
        .await
    }

    pub async fn get_by_id(&self, id: &str) -> Result<(Todo, StorageTier), StoreError> {
        self.run("get", self.primary.get_by_id(id), self.fallback.get_by_id(id))
            .await
    }

    pub async fn update(
        &self,
        id: &str,
        title: &str,
        description: &str,
    ) -> Result<(Todo, StorageTier), StoreError> {
        self.run(
            "update",
            self.primary.update(id, title, description),
            self.fallback.update(id, title, description),
        )
        .await
    }

    pub async fn delete(&self, id: &str) -> Result<((), StorageTier), StoreError> {
        self.run("delete", self.primary.delete(id), self.fallback.delete(id))
            .await
    }
}

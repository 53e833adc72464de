//! Core Record Types
//!
//! Defines the `Todo` record shared by every store backend and the error
//! taxonomy that store operations report.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A single todo record.
///
/// The JSON representation uses camelCase keys (`createdAt`, `updatedAt`) so
/// that every backend and the HTTP API agree on one wire shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Todo {
    /// Backend-assigned identifier. Opaque to callers; treated as a string
    /// everywhere so numeric counters and UUIDs can coexist.
    pub id: String,
    pub title: String,
    pub description: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Errors reported by store operations.
///
/// `Unavailable` is the only variant that triggers failover: it means the
/// backend could not be reached at all. Data-level failures (`DuplicateTitle`,
/// `NotFound`) are final answers from a working store.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("todo with this title already exists")]
    DuplicateTitle,

    #[error("todo not found")]
    NotFound,

    #[error("store unavailable: {0}")]
    Unavailable(String),

    #[error("{0}")]
    Unexpected(String),
}

impl StoreError {
    pub fn unavailable(reason: impl std::fmt::Display) -> Self {
        Self::Unavailable(reason.to_string())
    }

    pub fn unexpected(reason: impl std::fmt::Display) -> Self {
        Self::Unexpected(reason.to_string())
    }
}

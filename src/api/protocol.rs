//! REST Protocol Types
//!
//! Request and response bodies for the public todo API.
//!
//! List and point reads return bare records; mutations return a confirmation
//! carrying the storage tier that served them. The tier is informational
//! only and promises nothing about where later requests will land.

use serde::{Deserialize, Serialize};

use crate::store::failover::StorageTier;
use crate::store::types::Todo;

/// Body accepted by create and update.
///
/// Fields arrive optional so the handlers own the presence check and can
/// answer 400 with a stable message instead of a generic deserialization
/// failure.
#[derive(Debug, Serialize, Deserialize)]
pub struct TodoPayload {
    pub title: Option<String>,
    pub description: Option<String>,
}

/// `201 Created` response for a successful create.
#[derive(Debug, Serialize, Deserialize)]
pub struct TodoCreated {
    pub message: String,
    pub todo: Todo,
    pub storage: StorageTier,
}

/// Confirmation for updates and deletes.
#[derive(Debug, Serialize, Deserialize)]
pub struct Confirmation {
    pub message: String,
    pub storage: StorageTier,
}

/// Body attached to every non-success status.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

/// Successful answer from the database health probe.
#[derive(Debug, Serialize, Deserialize)]
pub struct DbHealth {
    pub message: String,
    pub database: String,
    pub version: String,
    pub status: String,
}

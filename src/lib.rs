//! Todo API Server Library
//!
//! This library crate defines the core modules of the todo service.
//! It serves as the foundation for the binary executable (`main.rs`).
//!
//! ## Architecture Modules
//! The system is composed of two loosely coupled subsystems:
//!
//! - **`store`**: The persistence layer. Defines the `RecordStore` contract and
//!   its three implementations: a CouchDB-backed document store, an in-memory
//!   fallback, and the tiered wrapper that fails over between them per request.
//! - **`api`**: The HTTP layer. Builds the axum router, maps storage errors to
//!   status codes, and shapes the JSON responses clients see.

pub mod api;
pub mod store;

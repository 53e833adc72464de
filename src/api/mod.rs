//! HTTP API Module
//!
//! The public REST surface of the todo service.
//!
//! ## Layout
//! - **`handlers`**: axum request handlers, the shared `AppState`, the
//!   router, and the error-to-status mapping.
//! - **`protocol`**: request and response DTOs for the wire contract.

pub mod handlers;
pub mod protocol;

#[cfg(test)]
mod tests;

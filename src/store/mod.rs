//! Record Storage Module
//!
//! Two interchangeable backends behind a single `RecordStore` contract, plus
//! the failover wrapper the HTTP layer talks to.
//!
//! ## Layout
//! - **`types`**: the `Todo` record and the store error taxonomy.
//! - **`failover`**: the `RecordStore` trait, the `StorageTier` marker, and
//!   `TieredStore`, which tries the primary and switches to the fallback
//!   only when the primary is unreachable.
//! - **`document`**: primary backend against a CouchDB-compatible server,
//!   with a lazily established, process-cached session.
//! - **`memory`**: in-process fallback backend; insertion ordered, counter
//!   identifiers, nothing survives a restart.

pub mod document;
pub mod failover;
pub mod memory;
pub mod types;

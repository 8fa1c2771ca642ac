//! Arbornote Client Tree Mirror
//!
//! This crate provides the client-resident mirror of the Arbornote note
//! graph: lazily populated from the server, incrementally reconciled with
//! its sync feed, and readable synchronously once entities are loaded.
//!
//! # Architecture
//!
//! - **Skeleton first**: initialization loads the hot tree skeleton; the
//!   rest of the graph arrives on demand in batched fetches
//! - **Bounded residency**: branches and attributes are materialized only
//!   while at least one endpoint note is resident
//! - **No tombstones**: deletion is inferred from placements disappearing,
//!   never from a deleted flag on the note itself
//! - **One change set per sync batch**: reconciliation is atomic under a
//!   write lock and broadcasts exactly one aggregated report per call
//!
//! # Modules
//!
//! - [`models`] - Resident entities (Note, Branch, Attribute) and wire rows
//! - [`store`] - Graph store, batch patcher, and sync reconciler
//! - [`services`] - The `TreeMirror` facade and its complement cache
//! - [`transport`] - The `TreeTransport` seam the embedding client implements

pub mod models;
pub mod services;
pub mod store;
pub mod transport;

// Re-export commonly used types
pub use models::*;
pub use services::*;
pub use store::*;
pub use transport::*;

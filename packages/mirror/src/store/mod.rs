//! Resident Graph Storage
//!
//! - `GraphStore` - the entity maps and the batch patcher
//! - sync reconciliation (`GraphStore::apply_sync_rows`)
//! - `ChangeSet` / `EntityChange` - aggregated change reports
//!
//! The store is synchronous and single-writer; the service layer wraps it
//! in an async lock and owns the fan-out of change sets.

mod changes;
mod graph;
mod reconciler;

pub use changes::{ChangeSet, EntityChange};
pub use graph::GraphStore;

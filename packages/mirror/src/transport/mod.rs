//! Transport Seam
//!
//! The mirror's only view of the server. Implementations live with the
//! application (HTTP client, IPC bridge, test stubs); the mirror itself
//! never constructs requests, it only consumes the row shapes defined in
//! [`crate::models`].
//!
//! Every operation returns `anyhow::Result` so implementations can surface
//! whatever their stack produces; the service layer converts failures into
//! [`crate::services::MirrorError`].

use anyhow::Result;
use async_trait::async_trait;

use crate::models::{NoteComplement, SearchResultRow, TreeBatch};

/// Server access the tree mirror needs.
#[async_trait]
pub trait TreeTransport: Send + Sync {
    /// Fetch the initial tree skeleton the product starts from: the root
    /// notes, their placements, and their attributes.
    async fn load_full_tree(&self) -> Result<TreeBatch>;

    /// Batched fetch of the given notes plus the context rows the server
    /// includes with them (parent placements, child branches, attributes).
    /// One call serves a whole miss set; the mirror never fetches note by
    /// note.
    async fn load_subtree(&self, note_ids: &[String]) -> Result<TreeBatch>;

    /// Execute a saved search server-side and return its hits in rank
    /// order. `None` models a reply without a result array, which callers
    /// treat as an error.
    async fn run_search(&self, note_id: &str) -> Result<Option<Vec<SearchResultRow>>>;

    /// Fetch the heavyweight payload of one note.
    async fn load_complement(&self, note_id: &str) -> Result<NoteComplement>;
}

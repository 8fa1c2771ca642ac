//! Service Errors

use thiserror::Error;

/// Errors surfaced by the tree mirror.
///
/// Sync reconciliation is deliberately infallible; only operations that hit
/// the transport can fail.
#[derive(Error, Debug)]
pub enum MirrorError {
    #[error("Transport request failed: {0}")]
    Transport(#[from] anyhow::Error),

    #[error("Search note {note_id} returned no results array")]
    SearchResultsMissing { note_id: String },
}

impl MirrorError {
    pub fn search_results_missing(note_id: impl Into<String>) -> Self {
        Self::SearchResultsMissing {
            note_id: note_id.into(),
        }
    }
}

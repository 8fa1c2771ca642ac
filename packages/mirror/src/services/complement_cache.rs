//! Complement Cache
//!
//! Note complements (content bodies and related heavyweight fields) are
//! fetched on demand and cached per note id. The map stores the pending
//! computation rather than the finished value: the first caller starts the
//! fetch, every concurrent caller awaits the same cell, and the transport
//! sees exactly one request per id.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{Mutex, OnceCell};

use crate::models::NoteComplement;
use crate::services::error::MirrorError;
use crate::transport::TreeTransport;

pub(crate) struct ComplementCache {
    transport: Arc<dyn TreeTransport>,
    entries: Mutex<HashMap<String, Arc<OnceCell<NoteComplement>>>>,
}

impl ComplementCache {
    pub(crate) fn new(transport: Arc<dyn TreeTransport>) -> Self {
        Self {
            transport,
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Cached complement for the note, fetching on first use.
    ///
    /// Failed fetches are not cached; the cell stays empty and the next
    /// caller retries.
    pub(crate) async fn get(&self, note_id: &str) -> Result<NoteComplement, MirrorError> {
        let cell = {
            let mut entries = self.entries.lock().await;
            entries
                .entry(note_id.to_owned())
                .or_insert_with(|| Arc::new(OnceCell::new()))
                .clone()
        };

        let complement = cell
            .get_or_try_init(|| async {
                self.transport
                    .load_complement(note_id)
                    .await
                    .map_err(MirrorError::from)
            })
            .await?;

        Ok(complement.clone())
    }

    /// Drop the cached complement; the server reported new content.
    pub(crate) async fn evict(&self, note_id: &str) {
        self.entries.lock().await.remove(note_id);
    }

    pub(crate) async fn clear(&self) {
        self.entries.lock().await.clear();
    }
}

//! Tree Mirror Service
//!
//! `TreeMirror` is the client's window onto the note graph: a lazily
//! populated, incrementally synchronized mirror of what the server holds.
//! Consumers read resident entities synchronously once loaded and subscribe
//! to aggregated change sets describing what each reconciliation touched.
//!
//! # Architecture
//!
//! - One `GraphStore` behind an async `RwLock`; batch merges and sync
//!   reconciliation run under the write lock and are therefore atomic with
//!   respect to readers.
//! - Loading is batched: a miss set of any size costs one transport call.
//! - Saved-search notes get their children synthesized from search results
//!   as virtual branches with deterministic ids.
//! - Change sets fan out on a broadcast channel; entries carry the source
//!   id of the originating client so subscribers can skip their own echoes.

use std::collections::HashSet;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use tokio::sync::{broadcast, watch, RwLock};

use crate::models::{
    virtual_branch_id, Attribute, Branch, BranchRow, Note, NoteComplement, SyncRow, TreeBatch,
    NONE_NOTE_ID, SEARCH_NOTE_TYPE,
};
use crate::services::complement_cache::ComplementCache;
use crate::services::error::MirrorError;
use crate::store::{ChangeSet, GraphStore};
use crate::transport::TreeTransport;

/// Broadcast channel capacity for change sets.
///
/// 128 gives slow subscribers headroom across bursty sync periods; a lagged
/// receiver only loses intermediate sets, and the mirror itself is always
/// current.
const CHANGE_CHANNEL_CAPACITY: usize = 128;

/// Position gap between consecutive virtual search-result branches, leaving
/// room for manual reordering between them.
const SEARCH_RESULT_POSITION_GAP: i64 = 10;

/// Client-resident mirror of the note graph.
///
/// Cheap to clone; clones share the store, the complement cache, and the
/// change channel.
#[derive(Clone)]
pub struct TreeMirror {
    transport: Arc<dyn TreeTransport>,

    /// Resident entities; write-locked for merges and reconciliation
    store: Arc<RwLock<GraphStore>>,

    /// Per-note complement cache with single-flight fetches
    complements: Arc<ComplementCache>,

    /// Broadcast channel for aggregated change sets
    change_tx: broadcast::Sender<ChangeSet>,

    /// Flips to true once the initial tree is merged
    loaded_tx: watch::Sender<bool>,
}

impl TreeMirror {
    /// Create a mirror over the given transport. The store starts empty;
    /// call [`TreeMirror::initialize`] to load the tree skeleton.
    pub fn new(transport: Arc<dyn TreeTransport>) -> Self {
        let (change_tx, _) = broadcast::channel(CHANGE_CHANNEL_CAPACITY);
        let (loaded_tx, _) = watch::channel(false);

        Self {
            complements: Arc::new(ComplementCache::new(Arc::clone(&transport))),
            transport,
            store: Arc::new(RwLock::new(GraphStore::new())),
            change_tx,
            loaded_tx,
        }
    }

    /// Fetch the initial tree skeleton, merge it, and mark the mirror
    /// ready.
    pub async fn initialize(&self) -> Result<(), MirrorError> {
        let batch = self.transport.load_full_tree().await?;
        let (note_count, branch_count) = {
            let mut store = self.store.write().await;
            store.apply_batch(batch);
            (store.note_count(), store.branch_count())
        };
        self.loaded_tx.send_replace(true);
        tracing::info!(
            "tree mirror initialized with {} notes and {} branches",
            note_count,
            branch_count
        );
        Ok(())
    }

    /// Await the initial load. Returns immediately once the mirror is
    /// ready.
    pub async fn ready(&self) {
        let mut loaded = self.loaded_tx.subscribe();
        while !*loaded.borrow_and_update() {
            if loaded.changed().await.is_err() {
                return;
            }
        }
    }

    /// Throw away every resident entity and cached complement, then load
    /// the tree again. Used after reconnect, when server state may have
    /// diverged arbitrarily.
    pub async fn reinitialize(&self) -> Result<(), MirrorError> {
        self.loaded_tx.send_replace(false);
        {
            let mut store = self.store.write().await;
            store.clear();
        }
        self.complements.clear().await;
        tracing::info!("tree mirror reset, reloading");
        self.initialize().await
    }

    /// Resolve notes by id, fetching whatever is not yet resident in one
    /// batched request.
    ///
    /// Ids are deduplicated and the returned notes follow the input order.
    /// Ids that stay unresolved after the fetch are skipped; each is logged
    /// unless `silent_not_found` is set.
    pub async fn get_notes(
        &self,
        note_ids: &[String],
        silent_not_found: bool,
    ) -> Result<Vec<Note>, MirrorError> {
        let unique_ids: Vec<String> = {
            let mut seen = HashSet::new();
            note_ids
                .iter()
                .filter(|id| seen.insert(id.as_str()))
                .cloned()
                .collect()
        };

        let missing: Vec<String> = {
            let store = self.store.read().await;
            unique_ids
                .iter()
                .filter(|id| !store.contains_note(id))
                .cloned()
                .collect()
        };
        self.reload_notes(&missing).await?;

        let store = self.store.read().await;
        let mut notes = Vec::with_capacity(unique_ids.len());
        for note_id in &unique_ids {
            match store.note(note_id) {
                Some(note) => notes.push(note.clone()),
                None => {
                    if !silent_not_found {
                        tracing::warn!("note {} still missing after fetch, skipped", note_id);
                    }
                }
            }
        }
        Ok(notes)
    }

    /// Resolve a single note, fetching it if needed.
    ///
    /// The empty string and the reserved id `"none"` stand for "no note
    /// here" in UI state; both return `Ok(None)` without touching the
    /// network.
    pub async fn get_note(
        &self,
        note_id: &str,
        silent_not_found: bool,
    ) -> Result<Option<Note>, MirrorError> {
        if note_id.is_empty() || note_id == NONE_NOTE_ID {
            return Ok(None);
        }
        let notes = self
            .get_notes(&[note_id.to_owned()], silent_not_found)
            .await?;
        Ok(notes.into_iter().next())
    }

    /// Re-fetch the given notes unconditionally and merge the response.
    ///
    /// The merge replaces known adjacency wholesale; afterwards every
    /// saved-search note in the response gets its virtual result branches
    /// rebuilt.
    pub async fn reload_notes(&self, note_ids: &[String]) -> Result<(), MirrorError> {
        if note_ids.is_empty() {
            return Ok(());
        }

        let batch = self.transport.load_subtree(note_ids).await?;
        let search_note_ids: Vec<String> = batch
            .notes
            .iter()
            .filter(|row| row.note_type == SEARCH_NOTE_TYPE)
            .map(|row| row.note_id.clone())
            .collect();

        {
            let mut store = self.store.write().await;
            store.apply_batch(batch);
        }

        for search_note_id in &search_note_ids {
            self.expand_search_note(search_note_id).await?;
        }
        Ok(())
    }

    /// Run a saved search and graft its results under the search note as
    /// virtual branches.
    ///
    /// Virtual branches exist only in this mirror and never go back to the
    /// server. Their ids are deterministic composites of result and search
    /// note ids, so rerunning the search replaces placements instead of
    /// stacking duplicates; positions are 10, 20, 30... in rank order. The
    /// re-merge also re-supplies the search note's real parent placements,
    /// keeping it attached to its spot in the tree.
    fn expand_search_note<'a>(
        &'a self,
        search_note_id: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<(), MirrorError>> + Send + 'a>> {
        Box::pin(async move {
            let results = self
                .transport
                .run_search(search_note_id)
                .await?
                .ok_or_else(|| MirrorError::search_results_missing(search_note_id))?;

            let result_note_ids: Vec<String> =
                results.iter().map(|row| row.note_id.clone()).collect();

            // Results may themselves be saved searches; the re-entry is boxed
            // so the recursive future stays sized. Resident notes break the
            // cycle.
            let force_load: Pin<
                Box<dyn Future<Output = Result<Vec<Note>, MirrorError>> + Send + '_>,
            > = Box::pin(self.get_notes(&result_note_ids, false));
            force_load.await?;

            let virtual_branches: Vec<BranchRow> = results
                .iter()
                .enumerate()
                .map(|(index, row)| BranchRow {
                    branch_id: virtual_branch_id(&row.note_id, search_note_id),
                    note_id: row.note_id.clone(),
                    parent_note_id: search_note_id.to_owned(),
                    prefix: None,
                    note_position: (index as i64 + 1) * SEARCH_RESULT_POSITION_GAP,
                    is_deleted: false,
                })
                .collect();

            let mut store = self.store.write().await;
            let (note_row, parent_rows) = match store.note(search_note_id) {
                Some(note) => {
                    let parent_rows: Vec<BranchRow> = note
                        .parents
                        .iter()
                        .filter_map(|parent_id| note.branch_id_to_parent(parent_id))
                        .filter_map(|branch_id| store.branch(branch_id))
                        .map(Branch::to_row)
                        .collect();
                    (note.to_row(), parent_rows)
                }
                None => {
                    tracing::debug!(
                        "search note {} not resident after merge, expansion skipped",
                        search_note_id
                    );
                    return Ok(());
                }
            };

            let mut branch_rows = parent_rows;
            branch_rows.extend(virtual_branches);
            store.apply_batch(TreeBatch {
                notes: vec![note_row],
                branches: branch_rows,
                attributes: Vec::new(),
            });
            Ok(())
        })
    }

    /// Apply one batch of sync rows from the server's change feed.
    ///
    /// Reconciliation runs under a single write lock. Complements are
    /// evicted for every reported content change, and exactly one change
    /// set is broadcast per call, even when nothing was touched.
    pub async fn apply_sync_rows(&self, rows: &[SyncRow]) -> ChangeSet {
        let changes = {
            let mut store = self.store.write().await;
            store.apply_sync_rows(rows)
        };

        for change in &changes.note_contents {
            self.complements.evict(&change.entity_id).await;
        }

        // No subscriber is fine; the mirror state already advanced.
        let _ = self.change_tx.send(changes.clone());
        changes
    }

    /// Subscribe to aggregated change sets, one per reconciliation call.
    ///
    /// Slow subscribers may lag and lose intermediate sets; the mirror
    /// itself always reflects the latest reconciliation.
    pub fn subscribe_to_changes(&self) -> broadcast::Receiver<ChangeSet> {
        self.change_tx.subscribe()
    }

    /// Cached complement of a note (content body and related heavyweight
    /// fields), fetched on first use. Concurrent calls share one fetch.
    pub async fn note_complement(&self, note_id: &str) -> Result<NoteComplement, MirrorError> {
        self.complements.get(note_id).await
    }

    /// Whether the note is resident right now. Never fetches.
    pub async fn is_note_resident(&self, note_id: &str) -> bool {
        self.store.read().await.contains_note(note_id)
    }

    /// Resident branch by id. Never fetches.
    pub async fn get_branch(&self, branch_id: &str) -> Option<Branch> {
        self.store.read().await.branch(branch_id).cloned()
    }

    /// Resident attribute by id. Never fetches.
    pub async fn get_attribute(&self, attribute_id: &str) -> Option<Attribute> {
        self.store.read().await.attribute(attribute_id).cloned()
    }

    /// Id of the branch placing `child_note_id` under `parent_note_id`, if
    /// the parent is resident and wired to that child.
    pub async fn get_branch_id(&self, parent_note_id: &str, child_note_id: &str) -> Option<String> {
        let store = self.store.read().await;
        store
            .note(parent_note_id)
            .and_then(|parent| parent.branch_id_to_child(child_note_id))
            .map(str::to_owned)
    }

    /// Attributes owned by a resident note, in index order.
    pub async fn note_attributes(&self, note_id: &str) -> Vec<Attribute> {
        let store = self.store.read().await;
        match store.note(note_id) {
            Some(note) => note
                .attribute_ids
                .iter()
                .filter_map(|attribute_id| store.attribute(attribute_id))
                .cloned()
                .collect(),
            None => Vec::new(),
        }
    }
}


// Scenario tests in separate module
#[cfg(test)]
#[path = "tree_mirror_test.rs"]
mod tree_mirror_test;

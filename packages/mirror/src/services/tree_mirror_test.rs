//! Scenario tests for TreeMirror
//!
//! Tests cover:
//! - Batched lazy loading and residency checks
//! - Saved-search expansion into virtual branches
//! - Sync reconciliation with change broadcast
//! - Complement caching and eviction on content changes

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use anyhow::Result;
    use async_trait::async_trait;
    use tokio::sync::{broadcast, Mutex};

    use crate::models::{
        virtual_branch_id, BranchRow, BranchSyncRow, NoteComplement, NoteContentSyncRow, NoteRow,
        NoteSyncRow, SearchResultRow, SyncRow, TreeBatch, SEARCH_NOTE_TYPE,
    };
    use crate::services::error::MirrorError;
    use crate::services::tree_mirror::TreeMirror;
    use crate::transport::TreeTransport;

    /// Transport scripted with per-note rows. `load_subtree` answers any
    /// subset of the scripted notes and records what was requested.
    struct ScriptedTransport {
        full_tree: TreeBatch,
        note_rows: HashMap<String, NoteRow>,
        branch_rows: HashMap<String, Vec<BranchRow>>,
        search_results: HashMap<String, Option<Vec<SearchResultRow>>>,
        subtree_requests: Mutex<Vec<Vec<String>>>,
        complement_fetches: AtomicUsize,
    }

    impl ScriptedTransport {
        fn new(full_tree: TreeBatch) -> Self {
            Self {
                full_tree,
                note_rows: HashMap::new(),
                branch_rows: HashMap::new(),
                search_results: HashMap::new(),
                subtree_requests: Mutex::new(Vec::new()),
                complement_fetches: AtomicUsize::new(0),
            }
        }

        fn with_note(mut self, row: NoteRow) -> Self {
            self.note_rows.insert(row.note_id.clone(), row);
            self
        }

        /// Branch rows the server includes alongside a fetched note, such
        /// as its parent placements.
        fn with_branches(mut self, note_id: &str, rows: Vec<BranchRow>) -> Self {
            self.branch_rows.insert(note_id.to_string(), rows);
            self
        }

        fn with_search(mut self, note_id: &str, results: Option<Vec<SearchResultRow>>) -> Self {
            self.search_results.insert(note_id.to_string(), results);
            self
        }
    }

    #[async_trait]
    impl TreeTransport for ScriptedTransport {
        async fn load_full_tree(&self) -> Result<TreeBatch> {
            Ok(self.full_tree.clone())
        }

        async fn load_subtree(&self, note_ids: &[String]) -> Result<TreeBatch> {
            self.subtree_requests.lock().await.push(note_ids.to_vec());

            let mut batch = TreeBatch::default();
            for note_id in note_ids {
                if let Some(row) = self.note_rows.get(note_id) {
                    batch.notes.push(row.clone());
                }
                if let Some(rows) = self.branch_rows.get(note_id) {
                    batch.branches.extend(rows.iter().cloned());
                }
            }
            Ok(batch)
        }

        async fn run_search(&self, note_id: &str) -> Result<Option<Vec<SearchResultRow>>> {
            Ok(self.search_results.get(note_id).cloned().unwrap_or(None))
        }

        async fn load_complement(&self, note_id: &str) -> Result<NoteComplement> {
            self.complement_fetches.fetch_add(1, Ordering::SeqCst);
            Ok(NoteComplement {
                note_id: note_id.to_string(),
                content: Some(format!("content of {}", note_id)),
                utc_date_modified: None,
            })
        }
    }

    fn note_row(note_id: &str, title: &str) -> NoteRow {
        NoteRow {
            note_id: note_id.to_string(),
            note_type: "text".to_string(),
            title: title.to_string(),
            mime: None,
            utc_date_modified: None,
            is_deleted: false,
        }
    }

    fn search_note_row(note_id: &str, title: &str) -> NoteRow {
        NoteRow {
            note_type: SEARCH_NOTE_TYPE.to_string(),
            ..note_row(note_id, title)
        }
    }

    fn branch_row(branch_id: &str, note_id: &str, parent_note_id: &str, position: i64) -> BranchRow {
        BranchRow {
            branch_id: branch_id.to_string(),
            note_id: note_id.to_string(),
            parent_note_id: parent_note_id.to_string(),
            prefix: None,
            note_position: position,
            is_deleted: false,
        }
    }

    fn search_hit(note_id: &str) -> SearchResultRow {
        SearchResultRow {
            note_id: note_id.to_string(),
            branch_id: format!("hit-{}", note_id),
        }
    }

    fn root_only_tree() -> TreeBatch {
        TreeBatch {
            notes: vec![note_row("root", "Root")],
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_get_notes_fetches_missing_in_one_batch() {
        let transport = Arc::new(
            ScriptedTransport::new(root_only_tree())
                .with_note(note_row("x", "X"))
                .with_note(note_row("y", "Y"))
                .with_note(note_row("z", "Z")),
        );
        let mirror = TreeMirror::new(transport.clone());
        mirror.initialize().await.unwrap();

        let ids = vec![
            "x".to_string(),
            "y".to_string(),
            "x".to_string(),
            "root".to_string(),
            "z".to_string(),
        ];
        let notes = mirror.get_notes(&ids, false).await.unwrap();

        let titles: Vec<&str> = notes.iter().map(|note| note.title.as_str()).collect();
        assert_eq!(
            titles,
            vec!["X", "Y", "Root", "Z"],
            "input order kept, duplicates collapsed"
        );

        let requests = transport.subtree_requests.lock().await;
        assert_eq!(requests.len(), 1, "one batched fetch covers every miss");
        assert_eq!(
            requests[0],
            vec!["x".to_string(), "y".to_string(), "z".to_string()]
        );
    }

    #[tokio::test]
    async fn test_resident_notes_never_refetch() {
        let transport =
            Arc::new(ScriptedTransport::new(root_only_tree()).with_note(note_row("x", "X")));
        let mirror = TreeMirror::new(transport.clone());
        mirror.initialize().await.unwrap();

        mirror.get_note("x", false).await.unwrap();
        mirror.get_note("x", false).await.unwrap();
        mirror
            .get_notes(&["x".to_string(), "root".to_string()], false)
            .await
            .unwrap();

        assert_eq!(transport.subtree_requests.lock().await.len(), 1);
    }

    #[tokio::test]
    async fn test_unresolvable_ids_are_skipped() {
        let transport =
            Arc::new(ScriptedTransport::new(root_only_tree()).with_note(note_row("x", "X")));
        let mirror = TreeMirror::new(transport);
        mirror.initialize().await.unwrap();

        let notes = mirror
            .get_notes(&["x".to_string(), "ghost".to_string()], true)
            .await
            .unwrap();

        assert_eq!(notes.len(), 1);
        assert_eq!(notes[0].note_id, "x");
        assert!(mirror.get_note("ghost", true).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_search_note_expansion_builds_virtual_branches() {
        let transport = Arc::new(
            ScriptedTransport::new(TreeBatch {
                notes: vec![note_row("root", "Root"), search_note_row("s1", "Open tasks")],
                branches: vec![branch_row("b-s1", "s1", "root", 10)],
                ..Default::default()
            })
            .with_note(search_note_row("s1", "Open tasks"))
            .with_branches("s1", vec![branch_row("b-s1", "s1", "root", 10)])
            .with_note(note_row("r1", "First hit"))
            .with_note(note_row("r2", "Second hit"))
            .with_search("s1", Some(vec![search_hit("r1"), search_hit("r2")])),
        );
        let mirror = TreeMirror::new(transport.clone());
        mirror.initialize().await.unwrap();

        mirror.reload_notes(&["s1".to_string()]).await.unwrap();

        let s1 = mirror.get_note("s1", false).await.unwrap().unwrap();
        assert_eq!(s1.children, vec!["r1".to_string(), "r2".to_string()]);
        assert_eq!(
            s1.parents,
            vec!["root".to_string()],
            "real placement survives expansion"
        );

        let first = mirror.get_branch(&virtual_branch_id("r1", "s1")).await.unwrap();
        assert!(first.is_virtual());
        assert_eq!(first.note_position, 10);
        let second = mirror.get_branch(&virtual_branch_id("r2", "s1")).await.unwrap();
        assert_eq!(second.note_position, 20);

        let r1 = mirror.get_note("r1", false).await.unwrap().unwrap();
        assert_eq!(r1.parents, vec!["s1".to_string()]);

        let requests = transport.subtree_requests.lock().await;
        assert_eq!(requests.len(), 2, "search note, then its results");
        assert_eq!(requests[0], vec!["s1".to_string()]);
        assert_eq!(requests[1], vec!["r1".to_string(), "r2".to_string()]);
    }

    #[tokio::test]
    async fn test_search_expansion_is_idempotent() {
        let transport = Arc::new(
            ScriptedTransport::new(TreeBatch {
                notes: vec![note_row("root", "Root"), search_note_row("s1", "Open tasks")],
                branches: vec![branch_row("b-s1", "s1", "root", 10)],
                ..Default::default()
            })
            .with_note(search_note_row("s1", "Open tasks"))
            .with_branches("s1", vec![branch_row("b-s1", "s1", "root", 10)])
            .with_note(note_row("r1", "First hit"))
            .with_search("s1", Some(vec![search_hit("r1")])),
        );
        let mirror = TreeMirror::new(transport);
        mirror.initialize().await.unwrap();

        mirror.reload_notes(&["s1".to_string()]).await.unwrap();
        mirror.reload_notes(&["s1".to_string()]).await.unwrap();

        let s1 = mirror.get_note("s1", false).await.unwrap().unwrap();
        assert_eq!(
            s1.children,
            vec!["r1".to_string()],
            "rerun replaces placements instead of stacking"
        );
        let root = mirror.get_note("root", false).await.unwrap().unwrap();
        assert_eq!(root.children, vec!["s1".to_string()]);
    }

    #[tokio::test]
    async fn test_search_without_results_is_an_error() {
        let transport = Arc::new(
            ScriptedTransport::new(root_only_tree())
                .with_note(search_note_row("s2", "Broken search"))
                .with_search("s2", None),
        );
        let mirror = TreeMirror::new(transport);
        mirror.initialize().await.unwrap();

        let error = mirror.reload_notes(&["s2".to_string()]).await.unwrap_err();
        match error {
            MirrorError::SearchResultsMissing { note_id } => assert_eq!(note_id, "s2"),
            other => panic!("expected missing results error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_one_change_set_broadcast_per_sync_call() {
        let transport =
            Arc::new(ScriptedTransport::new(root_only_tree()).with_note(note_row("a", "Alpha")));
        let mirror = TreeMirror::new(transport);
        mirror.initialize().await.unwrap();
        mirror.get_note("a", false).await.unwrap();

        let mut receiver = mirror.subscribe_to_changes();

        let returned = mirror.apply_sync_rows(&[]).await;
        assert!(returned.is_empty());
        let received = receiver.recv().await.unwrap();
        assert_eq!(received, returned, "empty reconciliations still broadcast");

        let rows = vec![
            SyncRow::Note(NoteSyncRow {
                entity_id: "a".to_string(),
                entity: note_row("a", "Alpha renamed"),
                source_id: "client-7".to_string(),
            }),
            SyncRow::NoteContent(NoteContentSyncRow {
                entity_id: "a".to_string(),
                source_id: "client-7".to_string(),
            }),
        ];
        let returned = mirror.apply_sync_rows(&rows).await;
        let received = receiver.recv().await.unwrap();
        assert_eq!(received, returned);
        assert_eq!(received.notes.len(), 1);
        assert_eq!(received.notes[0].entity_id, "a");
        assert_eq!(received.notes[0].source_id, "client-7");
        assert!(received.touches_note("a"));
        assert!(matches!(
            receiver.try_recv(),
            Err(broadcast::error::TryRecvError::Empty)
        ));
    }

    #[tokio::test]
    async fn test_content_sync_evicts_cached_complement() {
        let transport =
            Arc::new(ScriptedTransport::new(root_only_tree()).with_note(note_row("a", "Alpha")));
        let mirror = TreeMirror::new(transport.clone());
        mirror.initialize().await.unwrap();
        mirror.get_note("a", false).await.unwrap();

        let complement = mirror.note_complement("a").await.unwrap();
        assert_eq!(complement.content.as_deref(), Some("content of a"));
        mirror.note_complement("a").await.unwrap();
        assert_eq!(transport.complement_fetches.load(Ordering::SeqCst), 1);

        mirror
            .apply_sync_rows(&[SyncRow::NoteContent(NoteContentSyncRow {
                entity_id: "a".to_string(),
                source_id: "client-7".to_string(),
            })])
            .await;

        mirror.note_complement("a").await.unwrap();
        assert_eq!(
            transport.complement_fetches.load(Ordering::SeqCst),
            2,
            "content sync drops the cached complement"
        );
    }

    #[tokio::test]
    async fn test_branch_delete_sync_implies_note_deletion() {
        let transport = Arc::new(ScriptedTransport::new(TreeBatch {
            notes: vec![note_row("root", "Root"), note_row("a", "Alpha")],
            branches: vec![branch_row("b-a", "a", "root", 10)],
            ..Default::default()
        }));
        let mirror = TreeMirror::new(transport);
        mirror.initialize().await.unwrap();

        let changes = mirror
            .apply_sync_rows(&[SyncRow::Branch(BranchSyncRow {
                entity_id: "b-a".to_string(),
                entity: BranchRow {
                    is_deleted: true,
                    ..branch_row("b-a", "a", "root", 10)
                },
                source_id: "client-7".to_string(),
            })])
            .await;

        assert_eq!(changes.branches.len(), 1);
        assert!(mirror.get_branch("b-a").await.is_none());

        let a = mirror.get_note("a", false).await.unwrap().unwrap();
        assert!(a.is_deleted(), "no placements left implies deleted");
        let root = mirror.get_note("root", false).await.unwrap().unwrap();
        assert!(root.children.is_empty());
    }
}

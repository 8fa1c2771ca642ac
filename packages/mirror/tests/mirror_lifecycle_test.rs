//! Integration tests for the crate surface
//!
//! Tests cover:
//! - Full session flow: initialize, lazy load, sync, observe changes
//! - Reinitialization after server-side divergence

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use tokio::sync::Mutex;

use arbornote_mirror::{
    AttributeKind, AttributeRow, AttributeSyncRow, BranchRow, BranchSyncRow, NoteComplement,
    NoteRow, SearchResultRow, SyncRow, TreeBatch, TreeMirror, TreeTransport,
};

/// Server double whose tree can be swapped between calls.
struct FakeServer {
    full_tree: Mutex<TreeBatch>,
    note_rows: Mutex<HashMap<String, NoteRow>>,
    complement_fetches: AtomicUsize,
}

impl FakeServer {
    fn new(full_tree: TreeBatch) -> Self {
        Self {
            full_tree: Mutex::new(full_tree),
            note_rows: Mutex::new(HashMap::new()),
            complement_fetches: AtomicUsize::new(0),
        }
    }

    async fn set_full_tree(&self, batch: TreeBatch) {
        *self.full_tree.lock().await = batch;
    }

    async fn add_note(&self, row: NoteRow) {
        self.note_rows.lock().await.insert(row.note_id.clone(), row);
    }
}

#[async_trait]
impl TreeTransport for FakeServer {
    async fn load_full_tree(&self) -> Result<TreeBatch> {
        Ok(self.full_tree.lock().await.clone())
    }

    async fn load_subtree(&self, note_ids: &[String]) -> Result<TreeBatch> {
        let note_rows = self.note_rows.lock().await;
        let mut batch = TreeBatch::default();
        for note_id in note_ids {
            if let Some(row) = note_rows.get(note_id) {
                batch.notes.push(row.clone());
            }
        }
        Ok(batch)
    }

    async fn run_search(&self, _note_id: &str) -> Result<Option<Vec<SearchResultRow>>> {
        Ok(Some(Vec::new()))
    }

    async fn load_complement(&self, note_id: &str) -> Result<NoteComplement> {
        self.complement_fetches.fetch_add(1, Ordering::SeqCst);
        Ok(NoteComplement {
            note_id: note_id.to_string(),
            content: Some("<p>hello</p>".to_string()),
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

fn branch_row(branch_id: &str, child: &str, parent: &str, position: i64) -> BranchRow {
    BranchRow {
        branch_id: branch_id.to_string(),
        note_id: child.to_string(),
        parent_note_id: parent.to_string(),
        prefix: None,
        note_position: position,
        is_deleted: false,
    }
}

fn starting_tree() -> TreeBatch {
    TreeBatch {
        notes: vec![
            note_row("root", "Root"),
            note_row("inbox", "Inbox"),
            note_row("journal", "Journal"),
        ],
        branches: vec![
            branch_row("b-inbox", "inbox", "root", 10),
            branch_row("b-journal", "journal", "root", 20),
        ],
        attributes: vec![],
    }
}

#[tokio::test]
async fn test_full_session_flow() {
    let server = Arc::new(FakeServer::new(starting_tree()));
    server.add_note(note_row("task1", "Buy milk")).await;

    let mirror = TreeMirror::new(server.clone());
    mirror.initialize().await.unwrap();
    mirror.ready().await;

    // Lazy load a note outside the initial skeleton.
    let task = mirror.get_note("task1", false).await.unwrap().unwrap();
    assert_eq!(task.title, "Buy milk");

    // The server attaches it under the inbox and labels it.
    let mut subscriber = mirror.subscribe_to_changes();
    let rows = vec![
        SyncRow::Branch(BranchSyncRow {
            entity_id: "b-task1".to_string(),
            entity: branch_row("b-task1", "task1", "inbox", 10),
            source_id: "server".to_string(),
        }),
        SyncRow::Attribute(AttributeSyncRow {
            entity_id: "label1".to_string(),
            entity: AttributeRow {
                attribute_id: "label1".to_string(),
                note_id: "task1".to_string(),
                kind: AttributeKind::Label,
                name: "todo".to_string(),
                value: "".to_string(),
                is_deleted: false,
            },
            source_id: "server".to_string(),
        }),
    ];
    let changes = mirror.apply_sync_rows(&rows).await;
    assert_eq!(subscriber.recv().await.unwrap(), changes);
    assert_eq!(changes.branches.len(), 1);
    assert_eq!(changes.attributes.len(), 1);

    let inbox = mirror.get_note("inbox", false).await.unwrap().unwrap();
    assert_eq!(inbox.children, vec!["task1".to_string()]);
    assert_eq!(
        mirror.get_branch_id("inbox", "task1").await.as_deref(),
        Some("b-task1")
    );

    let labels = mirror.note_attributes("task1").await;
    assert_eq!(labels.len(), 1);
    assert_eq!(labels[0].name, "todo");
}

#[tokio::test]
async fn test_reinitialize_recovers_from_divergence() {
    let server = Arc::new(FakeServer::new(starting_tree()));
    let mirror = TreeMirror::new(server.clone());
    mirror.initialize().await.unwrap();

    mirror.note_complement("inbox").await.unwrap();
    assert_eq!(server.complement_fetches.load(Ordering::SeqCst), 1);

    // The server was restored from a backup while this client was away.
    server
        .set_full_tree(TreeBatch {
            notes: vec![note_row("root", "Root"), note_row("archive", "Archive")],
            branches: vec![branch_row("b-archive", "archive", "root", 10)],
            attributes: vec![],
        })
        .await;
    mirror.reinitialize().await.unwrap();
    mirror.ready().await;

    assert!(!mirror.is_note_resident("inbox").await);
    let root = mirror.get_note("root", false).await.unwrap().unwrap();
    assert_eq!(root.children, vec!["archive".to_string()]);

    // The complement cache was flushed together with the store.
    mirror.note_complement("inbox").await.unwrap();
    assert_eq!(server.complement_fetches.load(Ordering::SeqCst), 2);
}

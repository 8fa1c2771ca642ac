//! Sync Feed Rows
//!
//! After every server-side write transaction the client receives a batch of
//! entity changes. Each row is tagged with `entityName` and carries the id
//! of the changed entity, a kind-specific payload, and the `sourceId` of the
//! originating client so subscribers can filter out their own echoes.
//!
//! Wire layout (internally tagged):
//!
//! ```json
//! { "entityName": "branch", "entityId": "b1",
//!   "entity": { "branchId": "b1", "noteId": "n1", "parentNoteId": "root",
//!               "notePosition": 10, "isDeleted": false },
//!   "sourceId": "client-7" }
//! ```

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::models::rows::{AttributeRow, BranchRow, NoteRow};

/// One entity change in the server's sync feed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "entityName", rename_all = "camelCase")]
pub enum SyncRow {
    #[serde(rename = "note")]
    Note(NoteSyncRow),
    #[serde(rename = "branch")]
    Branch(BranchSyncRow),
    #[serde(rename = "noteReordering")]
    NoteReordering(NoteReorderingSyncRow),
    #[serde(rename = "attribute")]
    Attribute(AttributeSyncRow),
    #[serde(rename = "noteContent")]
    NoteContent(NoteContentSyncRow),
    #[serde(rename = "noteRevision")]
    NoteRevision(NoteRevisionSyncRow),
}

impl SyncRow {
    /// Id of the changed entity (note id, branch id, attribute id, or the
    /// parent note id for reorderings).
    pub fn entity_id(&self) -> &str {
        match self {
            SyncRow::Note(row) => &row.entity_id,
            SyncRow::Branch(row) => &row.entity_id,
            SyncRow::NoteReordering(row) => &row.entity_id,
            SyncRow::Attribute(row) => &row.entity_id,
            SyncRow::NoteContent(row) => &row.entity_id,
            SyncRow::NoteRevision(row) => &row.entity_id,
        }
    }

    /// Originating client of the change.
    pub fn source_id(&self) -> &str {
        match self {
            SyncRow::Note(row) => &row.source_id,
            SyncRow::Branch(row) => &row.source_id,
            SyncRow::NoteReordering(row) => &row.source_id,
            SyncRow::Attribute(row) => &row.source_id,
            SyncRow::NoteContent(row) => &row.source_id,
            SyncRow::NoteRevision(row) => &row.source_id,
        }
    }
}

/// Note change: scalar fields to apply to the resident note, if any.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NoteSyncRow {
    pub entity_id: String,
    pub entity: NoteRow,
    pub source_id: String,
}

/// Branch change; `entity.is_deleted` distinguishes deletes from upserts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BranchSyncRow {
    pub entity_id: String,
    pub entity: BranchRow,
    pub source_id: String,
}

/// Sibling reordering under one parent: branch id -> new position.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NoteReorderingSyncRow {
    /// Parent note id
    pub entity_id: String,
    pub positions: HashMap<String, i64>,
    pub source_id: String,
}

/// Attribute change; `entity.is_deleted` distinguishes deletes from upserts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttributeSyncRow {
    pub entity_id: String,
    pub entity: AttributeRow,
    pub source_id: String,
}

/// Note content changed server-side. The mirror holds no content, so this
/// only invalidates the cached complement and notifies subscribers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NoteContentSyncRow {
    pub entity_id: String,
    pub source_id: String,
}

/// A note revision was written. Notification only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NoteRevisionSyncRow {
    pub entity_id: String,
    pub source_id: String,
}

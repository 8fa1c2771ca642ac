//! Wire Rows
//!
//! Serde shapes for everything crossing the transport seam: entity rows as
//! the server sends them, the batched fetch triple, search hits, and the
//! note complement. All field names are camelCase on the wire; note and
//! attribute kinds travel under the name `type`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::attribute::AttributeKind;

/// One batched fetch response. Every tree endpoint returns this triple and
/// the patcher merges it in a single pass: notes, then branches, then
/// attributes.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TreeBatch {
    #[serde(default)]
    pub notes: Vec<NoteRow>,
    #[serde(default)]
    pub branches: Vec<BranchRow>,
    #[serde(default)]
    pub attributes: Vec<AttributeRow>,
}

impl TreeBatch {
    pub fn is_empty(&self) -> bool {
        self.notes.is_empty() && self.branches.is_empty() && self.attributes.is_empty()
    }
}

/// Scalar note fields as the server sends them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NoteRow {
    pub note_id: String,
    #[serde(rename = "type")]
    pub note_type: String,
    pub title: String,
    #[serde(default)]
    pub mime: Option<String>,
    #[serde(default)]
    pub utc_date_modified: Option<DateTime<Utc>>,
    /// Only meaningful inside sync payloads; fetch responses never carry
    /// deleted rows.
    #[serde(default)]
    pub is_deleted: bool,
}

/// Parent-child placement row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BranchRow {
    pub branch_id: String,
    /// Child note id
    pub note_id: String,
    pub parent_note_id: String,
    #[serde(default)]
    pub prefix: Option<String>,
    pub note_position: i64,
    #[serde(default)]
    pub is_deleted: bool,
}

/// Attribute row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttributeRow {
    pub attribute_id: String,
    /// Owner note id
    pub note_id: String,
    #[serde(rename = "type")]
    pub kind: AttributeKind,
    pub name: String,
    pub value: String,
    #[serde(default)]
    pub is_deleted: bool,
}

impl AttributeRow {
    /// Target note id, for relation rows only.
    pub(crate) fn target_note_id(&self) -> Option<&str> {
        match self.kind {
            AttributeKind::Relation => Some(self.value.as_str()),
            AttributeKind::Label => None,
        }
    }
}

/// One search hit. Only `note_id` drives the mirror; `branch_id` stays on
/// the shape because the server includes it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResultRow {
    pub note_id: String,
    pub branch_id: String,
}

/// Heavyweight per-note payload, fetched on demand and cached until the
/// sync feed reports new content.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NoteComplement {
    pub note_id: String,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub utc_date_modified: Option<DateTime<Utc>>,
}

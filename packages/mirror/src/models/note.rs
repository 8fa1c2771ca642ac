//! Note Entity
//!
//! The note is the unit of content in the Arbornote tree. The mirror keeps
//! at most one `Note` object per id, and every relationship on it is an id,
//! never an object reference, so resolving an id through the store always
//! observes current state even after the entity was replaced by a refetch.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::rows::NoteRow;

/// Note type marking saved searches. Their children are virtual branches
/// synthesized from search results rather than stored placements.
pub const SEARCH_NOTE_TYPE: &str = "search";

/// Reserved id UI surfaces use for "no note here"; lookups short-circuit.
pub const NONE_NOTE_ID: &str = "none";

/// A note resident in the mirror.
///
/// Scalar fields come from the server row; adjacency and attribute indices
/// are maintained by the store as branch and attribute rows arrive.
/// `children` stays sorted by the positions of the connecting branches.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Note {
    /// Unique identifier
    pub note_id: String,

    /// Note type (e.g., "text", "code", "search")
    #[serde(rename = "type")]
    pub note_type: String,

    /// Title shown in the tree
    pub title: String,

    /// Content MIME type, when the server reports one
    pub mime: Option<String>,

    /// Last modification timestamp reported by the server
    pub utc_date_modified: Option<DateTime<Utc>>,

    /// Child note ids, sorted by branch position
    #[serde(default)]
    pub children: Vec<String>,

    /// Parent note ids
    #[serde(default)]
    pub parents: Vec<String>,

    /// Parent note id -> id of the branch connecting it to this note
    #[serde(default)]
    pub parent_to_branch: HashMap<String, String>,

    /// Child note id -> id of the branch connecting this note to it
    #[serde(default)]
    pub child_to_branch: HashMap<String, String>,

    /// Ids of attributes owned by this note, in arrival order
    #[serde(default)]
    pub attribute_ids: Vec<String>,

    /// Ids of relation attributes elsewhere that target this note
    #[serde(default)]
    pub target_relation_ids: Vec<String>,
}

impl Note {
    /// Build a fresh note from a wire row, with empty adjacency. The branch
    /// rows of the surrounding batch repopulate the edges.
    pub(crate) fn from_row(row: NoteRow) -> Self {
        Self {
            note_id: row.note_id,
            note_type: row.note_type,
            title: row.title,
            mime: row.mime,
            utc_date_modified: row.utc_date_modified,
            children: Vec::new(),
            parents: Vec::new(),
            parent_to_branch: HashMap::new(),
            child_to_branch: HashMap::new(),
            attribute_ids: Vec::new(),
            target_relation_ids: Vec::new(),
        }
    }

    /// Copy scalar fields from a row, leaving adjacency and attribute
    /// indices untouched. Sync note events mutate in place through this, so
    /// the object identity survives.
    pub(crate) fn update_from_row(&mut self, row: &NoteRow) {
        self.note_type = row.note_type.clone();
        self.title = row.title.clone();
        self.mime = row.mime.clone();
        self.utc_date_modified = row.utc_date_modified;
    }

    /// Wire row carrying the current scalar state.
    pub(crate) fn to_row(&self) -> NoteRow {
        NoteRow {
            note_id: self.note_id.clone(),
            note_type: self.note_type.clone(),
            title: self.title.clone(),
            mime: self.mime.clone(),
            utc_date_modified: self.utc_date_modified,
            is_deleted: false,
        }
    }

    /// Whether this is a saved-search note whose children are virtual.
    pub fn is_search(&self) -> bool {
        self.note_type == SEARCH_NOTE_TYPE
    }

    /// A resident note with no edges left is deleted. The store keeps no
    /// tombstones; absence of branches is the signal.
    pub fn is_deleted(&self) -> bool {
        self.parents.is_empty() && self.children.is_empty()
    }

    /// Id of the branch connecting the given parent to this note.
    pub fn branch_id_to_parent(&self, parent_note_id: &str) -> Option<&str> {
        self.parent_to_branch.get(parent_note_id).map(String::as_str)
    }

    /// Id of the branch connecting this note to the given child.
    pub fn branch_id_to_child(&self, child_note_id: &str) -> Option<&str> {
        self.child_to_branch.get(child_note_id).map(String::as_str)
    }

    /// Register a parent edge. Idempotent for repeated rows of the same
    /// branch.
    pub(crate) fn add_parent(&mut self, parent_note_id: &str, branch_id: &str) {
        if !self.parents.iter().any(|id| id == parent_note_id) {
            self.parents.push(parent_note_id.to_owned());
        }
        self.parent_to_branch
            .insert(parent_note_id.to_owned(), branch_id.to_owned());
    }

    /// Register a child edge. Idempotent; ordering is restored by the store,
    /// which knows the branch positions.
    pub(crate) fn add_child(&mut self, child_note_id: &str, branch_id: &str) {
        if !self.children.iter().any(|id| id == child_note_id) {
            self.children.push(child_note_id.to_owned());
        }
        self.child_to_branch
            .insert(child_note_id.to_owned(), branch_id.to_owned());
    }

    /// Unlink a parent, returning the id of the branch that connected it.
    pub(crate) fn remove_parent(&mut self, parent_note_id: &str) -> Option<String> {
        self.parents.retain(|id| id != parent_note_id);
        self.parent_to_branch.remove(parent_note_id)
    }

    /// Unlink a child, returning the id of the branch that connected it.
    pub(crate) fn remove_child(&mut self, child_note_id: &str) -> Option<String> {
        self.children.retain(|id| id != child_note_id);
        self.child_to_branch.remove(child_note_id)
    }

    /// Drop every edge registration on this note.
    pub(crate) fn clear_adjacency(&mut self) {
        self.children.clear();
        self.parents.clear();
        self.parent_to_branch.clear();
        self.child_to_branch.clear();
    }
}

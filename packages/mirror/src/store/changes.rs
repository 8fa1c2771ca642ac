//! Aggregated Change Reports
//!
//! One reconciliation pass produces exactly one `ChangeSet` describing
//! everything it touched, bucketed by entity kind. Subscribers receive the
//! set over the mirror's broadcast channel and use the per-entry source id
//! to skip changes they originated themselves.

use serde::{Deserialize, Serialize};

/// Id of one touched entity plus the origin of the change.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntityChange {
    pub entity_id: String,
    /// Client that originated the change, for echo filtering
    pub source_id: String,
}

impl EntityChange {
    pub fn new(entity_id: impl Into<String>, source_id: impl Into<String>) -> Self {
        Self {
            entity_id: entity_id.into(),
            source_id: source_id.into(),
        }
    }
}

/// Everything one reconciliation pass touched.
///
/// Note, branch, and attribute entries appear only when the store actually
/// applied something; reordering, content, and revision entries are reported
/// unconditionally since consumers react to them without needing residency.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangeSet {
    pub notes: Vec<EntityChange>,
    pub branches: Vec<EntityChange>,
    pub reorderings: Vec<EntityChange>,
    pub attributes: Vec<EntityChange>,
    pub note_contents: Vec<EntityChange>,
    pub note_revisions: Vec<EntityChange>,
}

impl ChangeSet {
    pub fn is_empty(&self) -> bool {
        self.notes.is_empty()
            && self.branches.is_empty()
            && self.reorderings.is_empty()
            && self.attributes.is_empty()
            && self.note_contents.is_empty()
            && self.note_revisions.is_empty()
    }

    /// Whether the given note was touched directly: a note field change, a
    /// content change, or a new revision. Branch and attribute entries key
    /// on their own ids and are not resolved here.
    pub fn touches_note(&self, note_id: &str) -> bool {
        self.notes
            .iter()
            .chain(&self.note_contents)
            .chain(&self.note_revisions)
            .any(|change| change.entity_id == note_id)
    }
}

//! Branch Entity
//!
//! A branch is one placement of a note under a parent. A note cloned into
//! several parents has one branch per placement; the branch carries the
//! sort position among siblings and an optional display prefix.

use serde::{Deserialize, Serialize};

use crate::models::rows::BranchRow;

/// Prefix of ids for branches synthesized from search results.
const VIRTUAL_BRANCH_PREFIX: &str = "virt-";

/// Deterministic id for the virtual branch placing a search result under
/// its saved-search note. Rerunning the same search yields the same ids, so
/// a re-merge replaces placements instead of stacking duplicates.
pub fn virtual_branch_id(result_note_id: &str, search_note_id: &str) -> String {
    format!(
        "{}{}-{}",
        VIRTUAL_BRANCH_PREFIX, result_note_id, search_note_id
    )
}

/// A parent-child placement resident in the mirror.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Branch {
    /// Unique identifier
    pub branch_id: String,

    /// Child note id
    pub note_id: String,

    /// Parent note id
    pub parent_note_id: String,

    /// Optional display prefix shown before the note title in this placement
    pub prefix: Option<String>,

    /// Sort key among siblings; gaps between values are expected
    pub note_position: i64,
}

impl Branch {
    pub(crate) fn from_row(row: BranchRow) -> Self {
        Self {
            branch_id: row.branch_id,
            note_id: row.note_id,
            parent_note_id: row.parent_note_id,
            prefix: row.prefix,
            note_position: row.note_position,
        }
    }

    pub(crate) fn update_from_row(&mut self, row: &BranchRow) {
        self.note_id = row.note_id.clone();
        self.parent_note_id = row.parent_note_id.clone();
        self.prefix = row.prefix.clone();
        self.note_position = row.note_position;
    }

    pub(crate) fn to_row(&self) -> BranchRow {
        BranchRow {
            branch_id: self.branch_id.clone(),
            note_id: self.note_id.clone(),
            parent_note_id: self.parent_note_id.clone(),
            prefix: self.prefix.clone(),
            note_position: self.note_position,
            is_deleted: false,
        }
    }

    /// Whether this placement was synthesized from search results. Virtual
    /// branches exist only in the mirror and never go back to the server.
    pub fn is_virtual(&self) -> bool {
        self.branch_id.starts_with(VIRTUAL_BRANCH_PREFIX)
    }
}

//! Resident Graph Store
//!
//! The three entity maps behind the mirror, plus the batch patcher that
//! merges fetch responses into them.
//!
//! # Merge contract
//!
//! A batch is merged notes first, then branches, then attributes. A note row
//! for an already-resident id is an authoritative replacement of that note's
//! known adjacency: every existing edge is detached (both directions, with
//! the connecting branches deleted) before the fresh object installs, and
//! the batch's own branch rows rebuild the edges. Merging partially would
//! leave phantom edges pointing at placements the server no longer has.
//!
//! Branches and attributes register themselves only on endpoint notes that
//! are actually resident; the graph never grows past what was loaded.

use std::collections::HashMap;

use crate::models::{Attribute, AttributeRow, Branch, BranchRow, Note, NoteRow, TreeBatch};

/// In-memory mirror of the loaded part of the note graph.
///
/// At most one object per id is ever stored, so every read through the
/// store observes current state. All mutation happens through batch merges
/// and sync reconciliation; both run under the service's write lock.
#[derive(Debug, Default)]
pub struct GraphStore {
    pub(crate) notes: HashMap<String, Note>,
    pub(crate) branches: HashMap<String, Branch>,
    pub(crate) attributes: HashMap<String, Attribute>,
}

impl GraphStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Merge one batched fetch response.
    pub fn apply_batch(&mut self, batch: TreeBatch) {
        for row in batch.notes {
            self.merge_note_row(row);
        }
        for row in batch.branches {
            self.merge_branch_row(row);
        }
        for row in batch.attributes {
            self.merge_attribute_row(row);
        }
    }

    /// Resident note by id.
    pub fn note(&self, note_id: &str) -> Option<&Note> {
        self.notes.get(note_id)
    }

    /// Resident branch by id.
    pub fn branch(&self, branch_id: &str) -> Option<&Branch> {
        self.branches.get(branch_id)
    }

    /// Resident attribute by id.
    pub fn attribute(&self, attribute_id: &str) -> Option<&Attribute> {
        self.attributes.get(attribute_id)
    }

    pub fn contains_note(&self, note_id: &str) -> bool {
        self.notes.contains_key(note_id)
    }

    pub fn note_count(&self) -> usize {
        self.notes.len()
    }

    pub fn branch_count(&self) -> usize {
        self.branches.len()
    }

    pub fn attribute_count(&self) -> usize {
        self.attributes.len()
    }

    /// Drop every resident entity.
    pub fn clear(&mut self) {
        self.notes.clear();
        self.branches.clear();
        self.attributes.clear();
    }

    fn merge_note_row(&mut self, row: NoteRow) {
        let note_id = row.note_id.clone();
        let mut note = Note::from_row(row);
        if self.notes.contains_key(&note_id) {
            self.detach_note(&note_id);
        }
        if let Some(previous) = self.notes.remove(&note_id) {
            // Attribute indices survive replacement; they are maintained by
            // attribute rows and sync deletes, not by note rows.
            note.attribute_ids = previous.attribute_ids;
            note.target_relation_ids = previous.target_relation_ids;
        }
        self.notes.insert(note_id, note);
    }

    /// Drop every edge of a resident note, both directions, deleting the
    /// connecting branches. The note itself stays in place.
    fn detach_note(&mut self, note_id: &str) {
        let (children, parents) = match self.notes.get(note_id) {
            Some(note) => (note.children.clone(), note.parents.clone()),
            None => return,
        };

        for child_id in children {
            if let Some(child) = self.notes.get_mut(&child_id) {
                if let Some(branch_id) = child.remove_parent(note_id) {
                    self.branches.remove(&branch_id);
                }
            }
        }
        for parent_id in parents {
            if let Some(parent) = self.notes.get_mut(&parent_id) {
                if let Some(branch_id) = parent.remove_child(note_id) {
                    self.branches.remove(&branch_id);
                }
            }
        }
        if let Some(note) = self.notes.get_mut(note_id) {
            note.clear_adjacency();
        }
    }

    pub(crate) fn merge_branch_row(&mut self, row: BranchRow) {
        let branch = Branch::from_row(row);
        let branch_id = branch.branch_id.clone();
        let child_note_id = branch.note_id.clone();
        let parent_note_id = branch.parent_note_id.clone();
        self.branches.insert(branch_id.clone(), branch);
        self.wire_branch(&branch_id, &parent_note_id, &child_note_id);
    }

    /// Register a stored branch on whichever endpoint notes are resident.
    pub(crate) fn wire_branch(&mut self, branch_id: &str, parent_note_id: &str, child_note_id: &str) {
        if let Some(child) = self.notes.get_mut(child_note_id) {
            child.add_parent(parent_note_id, branch_id);
        }
        if let Some(parent) = self.notes.get_mut(parent_note_id) {
            parent.add_child(child_note_id, branch_id);
        }
        self.sort_children(parent_note_id);
    }

    /// Remove a stored branch's registrations from its resident endpoints.
    pub(crate) fn unwire_branch(&mut self, parent_note_id: &str, child_note_id: &str) {
        if let Some(child) = self.notes.get_mut(child_note_id) {
            child.remove_parent(parent_note_id);
        }
        if let Some(parent) = self.notes.get_mut(parent_note_id) {
            parent.remove_child(child_note_id);
        }
    }

    /// Re-sort a note's children by the positions of their connecting
    /// branches. Stable, so equal positions keep arrival order; children
    /// whose branch is unknown sort last. No-op for non-resident notes.
    pub(crate) fn sort_children(&mut self, note_id: &str) {
        let note = match self.notes.get(note_id) {
            Some(note) => note,
            None => return,
        };
        let mut keyed: Vec<(i64, String)> = note
            .children
            .iter()
            .map(|child_id| (self.child_position(note, child_id), child_id.clone()))
            .collect();
        keyed.sort_by_key(|(position, _)| *position);
        let children: Vec<String> = keyed.into_iter().map(|(_, child_id)| child_id).collect();
        if let Some(note) = self.notes.get_mut(note_id) {
            note.children = children;
        }
    }

    fn child_position(&self, note: &Note, child_id: &str) -> i64 {
        note.child_to_branch
            .get(child_id)
            .and_then(|branch_id| self.branches.get(branch_id))
            .map(|branch| branch.note_position)
            .unwrap_or(i64::MAX)
    }

    pub(crate) fn merge_attribute_row(&mut self, row: AttributeRow) {
        let attribute = Attribute::from_row(row);
        let attribute_id = attribute.attribute_id.clone();
        let owner_note_id = attribute.note_id.clone();
        let target_note_id = attribute.target_note_id().map(str::to_owned);
        self.attributes.insert(attribute_id.clone(), attribute);
        self.index_attribute(&attribute_id, &owner_note_id, target_note_id.as_deref());
    }

    /// Register an attribute id on its owner note and, for relations, on the
    /// target note. Appends are idempotent.
    pub(crate) fn index_attribute(
        &mut self,
        attribute_id: &str,
        owner_note_id: &str,
        target_note_id: Option<&str>,
    ) {
        match self.notes.get_mut(owner_note_id) {
            Some(owner) => {
                if !owner.attribute_ids.iter().any(|id| id == attribute_id) {
                    owner.attribute_ids.push(attribute_id.to_owned());
                }
            }
            None => {
                tracing::debug!(
                    "attribute {} arrived for unloaded note {}, owner index skipped",
                    attribute_id,
                    owner_note_id
                );
            }
        }
        if let Some(target_id) = target_note_id {
            if let Some(target) = self.notes.get_mut(target_id) {
                if !target.target_relation_ids.iter().any(|id| id == attribute_id) {
                    target.target_relation_ids.push(attribute_id.to_owned());
                }
            }
        }
    }

    /// Remove an attribute id from its owner and target indices, where
    /// those notes are resident.
    pub(crate) fn unindex_attribute(
        &mut self,
        attribute_id: &str,
        owner_note_id: &str,
        target_note_id: Option<&str>,
    ) {
        if let Some(owner) = self.notes.get_mut(owner_note_id) {
            owner.attribute_ids.retain(|id| id != attribute_id);
        }
        if let Some(target_id) = target_note_id {
            if let Some(target) = self.notes.get_mut(target_id) {
                target.target_relation_ids.retain(|id| id != attribute_id);
            }
        }
    }
}

//! Sync Reconciliation
//!
//! Applies one batch of server sync rows to the resident graph and reports
//! what changed. Rows are processed in fixed kind buckets regardless of
//! arrival order: notes, branches, reorderings, attributes, note contents,
//! note revisions. A note change and its own edge arriving together thus
//! always see the note updated before the edge wires adjacency.
//!
//! The reconciler is infallible by design: rows for entities the mirror
//! never loaded are skipped (sync never force-loads), and deletes of absent
//! entities are no-ops. A server that pushes garbage can at worst leave the
//! mirror sparse, never inconsistent.

use crate::models::{
    AttributeSyncRow, BranchSyncRow, NoteReorderingSyncRow, NoteSyncRow, SyncRow,
};
use crate::store::changes::{ChangeSet, EntityChange};
use crate::store::graph::GraphStore;

impl GraphStore {
    /// Apply one batch of sync rows, returning the aggregated change set.
    /// Exactly one set per call, empty or not.
    pub fn apply_sync_rows(&mut self, rows: &[SyncRow]) -> ChangeSet {
        let mut changes = ChangeSet::default();

        for row in rows {
            if let SyncRow::Note(row) = row {
                self.apply_note_sync(row, &mut changes);
            }
        }
        for row in rows {
            if let SyncRow::Branch(row) = row {
                self.apply_branch_sync(row, &mut changes);
            }
        }
        for row in rows {
            if let SyncRow::NoteReordering(row) = row {
                self.apply_reordering_sync(row, &mut changes);
            }
        }
        for row in rows {
            if let SyncRow::Attribute(row) = row {
                self.apply_attribute_sync(row, &mut changes);
            }
        }
        for row in rows {
            if let SyncRow::NoteContent(row) = row {
                changes
                    .note_contents
                    .push(EntityChange::new(row.entity_id.clone(), row.source_id.clone()));
            }
        }
        for row in rows {
            if let SyncRow::NoteRevision(row) = row {
                changes
                    .note_revisions
                    .push(EntityChange::new(row.entity_id.clone(), row.source_id.clone()));
            }
        }

        changes
    }

    fn apply_note_sync(&mut self, row: &NoteSyncRow, changes: &mut ChangeSet) {
        // Deletion is inferred from branch removal emptying the adjacency;
        // the nested isDeleted flag never removes the note object.
        if let Some(note) = self.notes.get_mut(&row.entity_id) {
            note.update_from_row(&row.entity);
            changes
                .notes
                .push(EntityChange::new(row.entity_id.clone(), row.source_id.clone()));
        }
    }

    fn apply_branch_sync(&mut self, row: &BranchSyncRow, changes: &mut ChangeSet) {
        let branch_id = &row.entity_id;
        let incoming = &row.entity;

        if incoming.is_deleted {
            // Unwire through the stored endpoints; delete payloads may not
            // repeat them.
            if let Some(branch) = self.branches.remove(branch_id) {
                self.unwire_branch(&branch.parent_note_id, &branch.note_id);
                changes
                    .branches
                    .push(EntityChange::new(branch_id.clone(), row.source_id.clone()));
            }
            return;
        }

        if let Some(existing) = self.branches.get(branch_id) {
            let old_parent = existing.parent_note_id.clone();
            let old_child = existing.note_id.clone();
            self.unwire_branch(&old_parent, &old_child);
            if let Some(branch) = self.branches.get_mut(branch_id) {
                branch.update_from_row(incoming);
            }
            self.wire_branch(branch_id, &incoming.parent_note_id, &incoming.note_id);
            changes
                .branches
                .push(EntityChange::new(branch_id.clone(), row.source_id.clone()));
            return;
        }

        // Unknown branch: materialize only when an endpoint is already
        // resident, otherwise the graph would grow past what was loaded.
        if self.contains_note(&incoming.note_id) || self.contains_note(&incoming.parent_note_id) {
            self.merge_branch_row(incoming.clone());
            changes
                .branches
                .push(EntityChange::new(branch_id.clone(), row.source_id.clone()));
        }
    }

    fn apply_reordering_sync(&mut self, row: &NoteReorderingSyncRow, changes: &mut ChangeSet) {
        for (branch_id, position) in &row.positions {
            if let Some(branch) = self.branches.get_mut(branch_id) {
                branch.note_position = *position;
            }
        }
        // The entity id is the parent note; if it is not resident the sort
        // is a no-op but the change is still reported.
        self.sort_children(&row.entity_id);
        changes
            .reorderings
            .push(EntityChange::new(row.entity_id.clone(), row.source_id.clone()));
    }

    fn apply_attribute_sync(&mut self, row: &AttributeSyncRow, changes: &mut ChangeSet) {
        let attribute_id = &row.entity_id;
        let incoming = &row.entity;

        if incoming.is_deleted {
            if let Some(attribute) = self.attributes.remove(attribute_id) {
                self.unindex_attribute(attribute_id, &attribute.note_id, attribute.target_note_id());
                changes
                    .attributes
                    .push(EntityChange::new(attribute_id.clone(), row.source_id.clone()));
            }
            return;
        }

        if let Some(existing) = self.attributes.get(attribute_id) {
            let old_owner = existing.note_id.clone();
            let old_target = existing.target_note_id().map(str::to_owned);
            self.unindex_attribute(attribute_id, &old_owner, old_target.as_deref());
            if let Some(attribute) = self.attributes.get_mut(attribute_id) {
                attribute.update_from_row(incoming);
            }
            self.index_attribute(attribute_id, &incoming.note_id, incoming.target_note_id());
            changes
                .attributes
                .push(EntityChange::new(attribute_id.clone(), row.source_id.clone()));
            return;
        }

        // Unknown attribute: materialize when the owner or, for relations,
        // the target note is resident.
        let owner_resident = self.contains_note(&incoming.note_id);
        let target_resident = incoming
            .target_note_id()
            .map(|target| self.contains_note(target))
            .unwrap_or(false);
        if owner_resident || target_resident {
            self.merge_attribute_row(incoming.clone());
            changes
                .attributes
                .push(EntityChange::new(attribute_id.clone(), row.source_id.clone()));
        }
    }
}

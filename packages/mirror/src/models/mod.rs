//! Data Models
//!
//! Entities resident in the mirror and the wire shapes that feed them:
//!
//! - `Note`, `Branch`, `Attribute` - the resident graph entities
//! - `rows` - serde shapes crossing the transport (fetch batches, search
//!   hits, note complements)
//! - `sync` - the server's change feed rows
//!
//! All adjacency between entities is expressed through ids; the store owns
//! the only object per id.

mod attribute;
mod branch;
mod note;
mod rows;
mod sync;

pub use attribute::{Attribute, AttributeKind};
pub use branch::{virtual_branch_id, Branch};
pub use note::{Note, NONE_NOTE_ID, SEARCH_NOTE_TYPE};
pub use rows::{AttributeRow, BranchRow, NoteComplement, NoteRow, SearchResultRow, TreeBatch};
pub use sync::{
    AttributeSyncRow, BranchSyncRow, NoteContentSyncRow, NoteReorderingSyncRow,
    NoteRevisionSyncRow, NoteSyncRow, SyncRow,
};

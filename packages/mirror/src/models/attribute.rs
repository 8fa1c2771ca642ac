//! Attribute Entity
//!
//! Attributes annotate notes: labels carry free-form text, relations point
//! at another note. The mirror indexes attribute ids on the owner note and,
//! for relations, on the target note (`target_relation_ids`), which is what
//! makes backlink views cheap.

use serde::{Deserialize, Serialize};

use crate::models::rows::AttributeRow;

/// Attribute kind as the server reports it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AttributeKind {
    /// Free-form text in `value`
    Label,
    /// `value` holds the target note id
    Relation,
}

/// An attribute resident in the mirror.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Attribute {
    /// Unique identifier
    pub attribute_id: String,

    /// Owner note id
    pub note_id: String,

    /// Label or relation
    #[serde(rename = "type")]
    pub kind: AttributeKind,

    /// Attribute name (e.g., "archived", "template")
    pub name: String,

    /// Label text, or the target note id for relations
    pub value: String,
}

impl Attribute {
    pub(crate) fn from_row(row: AttributeRow) -> Self {
        Self {
            attribute_id: row.attribute_id,
            note_id: row.note_id,
            kind: row.kind,
            name: row.name,
            value: row.value,
        }
    }

    pub(crate) fn update_from_row(&mut self, row: &AttributeRow) {
        self.note_id = row.note_id.clone();
        self.kind = row.kind;
        self.name = row.name.clone();
        self.value = row.value.clone();
    }

    pub fn is_relation(&self) -> bool {
        self.kind == AttributeKind::Relation
    }

    /// Target note id, for relations only.
    pub fn target_note_id(&self) -> Option<&str> {
        match self.kind {
            AttributeKind::Relation => Some(self.value.as_str()),
            AttributeKind::Label => None,
        }
    }
}

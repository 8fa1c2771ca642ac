//! Mirror Services
//!
//! This module contains the client-facing service layer:
//!
//! - `TreeMirror` - lazy loading, search expansion, complement access, and
//!   sync reconciliation over the shared graph store
//! - `MirrorError` - error type crossing the service boundary
//!
//! The complement cache is an implementation detail of `TreeMirror` and
//! stays private to this module.

mod complement_cache;
pub mod error;
pub mod tree_mirror;

pub use error::MirrorError;
pub use tree_mirror::TreeMirror;

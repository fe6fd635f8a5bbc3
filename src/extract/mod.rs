//! Relation extractors.
//!
//! Each extractor recognises a few kinds of expressions and records a
//! relation from the enclosing entity to a reference for the thing used.
//! Targets that can only be known at runtime (variable function names,
//! array elements, computed member names) are skipped.

mod depend;
mod invoke;

pub use depend::DependOn;
pub use invoke::Invoke;

use crate::indexer::Extractor;

/// The extractors an indexer runs unless told otherwise.
pub fn default_extractors() -> Vec<Box<dyn Extractor>> {
    vec![Box::new(Invoke), Box::new(DependOn)]
}

//! Per-file traversal state.
//!
//! A [`Location`] is created fresh for every indexed file and dropped when
//! the file is done, so nothing here can leak into the next file.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::error::Result;
use crate::graph::{EntityType, Id, Insert, RelationType};

/// One open entity on the nesting stack.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Frame {
    pub entity_type: EntityType,
    pub id: Id,
}

type ReferenceKey = (EntityType, String, PathBuf, usize);

/// Where we are in the file currently being indexed.
pub struct Location<'a> {
    file: &'a Path,
    lines: Vec<&'a str>,
    stack: Vec<Frame>,
    references: HashMap<ReferenceKey, Id>,
    store: &'a mut dyn Insert,
}

impl<'a> Location<'a> {
    pub fn new(file: &'a Path, content: &'a str, store: &'a mut dyn Insert) -> Self {
        Self {
            file,
            lines: content
                .split('\n')
                .map(|line| line.strip_suffix('\r').unwrap_or(line))
                .collect(),
            stack: Vec::new(),
            references: HashMap::new(),
            store,
        }
    }

    /// Path of the file, relative to the project root.
    pub fn file_path(&self) -> &'a Path {
        self.file
    }

    /// The nesting context, outermost first.
    pub fn in_entities(&self) -> &[Frame] {
        &self.stack
    }

    /// The innermost open entity.
    pub fn current(&self) -> Option<Frame> {
        self.stack.last().copied()
    }

    pub fn line_count(&self) -> usize {
        self.lines.len()
    }

    /// A single source line (1-indexed), or "" when out of range.
    pub fn source_line(&self, line: usize) -> &'a str {
        line.checked_sub(1)
            .and_then(|i| self.lines.get(i))
            .copied()
            .unwrap_or("")
    }

    /// Lines `start..=end` (1-indexed) joined with newlines.
    pub fn lines_from_to(&self, start: usize, end: usize) -> String {
        let from = start.saturating_sub(1).min(self.lines.len());
        let to = end.min(self.lines.len()).max(from);
        self.lines[from..to].join("\n")
    }

    pub fn store(&mut self) -> &mut dyn Insert {
        &mut *self.store
    }

    pub(crate) fn push(&mut self, frame: Frame) {
        self.stack.push(frame);
    }

    pub(crate) fn pop(&mut self) -> Option<Frame> {
        self.stack.pop()
    }

    /// Id of the reference `(entity_type, name)` on `line` of this file.
    ///
    /// The first call records the reference in the store; later calls with
    /// the same arguments return the cached id.
    pub fn get_reference(&mut self, entity_type: EntityType, name: &str, line: usize) -> Result<Id> {
        let key = (entity_type, name.to_string(), self.file.to_path_buf(), line);
        if let Some(&id) = self.references.get(&key) {
            return Ok(id);
        }
        let id = self.store.reference(entity_type, name, self.file, line)?;
        self.references.insert(key, id);
        Ok(id)
    }

    /// Record `relation` from the innermost open entity to the reference
    /// `(entity_type, name)` on `line`.
    ///
    /// Nothing is recorded when the innermost entity can't depend on
    /// anything, which is the case at file level. Returns the reference id
    /// if a relation was recorded.
    pub fn relate_current(
        &mut self,
        relation: RelationType,
        entity_type: EntityType,
        name: &str,
        line: usize,
    ) -> Result<Option<Id>> {
        let Some(owner) = self.current().filter(|f| f.entity_type.can_depend()) else {
            return Ok(None);
        };
        let target = self.get_reference(entity_type, name, line)?;
        let file = self.file;
        let source_line = self.source_line(line);
        match relation {
            RelationType::Invocation => {
                self.store
                    .invocation(owner.id, target, file, line, source_line)?
            }
            RelationType::Dependency => {
                self.store
                    .dependency(owner.id, target, file, line, source_line)?
            }
        }
        Ok(Some(target))
    }
}

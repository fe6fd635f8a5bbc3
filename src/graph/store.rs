//! The store boundary: how the indexer writes code facts.
//!
//! The store owns id assignment. Entities and references share one id
//! space; every id handed out refers to exactly one record of either kind.

use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};

use super::engine::Graph;
use super::types::{EntityType, Id};
use crate::error::{DictoError, Result};

/// This is how to insert new entries into the index.
///
/// All calls are synchronous. A store must never drop a record silently;
/// any failure is returned to the caller.
pub trait Insert {
    /// Record an entity, i.e. something the user defined in the code
    /// (a file, class, method or function) whose source we have.
    fn entity(
        &mut self,
        entity_type: EntityType,
        name: &str,
        file: &Path,
        start_line: usize,
        end_line: usize,
        source: &str,
    ) -> Result<Id>;

    /// Record a reference to something known only by name, e.g. the callee
    /// of a call or a global. Uses the same id range as `entity`.
    fn reference(
        &mut self,
        entity_type: EntityType,
        name: &str,
        file: &Path,
        line: usize,
    ) -> Result<Id>;

    /// Record that `dependent` makes use of `dependency` in its body.
    /// Only classes, methods and functions can depend on anything.
    fn dependency(
        &mut self,
        dependent: Id,
        dependency: Id,
        file: &Path,
        line: usize,
        source_line: &str,
    ) -> Result<()>;

    /// Record that `invoker` invokes `invokee` in its body. Same source
    /// restriction as `dependency`.
    fn invocation(
        &mut self,
        invoker: Id,
        invokee: Id,
        file: &Path,
        line: usize,
        source_line: &str,
    ) -> Result<()>;
}

impl<T: Insert + ?Sized> Insert for &mut T {
    fn entity(
        &mut self,
        entity_type: EntityType,
        name: &str,
        file: &Path,
        start_line: usize,
        end_line: usize,
        source: &str,
    ) -> Result<Id> {
        (**self).entity(entity_type, name, file, start_line, end_line, source)
    }

    fn reference(
        &mut self,
        entity_type: EntityType,
        name: &str,
        file: &Path,
        line: usize,
    ) -> Result<Id> {
        (**self).reference(entity_type, name, file, line)
    }

    fn dependency(
        &mut self,
        dependent: Id,
        dependency: Id,
        file: &Path,
        line: usize,
        source_line: &str,
    ) -> Result<()> {
        (**self).dependency(dependent, dependency, file, line, source_line)
    }

    fn invocation(
        &mut self,
        invoker: Id,
        invokee: Id,
        file: &Path,
        line: usize,
        source_line: &str,
    ) -> Result<()> {
        (**self).invocation(invoker, invokee, file, line, source_line)
    }
}

/// A graph shared between indexers running on different threads.
///
/// Every call takes the lock for its duration, so id assignment stays
/// atomic across threads.
#[derive(Clone, Default)]
pub struct SharedGraph {
    inner: Arc<Mutex<Graph>>,
}

impl SharedGraph {
    pub fn new(graph: Graph) -> Self {
        Self {
            inner: Arc::new(Mutex::new(graph)),
        }
    }

    /// Lock the graph for reading or writing.
    pub fn lock(&self) -> Result<MutexGuard<'_, Graph>> {
        self.inner
            .lock()
            .map_err(|e| DictoError::store(format!("graph lock poisoned: {}", e)))
    }

    /// Take the graph back out. Fails while other handles are alive.
    pub fn into_inner(self) -> Result<Graph> {
        let mutex = Arc::try_unwrap(self.inner)
            .map_err(|_| DictoError::store("graph is still shared by another handle"))?;
        mutex
            .into_inner()
            .map_err(|e| DictoError::store(format!("graph lock poisoned: {}", e)))
    }
}

impl Insert for SharedGraph {
    fn entity(
        &mut self,
        entity_type: EntityType,
        name: &str,
        file: &Path,
        start_line: usize,
        end_line: usize,
        source: &str,
    ) -> Result<Id> {
        self.lock()?
            .entity(entity_type, name, file, start_line, end_line, source)
    }

    fn reference(
        &mut self,
        entity_type: EntityType,
        name: &str,
        file: &Path,
        line: usize,
    ) -> Result<Id> {
        self.lock()?.reference(entity_type, name, file, line)
    }

    fn dependency(
        &mut self,
        dependent: Id,
        dependency: Id,
        file: &Path,
        line: usize,
        source_line: &str,
    ) -> Result<()> {
        self.lock()?
            .dependency(dependent, dependency, file, line, source_line)
    }

    fn invocation(
        &mut self,
        invoker: Id,
        invokee: Id,
        file: &Path,
        line: usize,
        source_line: &str,
    ) -> Result<()> {
        self.lock()?
            .invocation(invoker, invokee, file, line, source_line)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::thread;

    #[test]
    fn test_shared_graph_assigns_unique_ids_across_threads() {
        let shared = SharedGraph::default();

        let handles: Vec<_> = (0..4)
            .map(|t| {
                let mut store = shared.clone();
                thread::spawn(move || {
                    let file = format!("f{}.php", t);
                    let mut ids = Vec::new();
                    for i in 0..25 {
                        let id = if i % 2 == 0 {
                            store
                                .entity(EntityType::Function, "f", Path::new(&file), i, i, "")
                                .unwrap()
                        } else {
                            store
                                .reference(EntityType::Function, "g", Path::new(&file), i)
                                .unwrap()
                        };
                        ids.push(id);
                    }
                    ids
                })
            })
            .collect();

        let mut seen = HashSet::new();
        for handle in handles {
            for id in handle.join().unwrap() {
                assert!(seen.insert(id), "id {} handed out twice", id);
            }
        }
        assert_eq!(seen.len(), 100);

        let graph = shared.into_inner().unwrap();
        assert_eq!(graph.stats().total_nodes, 100);
    }

    #[test]
    fn test_into_inner_fails_while_shared() {
        let shared = SharedGraph::default();
        let _other = shared.clone();
        assert!(matches!(shared.into_inner(), Err(DictoError::Store(_))));
    }
}

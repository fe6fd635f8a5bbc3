//! Listeners get told about everything the indexer walks through.
//!
//! Most extractors only care about a few kinds of expressions. They
//! register callbacks on a [`ListenerRegistry`], which turns them into a
//! single [`Listener`] for the indexer.

use std::collections::HashMap;
use std::sync::Arc;

use super::location::Location;
use crate::error::Result;
use crate::graph::Id;
use crate::parser::AstNode;

/// Traversal hooks. Every hook defaults to doing nothing.
///
/// Typed hooks fire after the entity was recorded and pushed on the
/// nesting context (enter) or after it was popped (leave). All other nodes
/// go to the misc hooks.
#[allow(unused_variables)]
pub trait Listener: Send + Sync {
    fn on_enter_file(&self, location: &mut Location<'_>, id: Id) -> Result<()> {
        Ok(())
    }

    fn on_leave_file(&self, location: &mut Location<'_>, id: Id) -> Result<()> {
        Ok(())
    }

    fn on_enter_class(&self, location: &mut Location<'_>, id: Id, node: &AstNode) -> Result<()> {
        Ok(())
    }

    fn on_leave_class(&self, location: &mut Location<'_>, id: Id, node: &AstNode) -> Result<()> {
        Ok(())
    }

    fn on_enter_method(&self, location: &mut Location<'_>, id: Id, node: &AstNode) -> Result<()> {
        Ok(())
    }

    fn on_leave_method(&self, location: &mut Location<'_>, id: Id, node: &AstNode) -> Result<()> {
        Ok(())
    }

    fn on_enter_function(
        &self,
        location: &mut Location<'_>,
        id: Id,
        node: &AstNode,
    ) -> Result<()> {
        Ok(())
    }

    fn on_leave_function(
        &self,
        location: &mut Location<'_>,
        id: Id,
        node: &AstNode,
    ) -> Result<()> {
        Ok(())
    }

    fn on_enter_misc(&self, location: &mut Location<'_>, node: &AstNode) -> Result<()> {
        Ok(())
    }

    fn on_leave_misc(&self, location: &mut Location<'_>, node: &AstNode) -> Result<()> {
        Ok(())
    }
}

/// Callback for a misc node of a registered kind.
pub type Callback = Arc<dyn Fn(&mut Location<'_>, &AstNode) -> Result<()> + Send + Sync>;

/// Something that finds relations in the code.
pub trait Extractor: Send + Sync {
    /// Short name, e.g. `invoke`.
    fn name(&self) -> &'static str;

    fn register_listeners(&self, registry: &mut ListenerRegistry);
}

/// Collects callbacks keyed by node kind (see [`AstKind::name`]).
///
/// [`AstKind::name`]: crate::parser::AstKind::name
#[derive(Default, Clone)]
pub struct ListenerRegistry {
    on_enter: HashMap<&'static str, Vec<Callback>>,
    on_leave: HashMap<&'static str, Vec<Callback>>,
}

impl ListenerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Call `callback` when entering a node of one of `kinds`.
    pub fn enter_misc<F>(&mut self, kinds: &[&'static str], callback: F) -> &mut Self
    where
        F: Fn(&mut Location<'_>, &AstNode) -> Result<()> + Send + Sync + 'static,
    {
        Self::register(&mut self.on_enter, kinds, Arc::new(callback));
        self
    }

    /// Call `callback` when leaving a node of one of `kinds`.
    pub fn leave_misc<F>(&mut self, kinds: &[&'static str], callback: F) -> &mut Self
    where
        F: Fn(&mut Location<'_>, &AstNode) -> Result<()> + Send + Sync + 'static,
    {
        Self::register(&mut self.on_leave, kinds, Arc::new(callback));
        self
    }

    pub fn is_empty(&self) -> bool {
        self.on_enter.is_empty() && self.on_leave.is_empty()
    }

    fn register(
        table: &mut HashMap<&'static str, Vec<Callback>>,
        kinds: &[&'static str],
        callback: Callback,
    ) {
        for kind in kinds {
            table.entry(*kind).or_default().push(Arc::clone(&callback));
        }
    }

    fn dispatch(
        table: &HashMap<&'static str, Vec<Callback>>,
        location: &mut Location<'_>,
        node: &AstNode,
    ) -> Result<()> {
        if let Some(callbacks) = table.get(node.kind.name()) {
            for callback in callbacks {
                callback(location, node)?;
            }
        }
        Ok(())
    }
}

impl Listener for ListenerRegistry {
    fn on_enter_misc(&self, location: &mut Location<'_>, node: &AstNode) -> Result<()> {
        Self::dispatch(&self.on_enter, location, node)
    }

    fn on_leave_misc(&self, location: &mut Location<'_>, node: &AstNode) -> Result<()> {
        Self::dispatch(&self.on_leave, location, node)
    }
}

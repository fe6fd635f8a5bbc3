//! The indexer walks parsed files and writes entities into a store.
//!
//! Every file becomes a `File` entity; classes, methods and functions
//! become entities nested in it. Everything else is handed to the listeners,
//! which is where relations get found.

pub mod listener;
pub mod location;

pub use listener::{Callback, Extractor, Listener, ListenerRegistry};
pub use location::{Frame, Location};

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::debug;

use crate::config::DictoConfig;
use crate::error::{DictoError, Result};
use crate::extract::default_extractors;
use crate::graph::{EntityType, Id, Insert};
use crate::parser::{AstKind, AstNode, SourceParser, TreeSitterParser};

/// Collects everything an [`Indexer`] needs.
pub struct IndexerBuilder<S> {
    root: PathBuf,
    parser: Option<Arc<dyn SourceParser>>,
    store: Option<S>,
    extractors: Vec<Box<dyn Extractor>>,
    listeners: Vec<Box<dyn Listener>>,
}

impl<S: Insert> IndexerBuilder<S> {
    /// An empty builder: no store, no extractors, tree-sitter parser.
    pub fn new() -> Self {
        Self {
            root: PathBuf::from("."),
            parser: None,
            store: None,
            extractors: Vec::new(),
            listeners: Vec::new(),
        }
    }

    /// A builder set up from configuration, with the default extractors.
    pub fn from_config(config: &DictoConfig) -> Self {
        Self::new()
            .root(&config.project.root)
            .parser(Arc::new(TreeSitterParser::new(
                config.index.tolerate_syntax_errors,
            )))
            .extractors(default_extractors())
    }

    /// Directory indexed paths are relative to.
    pub fn root(mut self, root: impl Into<PathBuf>) -> Self {
        self.root = root.into();
        self
    }

    pub fn parser(mut self, parser: Arc<dyn SourceParser>) -> Self {
        self.parser = Some(parser);
        self
    }

    pub fn store(mut self, store: S) -> Self {
        self.store = Some(store);
        self
    }

    pub fn extractor(mut self, extractor: Box<dyn Extractor>) -> Self {
        self.extractors.push(extractor);
        self
    }

    pub fn extractors(mut self, extractors: impl IntoIterator<Item = Box<dyn Extractor>>) -> Self {
        self.extractors.extend(extractors);
        self
    }

    /// Add a listener that sees every traversal event.
    pub fn listener(mut self, listener: Box<dyn Listener>) -> Self {
        self.listeners.push(listener);
        self
    }

    /// Build the indexer. Fails if no store was attached.
    pub fn build(self) -> Result<Indexer<S>> {
        let store = self.store.ok_or_else(|| {
            DictoError::configuration("an indexer needs a store to insert into")
        })?;

        let mut registry = ListenerRegistry::new();
        for extractor in &self.extractors {
            extractor.register_listeners(&mut registry);
            debug!(extractor = extractor.name(), "registered extractor");
        }

        let mut listeners = self.listeners;
        if !registry.is_empty() {
            listeners.push(Box::new(registry));
        }

        Ok(Indexer {
            root: self.root,
            parser: self
                .parser
                .unwrap_or_else(|| Arc::new(TreeSitterParser::default())),
            listeners: listeners.into(),
            store,
        })
    }
}

impl<S: Insert> Default for IndexerBuilder<S> {
    fn default() -> Self {
        Self::new()
    }
}

/// Indexes files one at a time into its store.
///
/// Parser and listeners are shared; cloning an indexer over a shared store
/// gives an independent indexer for another thread.
#[derive(Clone)]
pub struct Indexer<S> {
    root: PathBuf,
    parser: Arc<dyn SourceParser>,
    listeners: Arc<[Box<dyn Listener>]>,
    store: S,
}

impl<S: Insert> Indexer<S> {
    pub fn builder() -> IndexerBuilder<S> {
        IndexerBuilder::new()
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn into_store(self) -> S {
        self.store
    }

    /// Index one file, given relative to the root.
    ///
    /// IO and parse failures only concern this file. If indexing fails half
    /// way, what was recorded so far stays in the store.
    pub fn index_file(&mut self, path: &Path) -> Result<Id> {
        let full_path = self.root.join(path);
        let bytes = fs::read(&full_path).map_err(|source| DictoError::Io {
            path: full_path.clone(),
            source,
        })?;
        // Legacy sources are often Latin-1; invalid bytes become U+FFFD
        let content = String::from_utf8_lossy(&bytes);
        let ast = self.parser.parse(path, &content)?;
        self.index_ast(path, &content, &ast.nodes)
    }

    /// Index an already parsed file.
    pub fn index_ast(&mut self, path: &Path, content: &str, nodes: &[AstNode]) -> Result<Id> {
        let listeners = Arc::clone(&self.listeners);
        let mut location = Location::new(path, content, &mut self.store);

        let name = path.to_string_lossy();
        let line_count = location.line_count();
        let file_id = location
            .store()
            .entity(EntityType::File, &name, path, 1, line_count, content)?;
        location.push(Frame {
            entity_type: EntityType::File,
            id: file_id,
        });
        for listener in listeners.iter() {
            listener.on_enter_file(&mut location, file_id)?;
        }

        for node in nodes {
            walk(&listeners, &mut location, node)?;
        }

        location.pop();
        for listener in listeners.iter() {
            listener.on_leave_file(&mut location, file_id)?;
        }
        debug_assert!(location.in_entities().is_empty());

        debug!(file = %path.display(), lines = line_count, "indexed file");
        Ok(file_id)
    }
}

/// The constructs that open a new entity.
#[derive(Clone, Copy)]
enum Structure {
    Class,
    Method,
    Function,
}

impl Structure {
    fn of(kind: &AstKind) -> Option<(Self, &str)> {
        match kind {
            AstKind::Class { name } => Some((Structure::Class, name)),
            AstKind::Method { name } => Some((Structure::Method, name)),
            AstKind::Function { name } => Some((Structure::Function, name)),
            _ => None,
        }
    }

    fn entity_type(self) -> EntityType {
        match self {
            Structure::Class => EntityType::Class,
            Structure::Method => EntityType::Method,
            Structure::Function => EntityType::Function,
        }
    }

    fn enter(
        self,
        listener: &dyn Listener,
        location: &mut Location<'_>,
        id: Id,
        node: &AstNode,
    ) -> Result<()> {
        match self {
            Structure::Class => listener.on_enter_class(location, id, node),
            Structure::Method => listener.on_enter_method(location, id, node),
            Structure::Function => listener.on_enter_function(location, id, node),
        }
    }

    fn leave(
        self,
        listener: &dyn Listener,
        location: &mut Location<'_>,
        id: Id,
        node: &AstNode,
    ) -> Result<()> {
        match self {
            Structure::Class => listener.on_leave_class(location, id, node),
            Structure::Method => listener.on_leave_method(location, id, node),
            Structure::Function => listener.on_leave_function(location, id, node),
        }
    }
}

fn walk(listeners: &[Box<dyn Listener>], location: &mut Location<'_>, node: &AstNode) -> Result<()> {
    let Some((structure, name)) = Structure::of(&node.kind) else {
        for listener in listeners {
            listener.on_enter_misc(location, node)?;
        }
        for child in &node.children {
            walk(listeners, location, child)?;
        }
        for listener in listeners {
            listener.on_leave_misc(location, node)?;
        }
        return Ok(());
    };

    let entity_type = structure.entity_type();
    let source = location.lines_from_to(node.start_line, node.end_line);
    let file = location.file_path();
    let id = location.store().entity(
        entity_type,
        name,
        file,
        node.start_line,
        node.end_line,
        &source,
    )?;

    location.push(Frame { entity_type, id });
    for listener in listeners {
        structure.enter(listener.as_ref(), location, id, node)?;
    }

    for child in &node.children {
        walk(listeners, location, child)?;
    }

    location.pop();
    for listener in listeners {
        structure.leave(listener.as_ref(), location, id, node)?;
    }
    Ok(())
}

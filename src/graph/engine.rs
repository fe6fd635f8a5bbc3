//! The in-memory graph store for dicto.
//!
//! Uses petgraph to hold entities, references and the relations between
//! them, and implements [`Insert`] so an indexer can write straight into it.

use petgraph::graph::{DiGraph, EdgeIndex, NodeIndex};
use petgraph::visit::EdgeRef;
use petgraph::Direction;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use std::path::Path;
use tracing::debug;

use super::store::Insert;
use super::types::*;
use crate::error::{DictoError, Result};

/// The code graph: every node, every relation, and an id lookup.
pub struct Graph {
    /// Nodes are entities or references; edges are relations.
    graph: DiGraph<Node, Relation>,
    /// Index: id -> node index.
    ids: HashMap<Id, NodeIndex>,
    /// Index: (type, name) -> node indexes, in insertion order.
    name_index: HashMap<(EntityType, String), Vec<NodeIndex>>,
    /// Next id to hand out. Shared by entities and references.
    next_id: u64,
}

impl Graph {
    /// Create a new empty graph. The first id handed out is 1.
    pub fn new() -> Self {
        Self {
            graph: DiGraph::new(),
            ids: HashMap::new(),
            name_index: HashMap::new(),
            next_id: 1,
        }
    }

    // ─── Node Operations ────────────────────────────────────────

    fn add_node(&mut self, node: Node) -> Id {
        let id = node.id();
        let key = (node.entity_type(), node.name().to_string());
        let idx = self.graph.add_node(node);
        self.ids.insert(id, idx);
        self.name_index.entry(key).or_default().push(idx);
        id
    }

    fn fresh_id(&mut self) -> Id {
        let id = Id(self.next_id);
        self.next_id += 1;
        id
    }

    /// Look up a node by id.
    pub fn node(&self, id: Id) -> Option<&Node> {
        self.ids.get(&id).map(|&idx| &self.graph[idx])
    }

    /// All nodes in id order.
    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        // Nodes are only ever appended and ids only ever grow, so petgraph's
        // index order is id order.
        self.graph.node_weights()
    }

    /// Nodes whose type is in `types`, in id order.
    pub fn nodes_of_types(&self, types: &BTreeSet<EntityType>) -> Vec<&Node> {
        self.nodes()
            .filter(|n| types.contains(&n.entity_type()))
            .collect()
    }

    /// The entity types that occur in the graph.
    pub fn entity_types(&self) -> BTreeSet<EntityType> {
        self.nodes().map(|n| n.entity_type()).collect()
    }

    /// Find nodes by type and exact name.
    pub fn find(&self, entity_type: EntityType, name: &str) -> Vec<&Node> {
        self.name_index
            .get(&(entity_type, name.to_string()))
            .map(|indexes| indexes.iter().map(|&idx| &self.graph[idx]).collect())
            .unwrap_or_default()
    }

    // ─── Relation Operations ────────────────────────────────────

    /// Append a relation from `source` to `target` and return it.
    ///
    /// Both ends must already be in the graph.
    pub fn add_relation(
        &mut self,
        source: Id,
        relation_type: RelationType,
        site: RelationSite,
        properties: Properties,
        target: Id,
    ) -> Result<&Relation> {
        let from = self.index_of(source)?;
        let to = self.index_of(target)?;
        let relation = Relation::new(relation_type, site, properties, target);
        let edge = self.graph.add_edge(from, to, relation);
        Ok(&self.graph[edge])
    }

    /// Outgoing relations of a node, in insertion order.
    pub fn relations(&self, id: Id) -> Vec<&Relation> {
        self.out_edges(id)
            .into_iter()
            .map(|edge| &self.graph[edge])
            .collect()
    }

    /// Targets of the outgoing relations of a node that pass `filter`, in
    /// relation order. A target reached twice is reported twice.
    pub fn related_nodes(&self, id: Id, filter: Option<&dyn Fn(&Relation) -> bool>) -> Vec<&Node> {
        self.out_edges(id)
            .into_iter()
            .filter(|&edge| filter.map_or(true, |f| f(&self.graph[edge])))
            .filter_map(|edge| self.graph.edge_endpoints(edge))
            .map(|(_, target)| &self.graph[target])
            .collect()
    }

    // ─── Stats ──────────────────────────────────────────────────

    /// Get graph statistics.
    pub fn stats(&self) -> GraphStats {
        let mut entities = 0;
        let mut references = 0;
        let mut files = 0;

        for node in self.graph.node_weights() {
            match node {
                Node::Entity(e) => {
                    entities += 1;
                    if e.entity_type == EntityType::File {
                        files += 1;
                    }
                }
                Node::Reference(_) => references += 1,
            }
        }

        GraphStats {
            total_nodes: entities + references,
            entities,
            references,
            relations: self.graph.edge_count(),
            files,
        }
    }

    // ─── Internal Helpers ───────────────────────────────────────

    fn index_of(&self, id: Id) -> Result<NodeIndex> {
        self.ids
            .get(&id)
            .copied()
            .ok_or_else(|| DictoError::store(format!("unknown id {}", id)))
    }

    fn out_edges(&self, id: Id) -> Vec<EdgeIndex> {
        let Some(&idx) = self.ids.get(&id) else {
            return Vec::new();
        };
        // petgraph walks adjacency lists newest first.
        let mut edges: Vec<EdgeIndex> = self
            .graph
            .edges_directed(idx, Direction::Outgoing)
            .map(|e| e.id())
            .collect();
        edges.sort();
        edges
    }

    /// Check that `source` is an entity allowed to depend on things.
    fn check_dependent(&self, source: Id) -> Result<()> {
        let node = &self.graph[self.index_of(source)?];
        match node {
            Node::Entity(e) if e.entity_type.can_depend() => Ok(()),
            Node::Entity(e) => Err(DictoError::store(format!(
                "{} {} '{}' cannot depend on anything",
                e.entity_type, e.id, e.name
            ))),
            Node::Reference(r) => Err(DictoError::store(format!(
                "reference {} '{}' cannot be the source of a relation",
                r.id, r.name
            ))),
        }
    }

    fn record(
        &mut self,
        relation_type: RelationType,
        source: Id,
        target: Id,
        file: &Path,
        line: usize,
        source_line: &str,
    ) -> Result<()> {
        self.check_dependent(source)?;
        let site = RelationSite {
            file: file.to_path_buf(),
            line,
            source_line: source_line.to_string(),
        };
        self.add_relation(source, relation_type, site, Properties::new(), target)?;
        debug!(%source, %target, relation = %relation_type, line, "recorded relation");
        Ok(())
    }
}

impl Default for Graph {
    fn default() -> Self {
        Self::new()
    }
}

impl Insert for Graph {
    fn entity(
        &mut self,
        entity_type: EntityType,
        name: &str,
        file: &Path,
        start_line: usize,
        end_line: usize,
        source: &str,
    ) -> Result<Id> {
        let id = self.fresh_id();
        Ok(self.add_node(Node::Entity(Entity {
            id,
            entity_type,
            name: name.to_string(),
            file: file.to_path_buf(),
            start_line,
            end_line,
            source: source.to_string(),
            properties: Properties::new(),
        })))
    }

    fn reference(
        &mut self,
        entity_type: EntityType,
        name: &str,
        file: &Path,
        line: usize,
    ) -> Result<Id> {
        let id = self.fresh_id();
        Ok(self.add_node(Node::Reference(Reference {
            id,
            entity_type,
            name: name.to_string(),
            file: file.to_path_buf(),
            line,
        })))
    }

    fn dependency(
        &mut self,
        dependent: Id,
        dependency: Id,
        file: &Path,
        line: usize,
        source_line: &str,
    ) -> Result<()> {
        self.record(
            RelationType::Dependency,
            dependent,
            dependency,
            file,
            line,
            source_line,
        )
    }

    fn invocation(
        &mut self,
        invoker: Id,
        invokee: Id,
        file: &Path,
        line: usize,
        source_line: &str,
    ) -> Result<()> {
        self.record(
            RelationType::Invocation,
            invoker,
            invokee,
            file,
            line,
            source_line,
        )
    }
}

// ─── Query Result Types ─────────────────────────────────────────

/// Statistics about the graph.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct GraphStats {
    pub total_nodes: usize,
    pub entities: usize,
    pub references: usize,
    pub relations: usize,
    pub files: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn file() -> &'static Path {
        Path::new("src/Foo.php")
    }

    #[test]
    fn test_empty_graph() {
        let graph = Graph::new();
        let stats = graph.stats();
        assert_eq!(stats.total_nodes, 0);
        assert_eq!(stats.relations, 0);
        assert!(graph.entity_types().is_empty());
    }

    #[test]
    fn test_ids_are_shared_and_monotonic() {
        let mut graph = Graph::new();
        let a = graph
            .entity(EntityType::File, "Foo.php", file(), 1, 10, "")
            .unwrap();
        let b = graph
            .reference(EntityType::Function, "bar", file(), 3)
            .unwrap();
        let c = graph
            .entity(EntityType::Class, "Foo", file(), 2, 9, "class Foo {}")
            .unwrap();
        assert_eq!((a, b, c), (Id(1), Id(2), Id(3)));

        let ids: Vec<Id> = graph.nodes().map(|n| n.id()).collect();
        assert_eq!(ids, vec![Id(1), Id(2), Id(3)]);
        assert!(graph.node(b).unwrap().is_reference());
        assert!(graph.node(Id(4)).is_none());
    }

    #[test]
    fn test_invocation_relation() {
        let mut graph = Graph::new();
        let main = graph
            .entity(EntityType::Function, "main", file(), 1, 5, "function main() { login(); }")
            .unwrap();
        let login = graph
            .reference(EntityType::Function, "login", file(), 2)
            .unwrap();
        graph
            .invocation(main, login, file(), 2, "    login();")
            .unwrap();

        let relations = graph.relations(main);
        assert_eq!(relations.len(), 1);
        assert_eq!(relations[0].relation_type, RelationType::Invocation);
        assert_eq!(relations[0].target, login);
        assert_eq!(relations[0].line, 2);
        assert_eq!(relations[0].source_line, "    login();");

        let related = graph.related_nodes(main, None);
        assert_eq!(related.len(), 1);
        assert_eq!(related[0].name(), "login");
        assert!(graph.relations(login).is_empty());
    }

    #[test]
    fn test_relations_keep_insertion_order() {
        let mut graph = Graph::new();
        let f = graph
            .entity(EntityType::Function, "f", file(), 1, 9, "")
            .unwrap();
        let targets: Vec<Id> = ["a", "b", "c"]
            .iter()
            .enumerate()
            .map(|(i, name)| {
                graph
                    .reference(EntityType::Function, name, file(), i + 2)
                    .unwrap()
            })
            .collect();
        for &t in &targets {
            graph.dependency(f, t, file(), 2, "").unwrap();
        }
        // A duplicate relation is kept, not merged.
        graph.dependency(f, targets[0], file(), 2, "").unwrap();

        let names: Vec<&str> = graph
            .related_nodes(f, None)
            .into_iter()
            .map(|n| n.name())
            .collect();
        assert_eq!(names, vec!["a", "b", "c", "a"]);
    }

    #[test]
    fn test_related_nodes_filter() {
        let mut graph = Graph::new();
        let f = graph
            .entity(EntityType::Method, "run", file(), 1, 9, "")
            .unwrap();
        let called = graph
            .reference(EntityType::Method, "save", file(), 2)
            .unwrap();
        let global = graph
            .reference(EntityType::Global, "config", file(), 3)
            .unwrap();
        graph.invocation(f, called, file(), 2, "").unwrap();
        graph.dependency(f, called, file(), 2, "").unwrap();
        graph.dependency(f, global, file(), 3, "").unwrap();

        let is_invocation = |r: &Relation| r.relation_type == RelationType::Invocation;
        let invoked = graph.related_nodes(f, Some(&is_invocation));
        assert_eq!(invoked.len(), 1);
        assert_eq!(invoked[0].id(), called);

        let is_dependency = |r: &Relation| r.relation_type == RelationType::Dependency;
        let deps = graph.related_nodes(f, Some(&is_dependency));
        assert_eq!(deps.len(), 2);
    }

    #[test]
    fn test_files_cannot_depend() {
        let mut graph = Graph::new();
        let file_id = graph
            .entity(EntityType::File, "Foo.php", file(), 1, 3, "")
            .unwrap();
        let bar = graph
            .reference(EntityType::Function, "bar", file(), 2)
            .unwrap();

        let err = graph.invocation(file_id, bar, file(), 2, "bar();");
        assert!(matches!(err, Err(DictoError::Store(_))));

        let err = graph.dependency(bar, file_id, file(), 2, "bar();");
        assert!(matches!(err, Err(DictoError::Store(_))));
        assert_eq!(graph.stats().relations, 0);
    }

    #[test]
    fn test_unknown_ids_are_rejected() {
        let mut graph = Graph::new();
        let f = graph
            .entity(EntityType::Function, "f", file(), 1, 2, "")
            .unwrap();
        assert!(graph.invocation(f, Id(99), file(), 1, "").is_err());
        assert!(graph.invocation(Id(99), f, file(), 1, "").is_err());
        assert!(graph.relations(Id(99)).is_empty());
    }

    #[test]
    fn test_find_and_nodes_of_types() {
        let mut graph = Graph::new();
        graph
            .entity(EntityType::Function, "init", Path::new("a.php"), 1, 5, "/* a */")
            .unwrap();
        graph
            .entity(EntityType::Function, "init", Path::new("b.php"), 1, 5, "/* b */")
            .unwrap();
        graph
            .entity(EntityType::Class, "init", Path::new("c.php"), 1, 5, "")
            .unwrap();

        let found = graph.find(EntityType::Function, "init");
        assert_eq!(found.len(), 2);
        assert_eq!(found[0].file(), Path::new("a.php"));
        assert_eq!(found[1].file(), Path::new("b.php"));
        assert!(graph.find(EntityType::Method, "init").is_empty());

        let only_classes = BTreeSet::from([EntityType::Class]);
        assert_eq!(graph.nodes_of_types(&only_classes).len(), 1);
        assert_eq!(
            graph.entity_types(),
            BTreeSet::from([EntityType::Class, EntityType::Function])
        );
    }

    #[test]
    fn test_cycle_in_invocations() {
        let mut graph = Graph::new();
        let a = graph
            .entity(EntityType::Function, "func_a", file(), 1, 5, "")
            .unwrap();
        let b = graph
            .entity(EntityType::Function, "func_b", file(), 6, 10, "")
            .unwrap();
        graph.invocation(a, b, file(), 2, "").unwrap();
        graph.invocation(b, a, file(), 7, "").unwrap();

        assert_eq!(graph.related_nodes(a, None)[0].id(), b);
        assert_eq!(graph.related_nodes(b, None)[0].id(), a);
        let stats = graph.stats();
        assert_eq!(stats.entities, 2);
        assert_eq!(stats.relations, 2);
    }

    #[test]
    fn test_add_relation_carries_properties() {
        let mut graph = Graph::new();
        let a = graph
            .entity(EntityType::Class, "A", file(), 1, 5, "")
            .unwrap();
        let b = graph
            .reference(EntityType::Function, "b", file(), 2)
            .unwrap();
        let mut properties = Properties::new();
        properties.insert("weight".to_string(), serde_json::json!(3));
        let site = RelationSite {
            file: file().to_path_buf(),
            line: 2,
            source_line: "b();".to_string(),
        };
        let relation = graph
            .add_relation(a, RelationType::Dependency, site, properties, b)
            .unwrap();
        assert_eq!(relation.target, b);
        assert_eq!(relation.properties["weight"], 3);
    }
}

//! Core types for the dicto code graph.
//!
//! Defines entity types, relation types, and the records that represent
//! code facts (entities and references) and the edges between them.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Identifier shared by entities and references.
///
/// Every id refers to exactly one record of either population.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Id(pub u64);

impl fmt::Display for Id {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Open property bag carried by entities and relations.
pub type Properties = BTreeMap<String, serde_json::Value>;

/// The type of an entity or reference in the code graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityType {
    /// A source file.
    File,
    /// A class definition.
    Class,
    /// A method (function inside a class).
    Method,
    /// A free function.
    Function,
    /// A global variable.
    Global,
    /// A language construct such as `@`.
    Builtin,
}

impl EntityType {
    /// Every entity type, in declaration order.
    pub const ALL: [EntityType; 6] = [
        EntityType::File,
        EntityType::Class,
        EntityType::Method,
        EntityType::Function,
        EntityType::Global,
        EntityType::Builtin,
    ];

    /// Whether entities of this type may be the source of a dependency or
    /// an invocation. Files, globals and language constructs can't.
    pub fn can_depend(&self) -> bool {
        matches!(
            self,
            EntityType::Class | EntityType::Method | EntityType::Function
        )
    }
}

impl fmt::Display for EntityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntityType::File => write!(f, "file"),
            EntityType::Class => write!(f, "class"),
            EntityType::Method => write!(f, "method"),
            EntityType::Function => write!(f, "function"),
            EntityType::Global => write!(f, "global"),
            EntityType::Builtin => write!(f, "builtin"),
        }
    }
}

impl FromStr for EntityType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        EntityType::ALL
            .into_iter()
            .find(|t| t.to_string() == s)
            .ok_or_else(|| format!("unknown entity type '{}'", s))
    }
}

/// The type of a relation in the code graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RelationType {
    /// The body of the source invokes the target.
    #[serde(alias = "invoke")]
    Invocation,
    /// The body of the source makes use of the target.
    #[serde(alias = "depend_on")]
    Dependency,
}

impl fmt::Display for RelationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RelationType::Invocation => write!(f, "invocation"),
            RelationType::Dependency => write!(f, "dependency"),
        }
    }
}

/// A named, located source construct whose definition we have seen.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    pub id: Id,
    pub entity_type: EntityType,
    pub name: String,
    /// File the entity is defined in, relative to the project root.
    pub file: PathBuf,
    /// Starting line number (1-indexed).
    pub start_line: usize,
    /// Ending line number (1-indexed).
    pub end_line: usize,
    /// The verbatim source of the entity.
    pub source: String,
    #[serde(default)]
    pub properties: Properties,
}

/// Something referred to by name whose definition is not at hand, e.g.
/// the callee of a call or a global.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reference {
    pub id: Id,
    pub entity_type: EntityType,
    pub name: String,
    /// File the reference occurs in.
    pub file: PathBuf,
    /// Line the reference occurs on (1-indexed).
    pub line: usize,
}

/// A node in the graph: either an entity or a reference.
///
/// Its outgoing relations are owned by the graph as out-edges and are
/// reported in insertion order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "node", rename_all = "snake_case")]
pub enum Node {
    Entity(Entity),
    Reference(Reference),
}

impl Node {
    pub fn id(&self) -> Id {
        match self {
            Node::Entity(e) => e.id,
            Node::Reference(r) => r.id,
        }
    }

    pub fn entity_type(&self) -> EntityType {
        match self {
            Node::Entity(e) => e.entity_type,
            Node::Reference(r) => r.entity_type,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Node::Entity(e) => &e.name,
            Node::Reference(r) => &r.name,
        }
    }

    pub fn file(&self) -> &Path {
        match self {
            Node::Entity(e) => &e.file,
            Node::Reference(r) => &r.file,
        }
    }

    /// First line of the entity, or the line of the reference.
    pub fn line(&self) -> usize {
        match self {
            Node::Entity(e) => e.start_line,
            Node::Reference(r) => r.line,
        }
    }

    pub fn is_reference(&self) -> bool {
        matches!(self, Node::Reference(_))
    }

    pub fn as_entity(&self) -> Option<&Entity> {
        match self {
            Node::Entity(e) => Some(e),
            Node::Reference(_) => None,
        }
    }
}

/// Where a relation was created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelationSite {
    pub file: PathBuf,
    pub line: usize,
    /// The full source line the relation was found on.
    pub source_line: String,
}

/// A directed, typed edge from its source node to `target`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Relation {
    pub relation_type: RelationType,
    pub target: Id,
    pub file: PathBuf,
    pub line: usize,
    pub source_line: String,
    #[serde(default)]
    pub properties: Properties,
}

impl Relation {
    pub fn new(
        relation_type: RelationType,
        site: RelationSite,
        properties: Properties,
        target: Id,
    ) -> Self {
        Self {
            relation_type,
            target,
            file: site.file,
            line: site.line,
            source_line: site.source_line,
            properties,
        }
    }
}

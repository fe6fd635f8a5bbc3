//! # dicto
//!
//! Architecture rules for PHP codebases.
//!
//! dicto indexes a PHP project into a graph of entities (files, classes,
//! methods, functions) and references (the things they call or use), then
//! checks rules such as "controllers cannot invoke `eval`" against it.
//!
//! ## Key Features
//!
//! - **Graph-based**: entities, references and typed relations in one id space
//! - **Extensible**: relation extractors plug into the indexer as listeners
//! - **Parallel**: files are indexed on the rayon pool into a shared store
//! - **Compiled predicates**: selectors run as small stack programs
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use dicto::{build_graph, check_all, DictoConfig, RuleLoader, TomlRuleLoader};
//! use std::path::Path;
//!
//! let config = DictoConfig::load_or_default(Path::new(".")).unwrap();
//! let (graph, report) = build_graph(&config).unwrap();
//! println!("{}", report);
//!
//! let rules = TomlRuleLoader::new()
//!     .load_rules_from(Path::new("rules.toml"))
//!     .unwrap();
//! for violation in check_all(&rules, &graph) {
//!     println!("{}", violation);
//! }
//! ```

pub mod cli;
pub mod config;
pub mod error;
pub mod extract;
pub mod graph;
pub mod indexer;
pub mod parser;
pub mod predicate;
pub mod rules;

// Re-exports for convenience
pub use config::DictoConfig;
pub use error::{DictoError, Result};

// Graph re-exports
pub use graph::{
    build_graph, BuildReport, Entity, EntityType, Graph, GraphStats, Id, Insert, Node, Reference,
    Relation, RelationType, SharedGraph,
};
pub use indexer::{Extractor, Indexer, IndexerBuilder, Listener, ListenerRegistry, Location};
pub use parser::{SourceParser, SupportedLanguage, TreeSitterParser};

// Predicates and rules
pub use predicate::{Compiler, Matcher, Predicate};
pub use rules::{check_all, Rule, RuleLoader, RuleMode, TomlRuleLoader, Violation};

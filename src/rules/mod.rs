//! Architecture rules and checking them against a graph.
//!
//! A rule says that some entities (the subject) cannot, or must, have a
//! relation of some type to some other nodes (the object).

mod loader;

pub use loader::{RuleLoader, SelectorSpec, TomlRuleLoader};

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::debug;

use crate::graph::{Graph, Id, Node, RelationType};
use crate::predicate::{Compiler, Predicate};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleMode {
    /// No subject may have the relation to an object.
    Cannot,
    /// Every subject must have the relation to some object.
    Must,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Rule {
    pub name: String,
    pub mode: RuleMode,
    pub subject: Predicate,
    pub relation: RelationType,
    pub object: Arc<Predicate>,
}

/// A place where a rule is broken.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Violation {
    pub rule: String,
    pub subject: Id,
    pub subject_name: String,
    pub file: PathBuf,
    pub line: usize,
    pub source_line: String,
    /// What the subject must not be related to. None for `must` rules.
    pub target: Option<String>,
}

impl Rule {
    pub fn new(
        name: impl Into<String>,
        mode: RuleMode,
        subject: Predicate,
        relation: RelationType,
        object: Arc<Predicate>,
    ) -> Self {
        Self {
            name: name.into(),
            mode,
            subject,
            relation,
            object,
        }
    }

    /// Check the rule against every entity the subject selects.
    pub fn check(&self, graph: &Graph) -> Vec<Violation> {
        let mut compiler = Compiler::new();
        let subjects = compiler.matcher(&self.subject);
        let objects = compiler.matcher(&self.object);

        let mut violations = Vec::new();
        for subject in subjects.select(graph) {
            let Node::Entity(entity) = subject else {
                continue;
            };
            let hits: Vec<_> = graph
                .relations(entity.id)
                .into_iter()
                .filter(|r| r.relation_type == self.relation)
                .filter_map(|r| graph.node(r.target).map(|target| (r, target)))
                .filter(|(_, target)| objects.matches(graph, target))
                .collect();

            match self.mode {
                RuleMode::Cannot => {
                    violations.extend(hits.into_iter().map(|(relation, target)| Violation {
                        rule: self.name.clone(),
                        subject: entity.id,
                        subject_name: entity.name.clone(),
                        file: relation.file.clone(),
                        line: relation.line,
                        source_line: relation.source_line.clone(),
                        target: Some(target.name().to_string()),
                    }))
                }
                RuleMode::Must if hits.is_empty() => violations.push(Violation {
                    rule: self.name.clone(),
                    subject: entity.id,
                    subject_name: entity.name.clone(),
                    file: entity.file.clone(),
                    line: entity.start_line,
                    source_line: entity.source.lines().next().unwrap_or("").to_string(),
                    target: None,
                }),
                RuleMode::Must => {}
            }
        }
        debug!(rule = %self.name, violations = violations.len(), "checked rule");
        violations
    }
}

impl fmt::Display for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mode = match self.mode {
            RuleMode::Cannot => "cannot",
            RuleMode::Must => "must",
        };
        let relation = match self.relation {
            RelationType::Invocation => "invoke",
            RelationType::Dependency => "depend on",
        };
        write!(f, "{} {} {} {}", self.subject, mode, relation, self.object)
    }
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.target {
            Some(target) => write!(
                f,
                "{}:{}: {} -> {} [{}]",
                self.file.display(),
                self.line,
                self.subject_name,
                target,
                self.rule
            ),
            None => write!(
                f,
                "{}:{}: {} [{}]",
                self.file.display(),
                self.line,
                self.subject_name,
                self.rule
            ),
        }
    }
}

/// Check every rule, violations in rule order.
pub fn check_all(rules: &[Rule], graph: &Graph) -> Vec<Violation> {
    rules.iter().flat_map(|rule| rule.check(graph)).collect()
}

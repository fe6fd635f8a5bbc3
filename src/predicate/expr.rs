//! Predicate expressions over graph nodes.
//!
//! Predicates are plain immutable trees. Relation targets are held in an
//! `Arc` so one target predicate can be shared between many trees and
//! compiled once.

use regex::Regex;
use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

use crate::error::{DictoError, Result};
use crate::graph::{EntityType, Graph, Node, Relation, RelationType};

/// A regular expression that has to match a whole name.
#[derive(Clone)]
pub struct NamePattern {
    pattern: String,
    regex: Regex,
}

impl NamePattern {
    pub fn new(pattern: &str) -> Result<Self> {
        let regex = Regex::new(&format!("^(?:{})$", pattern)).map_err(|e| {
            DictoError::input_validation(format!("invalid name pattern '{}': {}", pattern, e))
        })?;
        Ok(Self {
            pattern: pattern.to_string(),
            regex,
        })
    }

    pub fn is_match(&self, name: &str) -> bool {
        self.regex.is_match(name)
    }

    /// The pattern as written, without the anchors.
    pub fn as_str(&self) -> &str {
        &self.pattern
    }
}

impl PartialEq for NamePattern {
    fn eq(&self, other: &Self) -> bool {
        self.pattern == other.pattern
    }
}

impl Eq for NamePattern {}

impl fmt::Debug for NamePattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NamePattern({:?})", self.pattern)
    }
}

/// A boolean expression over a node's type, name and relations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Predicate {
    /// The node has this type.
    TypeIs(EntityType),
    /// The node's name matches the pattern.
    NameMatches(NamePattern),
    /// Some outgoing relation of the given type leads to a node matching
    /// `target`.
    Related {
        relation: RelationType,
        target: Arc<Predicate>,
    },
    /// All of them. True when empty.
    And(Vec<Predicate>),
    /// Any of them. False when empty.
    Or(Vec<Predicate>),
    Not(Box<Predicate>),
}

impl Predicate {
    pub fn type_is(entity_type: EntityType) -> Self {
        Predicate::TypeIs(entity_type)
    }

    pub fn name_matches(pattern: &str) -> Result<Self> {
        Ok(Predicate::NameMatches(NamePattern::new(pattern)?))
    }

    pub fn related(relation: RelationType, target: Arc<Predicate>) -> Self {
        Predicate::Related { relation, target }
    }

    pub fn invokes(target: Arc<Predicate>) -> Self {
        Self::related(RelationType::Invocation, target)
    }

    pub fn depends_on(target: Arc<Predicate>) -> Self {
        Self::related(RelationType::Dependency, target)
    }

    /// Matches every node.
    pub fn everything() -> Self {
        Predicate::And(Vec::new())
    }

    pub fn and(self, other: Predicate) -> Self {
        match self {
            Predicate::And(mut all) => {
                all.push(other);
                Predicate::And(all)
            }
            first => Predicate::And(vec![first, other]),
        }
    }

    pub fn or(self, other: Predicate) -> Self {
        match self {
            Predicate::Or(mut any) => {
                any.push(other);
                Predicate::Or(any)
            }
            first => Predicate::Or(vec![first, other]),
        }
    }

    pub fn negate(self) -> Self {
        Predicate::Not(Box::new(self))
    }

    /// The types a node could have and still match, given the types that
    /// exist at all.
    ///
    /// This over-approximates: a type may be in the set without any node
    /// of that type matching, but a type outside the set never matches.
    pub fn for_types(&self, existing: &BTreeSet<EntityType>) -> BTreeSet<EntityType> {
        match self {
            Predicate::TypeIs(t) => BTreeSet::from([*t]),
            Predicate::NameMatches(_) | Predicate::Related { .. } => existing.clone(),
            Predicate::And(all) => all.iter().fold(existing.clone(), |acc, p| {
                acc.intersection(&p.for_types(existing)).copied().collect()
            }),
            Predicate::Or(any) => any.iter().fold(BTreeSet::new(), |mut acc, p| {
                acc.extend(p.for_types(existing));
                acc
            }),
            Predicate::Not(inner) => match inner.as_ref() {
                Predicate::TypeIs(t) => existing.iter().filter(|e| *e != t).copied().collect(),
                _ => existing.clone(),
            },
        }
    }

    /// Evaluate directly on the tree, without compiling.
    pub fn evaluate(&self, graph: &Graph, node: &Node) -> bool {
        match self {
            Predicate::TypeIs(t) => node.entity_type() == *t,
            Predicate::NameMatches(pattern) => pattern.is_match(node.name()),
            Predicate::Related { relation, target } => {
                let of_type = |r: &Relation| r.relation_type == *relation;
                graph
                    .related_nodes(node.id(), Some(&of_type))
                    .into_iter()
                    .any(|t| target.evaluate(graph, t))
            }
            Predicate::And(all) => all.iter().all(|p| p.evaluate(graph, node)),
            Predicate::Or(any) => any.iter().any(|p| p.evaluate(graph, node)),
            Predicate::Not(inner) => !inner.evaluate(graph, node),
        }
    }
}

fn write_joined(f: &mut fmt::Formatter<'_>, parts: &[Predicate], op: &str) -> fmt::Result {
    write!(f, "(")?;
    for (i, p) in parts.iter().enumerate() {
        if i > 0 {
            write!(f, " {} ", op)?;
        }
        write!(f, "{}", p)?;
    }
    write!(f, ")")
}

impl fmt::Display for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Predicate::TypeIs(t) => write!(f, "{}", t),
            Predicate::NameMatches(p) => write!(f, "name ~ /{}/", p.as_str()),
            Predicate::Related { relation, target } => match relation {
                RelationType::Invocation => write!(f, "invokes {}", target),
                RelationType::Dependency => write!(f, "depends on {}", target),
            },
            Predicate::And(all) if all.is_empty() => write!(f, "everything"),
            Predicate::Or(any) if any.is_empty() => write!(f, "nothing"),
            Predicate::And(all) => write_joined(f, all, "and"),
            Predicate::Or(any) => write_joined(f, any, "or"),
            Predicate::Not(inner) => write!(f, "not {}", inner),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn all_types() -> BTreeSet<EntityType> {
        EntityType::ALL.into_iter().collect()
    }

    #[test]
    fn test_name_pattern_is_anchored() {
        let p = NamePattern::new("get.*").unwrap();
        assert!(p.is_match("getUser"));
        assert!(!p.is_match("forget"));
        assert!(NamePattern::new("a|b").unwrap().is_match("b"));
        assert!(!NamePattern::new("a|b").unwrap().is_match("ab"));
    }

    #[test]
    fn test_invalid_name_pattern() {
        let err = Predicate::name_matches("(unclosed").unwrap_err();
        assert!(matches!(err, DictoError::InputValidation(_)));
    }

    #[test]
    fn test_for_types_leaves() {
        let existing = all_types();
        assert_eq!(
            Predicate::type_is(EntityType::Class).for_types(&existing),
            BTreeSet::from([EntityType::Class])
        );
        let by_name = Predicate::name_matches("foo").unwrap();
        assert_eq!(by_name.for_types(&existing), existing);
        let related = Predicate::invokes(Arc::new(Predicate::everything()));
        assert_eq!(related.for_types(&existing), existing);
    }

    #[test]
    fn test_for_types_combinators() {
        let existing = all_types();
        let class = Predicate::type_is(EntityType::Class);
        let function = Predicate::type_is(EntityType::Function);

        let both = class.clone().and(function.clone());
        assert!(both.for_types(&existing).is_empty());

        let either = class.clone().or(function.clone());
        assert_eq!(
            either.for_types(&existing),
            BTreeSet::from([EntityType::Class, EntityType::Function])
        );

        let not_class = class.clone().negate();
        let types = not_class.for_types(&existing);
        assert!(!types.contains(&EntityType::Class));
        assert_eq!(types.len(), EntityType::ALL.len() - 1);

        let not_either = either.negate();
        assert_eq!(not_either.for_types(&existing), existing);

        assert_eq!(Predicate::everything().for_types(&existing), existing);
        assert!(Predicate::Or(Vec::new()).for_types(&existing).is_empty());
    }

    #[test]
    fn test_for_types_respects_existing() {
        let existing = BTreeSet::from([EntityType::File, EntityType::Function]);
        let not_file = Predicate::type_is(EntityType::File).negate();
        assert_eq!(
            not_file.for_types(&existing),
            BTreeSet::from([EntityType::Function])
        );
        let named_class = Predicate::name_matches("A")
            .unwrap()
            .and(Predicate::type_is(EntityType::Class));
        assert!(named_class.for_types(&existing).is_empty());
    }

    #[test]
    fn test_display() {
        let p = Predicate::type_is(EntityType::Class)
            .and(Predicate::name_matches(".*Controller").unwrap())
            .and(
                Predicate::invokes(Arc::new(Predicate::type_is(EntityType::Function))).negate(),
            );
        assert_eq!(
            p.to_string(),
            "(class and name ~ /.*Controller/ and not invokes function)"
        );
    }
}

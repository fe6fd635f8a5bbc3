//! Reading rules from TOML.
//!
//! ```toml
//! [[rule]]
//! name = "controllers do not eval"
//! mode = "cannot"
//! subject = { type = "class", name = ".*Controller" }
//! relation = "invoke"
//! object = { type = "function", name = "eval" }
//! ```
//!
//! A selector is a table whose keys are all conjoined. `all`, `any`, `not`,
//! `invokes` and `depends_on` nest further selectors.

use serde::Deserialize;
use std::path::Path;
use std::sync::Arc;
use tracing::info;

use super::{Rule, RuleMode};
use crate::error::{DictoError, Result};
use crate::graph::{EntityType, RelationType};
use crate::predicate::Predicate;

pub trait RuleLoader {
    /// Load all rules from `path`. A path that is not a readable, valid
    /// rule file is an input validation error.
    fn load_rules_from(&self, path: &Path) -> Result<Vec<Rule>>;
}

#[derive(Debug, Deserialize)]
struct RuleFile {
    #[serde(default)]
    rule: Vec<RuleSpec>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RuleSpec {
    name: String,
    mode: RuleMode,
    subject: SelectorSpec,
    relation: RelationType,
    object: SelectorSpec,
}

/// One selector table as written in a rule file.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SelectorSpec {
    #[serde(rename = "type")]
    pub entity_type: Option<String>,
    pub name: Option<String>,
    pub all: Option<Vec<SelectorSpec>>,
    pub any: Option<Vec<SelectorSpec>>,
    pub not: Option<Box<SelectorSpec>>,
    pub invokes: Option<Box<SelectorSpec>>,
    pub depends_on: Option<Box<SelectorSpec>>,
}

impl SelectorSpec {
    /// Turn the table into a predicate.
    pub fn to_predicate(&self) -> Result<Predicate> {
        let mut parts = Vec::new();
        if let Some(entity_type) = &self.entity_type {
            let entity_type = entity_type
                .parse::<EntityType>()
                .map_err(DictoError::input_validation)?;
            parts.push(Predicate::type_is(entity_type));
        }
        if let Some(name) = &self.name {
            parts.push(Predicate::name_matches(name)?);
        }
        if let Some(all) = &self.all {
            parts.push(Predicate::And(Self::all_to_predicates(all)?));
        }
        if let Some(any) = &self.any {
            parts.push(Predicate::Or(Self::all_to_predicates(any)?));
        }
        if let Some(not) = &self.not {
            parts.push(not.to_predicate()?.negate());
        }
        if let Some(target) = &self.invokes {
            parts.push(Predicate::invokes(Arc::new(target.to_predicate()?)));
        }
        if let Some(target) = &self.depends_on {
            parts.push(Predicate::depends_on(Arc::new(target.to_predicate()?)));
        }

        match parts.len() {
            0 => Err(DictoError::input_validation("empty selector")),
            1 => Ok(parts.remove(0)),
            _ => Ok(Predicate::And(parts)),
        }
    }

    fn all_to_predicates(specs: &[SelectorSpec]) -> Result<Vec<Predicate>> {
        specs.iter().map(SelectorSpec::to_predicate).collect()
    }
}

/// Loads `[[rule]]` tables from a TOML file.
#[derive(Debug, Clone, Copy, Default)]
pub struct TomlRuleLoader;

impl TomlRuleLoader {
    pub fn new() -> Self {
        Self
    }

    pub fn parse(&self, content: &str) -> Result<Vec<Rule>> {
        let file: RuleFile =
            toml::from_str(content).map_err(|e| DictoError::input_validation(e.to_string()))?;
        file.rule
            .into_iter()
            .map(|spec| {
                let subject = spec.subject.to_predicate().map_err(|e| in_rule(&spec.name, e))?;
                let object = spec.object.to_predicate().map_err(|e| in_rule(&spec.name, e))?;
                Ok(Rule::new(
                    spec.name,
                    spec.mode,
                    subject,
                    spec.relation,
                    Arc::new(object),
                ))
            })
            .collect()
    }
}

fn in_rule(name: &str, err: DictoError) -> DictoError {
    match err {
        DictoError::InputValidation(msg) => {
            DictoError::input_validation(format!("rule '{}': {}", name, msg))
        }
        other => other,
    }
}

impl RuleLoader for TomlRuleLoader {
    fn load_rules_from(&self, path: &Path) -> Result<Vec<Rule>> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            DictoError::input_validation(format!("cannot read rule file {}: {}", path.display(), e))
        })?;
        let rules = self
            .parse(&content)
            .map_err(|e| match e {
                DictoError::InputValidation(msg) => {
                    DictoError::input_validation(format!("{}: {}", path.display(), msg))
                }
                other => other,
            })?;
        info!(path = %path.display(), rules = rules.len(), "loaded rules");
        Ok(rules)
    }
}

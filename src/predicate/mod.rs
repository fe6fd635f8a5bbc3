//! Predicates select nodes of the graph.
//!
//! A [`Predicate`] is built once (usually by the rule loader), compiled
//! into a [`Matcher`] and then run against many nodes.

pub mod compiler;
pub mod expr;

pub use compiler::{Compiler, Instr, Matcher, Program, SubId};
pub use expr::{NamePattern, Predicate};

//! Compiles predicates into programs for a small stack machine.
//!
//! A program is a flat list of instructions working on a stack of booleans.
//! Leaf tests push their result, combinators pop their operands and push
//! the combined result. Relation targets are compiled once into a shared
//! table and referred to by [`SubId`].

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use super::expr::{NamePattern, Predicate};
use crate::graph::{EntityType, Graph, Node, Relation, RelationType};

/// Handle of a compiled relation target in the shared table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubId(usize);

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Instr {
    Const(bool),
    TypeIs(EntityType),
    NameMatches(NamePattern),
    /// Push whether a relation of this type leads to a node on which the
    /// sub program yields true.
    Related {
        relation: RelationType,
        target: SubId,
    },
    /// Pop two, push their conjunction.
    And,
    /// Pop two, push their disjunction.
    Or,
    /// Pop one, push its negation.
    Not,
}

pub type Program = Vec<Instr>;

/// Lowers predicates. Relation targets registered by one compiler are
/// shared by every program it produced.
#[derive(Default)]
pub struct Compiler {
    programs: Vec<Arc<Program>>,
    registered: HashMap<*const Predicate, SubId>,
    // Keeps registered targets alive so their addresses stay unique.
    targets: Vec<Arc<Predicate>>,
}

impl Compiler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn compile(&mut self, predicate: &Predicate) -> Program {
        let mut program = Program::new();
        self.lower(predicate, &mut program);
        program
    }

    /// Compile `predicate` into a matcher sharing this compiler's table.
    ///
    /// The table is snapshotted, so matchers made earlier don't see targets
    /// registered later.
    pub fn matcher(&mut self, predicate: &Predicate) -> Matcher {
        let program = self.compile(predicate);
        Matcher {
            program,
            subs: self.programs.iter().cloned().collect(),
            types: predicate.for_types(&EntityType::ALL.into_iter().collect()),
        }
    }

    /// Number of distinct relation targets compiled so far.
    pub fn sub_program_count(&self) -> usize {
        self.programs.len()
    }

    fn register(&mut self, target: &Arc<Predicate>) -> SubId {
        let key = Arc::as_ptr(target);
        if let Some(&id) = self.registered.get(&key) {
            return id;
        }
        let id = SubId(self.programs.len());
        self.programs.push(Arc::new(Program::new()));
        self.registered.insert(key, id);
        self.targets.push(Arc::clone(target));

        let program = self.compile(target);
        self.programs[id.0] = Arc::new(program);
        id
    }

    fn lower(&mut self, predicate: &Predicate, out: &mut Program) {
        match predicate {
            Predicate::TypeIs(t) => out.push(Instr::TypeIs(*t)),
            Predicate::NameMatches(pattern) => out.push(Instr::NameMatches(pattern.clone())),
            Predicate::Related { relation, target } => {
                let target = self.register(target);
                out.push(Instr::Related {
                    relation: *relation,
                    target,
                });
            }
            Predicate::And(all) => self.lower_chain(all, Instr::And, true, out),
            Predicate::Or(any) => self.lower_chain(any, Instr::Or, false, out),
            Predicate::Not(inner) => {
                self.lower(inner, out);
                out.push(Instr::Not);
            }
        }
    }

    /// `a b c` becomes `a b op c op`; nothing becomes the identity.
    fn lower_chain(&mut self, parts: &[Predicate], op: Instr, identity: bool, out: &mut Program) {
        let Some((first, rest)) = parts.split_first() else {
            out.push(Instr::Const(identity));
            return;
        };
        self.lower(first, out);
        for part in rest {
            self.lower(part, out);
            out.push(op.clone());
        }
    }
}

/// A compiled predicate. Cheap to share between threads.
#[derive(Debug, Clone)]
pub struct Matcher {
    program: Program,
    subs: Arc<[Arc<Program>]>,
    types: BTreeSet<EntityType>,
}

impl Matcher {
    #[cfg(test)]
    pub(crate) fn from_program(program: Program, subs: Vec<Program>) -> Self {
        Self {
            program,
            subs: subs.into_iter().map(Arc::new).collect(),
            types: EntityType::ALL.into_iter().collect(),
        }
    }

    pub fn program(&self) -> &[Instr] {
        &self.program
    }

    /// The only types this matcher can match.
    pub fn for_types(&self) -> &BTreeSet<EntityType> {
        &self.types
    }

    pub fn matches(&self, graph: &Graph, node: &Node) -> bool {
        self.run(&self.program, graph, node)
    }

    /// All nodes in `graph` that match, in id order. Nodes of a type the
    /// predicate can't match are never evaluated.
    pub fn select<'g>(&self, graph: &'g Graph) -> Vec<&'g Node> {
        graph
            .nodes_of_types(&self.types)
            .into_iter()
            .filter(|node| self.matches(graph, node))
            .collect()
    }

    fn run(&self, program: &[Instr], graph: &Graph, node: &Node) -> bool {
        let mut stack: Vec<bool> = Vec::with_capacity(program.len());
        for instr in program {
            let value = match instr {
                Instr::Const(value) => *value,
                Instr::TypeIs(t) => node.entity_type() == *t,
                Instr::NameMatches(pattern) => pattern.is_match(node.name()),
                Instr::Related { relation, target } => {
                    let sub = &self.subs[target.0];
                    let of_type = |r: &Relation| r.relation_type == *relation;
                    graph
                        .related_nodes(node.id(), Some(&of_type))
                        .into_iter()
                        .any(|t| self.run(sub, graph, t))
                }
                Instr::And => {
                    let (a, b) = (pop(&mut stack), pop(&mut stack));
                    a && b
                }
                Instr::Or => {
                    let (a, b) = (pop(&mut stack), pop(&mut stack));
                    a || b
                }
                Instr::Not => !pop(&mut stack),
            };
            stack.push(value);
        }
        match stack.as_slice() {
            [result] => *result,
            rest => panic!(
                "predicate program left {} values on the stack instead of one",
                rest.len()
            ),
        }
    }
}

fn pop(stack: &mut Vec<bool>) -> bool {
    match stack.pop() {
        Some(value) => value,
        None => panic!("predicate program popped an empty stack"),
    }
}

impl Predicate {
    /// Compile with a fresh compiler.
    pub fn compile(&self) -> Matcher {
        Compiler::new().matcher(self)
    }
}

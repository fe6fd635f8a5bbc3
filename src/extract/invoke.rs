//! A class or function invokes something if it is invoked in its body.

use crate::graph::{EntityType, RelationType};
use crate::indexer::{Extractor, ListenerRegistry};
use crate::parser::AstKind;

/// Finds method and function calls.
#[derive(Debug, Clone, Copy, Default)]
pub struct Invoke;

impl Extractor for Invoke {
    fn name(&self) -> &'static str {
        "invoke"
    }

    fn register_listeners(&self, registry: &mut ListenerRegistry) {
        registry
            .enter_misc(&["method_call"], |location, node| {
                // `$this->$method()` has no name we could use.
                if let AstKind::MethodCall { method } = &node.kind {
                    if let Some(name) = method.name() {
                        location.relate_current(
                            RelationType::Invocation,
                            EntityType::Method,
                            name,
                            node.start_line,
                        )?;
                    }
                }
                Ok(())
            })
            .enter_misc(&["function_call"], |location, node| {
                // Closures in variables and functions in arrays are skipped.
                if let AstKind::FunctionCall { function } = &node.kind {
                    if let Some(name) = function.name() {
                        location.relate_current(
                            RelationType::Invocation,
                            EntityType::Function,
                            name,
                            node.start_line,
                        )?;
                    }
                }
                Ok(())
            });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{Graph, Node, Relation};
    use crate::indexer::IndexerBuilder;
    use crate::parser::{AstNode, Callee, SourceParser, TreeSitterParser};
    use std::path::Path;

    /// Index `body` inside `function f() { ... }` and return the graph.
    fn index_in_function(body: &str) -> Graph {
        let source = format!("<?php\nfunction f() {{\n    {}\n}}\n", body);
        let path = Path::new("test.php");
        let ast = TreeSitterParser::default().parse(path, &source).unwrap();
        let mut indexer = IndexerBuilder::new()
            .store(Graph::new())
            .extractor(Box::new(Invoke))
            .build()
            .unwrap();
        indexer.index_ast(path, &source, &ast.nodes).unwrap();
        indexer.into_store()
    }

    fn invoked(graph: &Graph) -> Vec<&Node> {
        let f = graph.find(EntityType::Function, "f")[0].id();
        let is_invocation = |r: &Relation| r.relation_type == RelationType::Invocation;
        graph.related_nodes(f, Some(&is_invocation))
    }

    #[test]
    fn test_method_call_is_invocation() {
        let graph = index_in_function("$obj->method();");
        let targets = invoked(&graph);
        assert_eq!(targets.len(), 1);
        assert!(targets[0].is_reference());
        assert_eq!(targets[0].entity_type(), EntityType::Method);
        assert_eq!(targets[0].name(), "method");
        assert_eq!(targets[0].line(), 3);
    }

    #[test]
    fn test_variable_method_name_is_skipped() {
        let graph = index_in_function("$obj->$variable();");
        assert!(invoked(&graph).is_empty());
        assert_eq!(graph.stats().references, 0);
    }

    #[test]
    fn test_braced_method_name_is_skipped() {
        for body in ["$obj->{FOO}();", "$obj->{$m}();", "$obj->{'run'}();"] {
            let graph = index_in_function(body);
            assert!(invoked(&graph).is_empty(), "{}", body);
            assert_eq!(graph.stats().references, 0, "{}", body);
        }
    }

    #[test]
    fn test_function_call_is_invocation() {
        let graph = index_in_function("bar();");
        let targets = invoked(&graph);
        assert_eq!(targets.len(), 1);
        assert_eq!(targets[0].entity_type(), EntityType::Function);
        assert_eq!(targets[0].name(), "bar");
    }

    #[test]
    fn test_variable_and_array_calls_are_skipped() {
        assert!(invoked(&index_in_function("$fn();")).is_empty());
        assert!(invoked(&index_in_function("$arr[0]();")).is_empty());
    }

    #[test]
    fn test_same_call_twice_on_one_line_shares_reference() {
        let graph = index_in_function("bar(); bar();");
        let targets = invoked(&graph);
        assert_eq!(targets.len(), 2);
        assert_eq!(targets[0].id(), targets[1].id());
        assert_eq!(graph.stats().references, 1);
    }

    #[test]
    fn test_hand_built_tree() {
        let call = |callee| {
            AstNode::new(
                AstKind::FunctionCall { function: callee },
                2,
                2,
            )
        };
        let tree = vec![AstNode::new(AstKind::Function { name: "f".into() }, 1, 3)
            .with_children(vec![
                call(Callee::Named("bar".into())),
                call(Callee::Variable),
                call(Callee::Subscript),
                call(Callee::Dynamic),
            ])];

        let mut indexer = IndexerBuilder::new()
            .store(Graph::new())
            .extractor(Box::new(Invoke))
            .build()
            .unwrap();
        indexer
            .index_ast(Path::new("t.php"), "function f() {\n bar();\n}", &tree)
            .unwrap();
        let graph = indexer.into_store();

        let names: Vec<&str> = invoked(&graph).into_iter().map(|n| n.name()).collect();
        assert_eq!(names, vec!["bar"]);
    }
}

//! Lowering of the tree-sitter PHP tree into [`AstNode`]s.
//!
//! Only named grammar nodes are kept. Structural constructs and calls get
//! their own [`AstKind`]; everything else keeps its grammar kind.

use tree_sitter::Node;

use super::{AstKind, AstNode, Callee};

/// Lower the children of the `program` node.
pub(super) fn lower(root: Node<'_>, source: &[u8]) -> Vec<AstNode> {
    let mut cursor = root.walk();
    root.named_children(&mut cursor)
        .map(|child| lower_node(child, source))
        .collect()
}

fn lower_node(node: Node<'_>, source: &[u8]) -> AstNode {
    let mut cursor = node.walk();
    let children = node
        .named_children(&mut cursor)
        .map(|child| lower_node(child, source))
        .collect();

    AstNode {
        kind: lower_kind(node, source),
        start_line: node.start_position().row + 1,
        end_line: node.end_position().row + 1,
        children,
    }
}

fn lower_kind(node: Node<'_>, source: &[u8]) -> AstKind {
    let kind = match node.kind() {
        "class_declaration" => field_text(node, "name", source).map(|name| AstKind::Class { name }),
        "method_declaration" => {
            field_text(node, "name", source).map(|name| AstKind::Method { name })
        }
        "function_definition" => {
            field_text(node, "name", source).map(|name| AstKind::Function { name })
        }
        "member_call_expression" | "nullsafe_member_call_expression" => Some(AstKind::MethodCall {
            method: member_callee(node, source),
        }),
        "function_call_expression" => Some(AstKind::FunctionCall {
            function: function_callee(node, source),
        }),
        "global_declaration" => Some(AstKind::Global {
            names: global_names(node, source),
        }),
        "error_suppression_expression" => Some(AstKind::ErrorSuppression),
        // Older grammars fold `@` into the unary operators.
        "unary_op_expression" if first_token_is(node, "@") => Some(AstKind::ErrorSuppression),
        _ => None,
    };
    kind.unwrap_or(AstKind::Other(node.kind()))
}

fn text(node: Node<'_>, source: &[u8]) -> Option<String> {
    node.utf8_text(source).ok().map(str::to_string)
}

fn field_text(node: Node<'_>, field: &str, source: &[u8]) -> Option<String> {
    text(node.child_by_field_name(field)?, source)
}

fn first_token_is(node: Node<'_>, token: &str) -> bool {
    let mut cursor = node.walk();
    let first = node.children(&mut cursor).next();
    first.is_some_and(|child| child.kind() == token)
}

/// `$obj->name()` is resolvable, `$obj->$name()` and `$obj->{expr}()` are not.
fn member_callee(node: Node<'_>, source: &[u8]) -> Callee {
    match node.child_by_field_name("name") {
        // `$obj->{FOO}()` calls whatever the constant holds
        Some(name) if is_braced(name) => Callee::Dynamic,
        Some(name) if name.kind() == "name" => text(name, source).map_or(Callee::Dynamic, Callee::Named),
        Some(name) if name.kind() == "variable_name" => Callee::Variable,
        _ => Callee::Dynamic,
    }
}

fn is_braced(name: Node<'_>) -> bool {
    name.prev_sibling().is_some_and(|prev| prev.kind() == "{")
}

fn function_callee(node: Node<'_>, source: &[u8]) -> Callee {
    let Some(function) = node.child_by_field_name("function") else {
        return Callee::Dynamic;
    };
    match function.kind() {
        "name" => text(function, source).map_or(Callee::Dynamic, Callee::Named),
        "qualified_name" => text(function, source)
            .and_then(|qualified| last_segment(&qualified))
            .map_or(Callee::Dynamic, Callee::Named),
        "variable_name" | "dynamic_variable_name" => Callee::Variable,
        "subscript_expression" => Callee::Subscript,
        _ => Callee::Dynamic,
    }
}

/// `\Vendor\Pkg\helper` -> `helper`
fn last_segment(qualified: &str) -> Option<String> {
    qualified
        .rsplit('\\')
        .next()
        .filter(|segment| !segment.is_empty())
        .map(str::to_string)
}

fn global_names(node: Node<'_>, source: &[u8]) -> Vec<String> {
    let mut cursor = node.walk();
    node.named_children(&mut cursor)
        .filter(|child| child.kind() == "variable_name")
        .filter_map(|child| text(child, source))
        .map(|name| name.trim_start_matches('$').to_string())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::super::{SourceParser, TreeSitterParser};
    use super::*;
    use std::path::Path;

    fn parse(source: &str) -> Vec<AstNode> {
        TreeSitterParser::default()
            .parse(Path::new("test.php"), source)
            .unwrap()
            .nodes
    }

    fn collect<'a>(nodes: &'a [AstNode], out: &mut Vec<&'a AstNode>) {
        for node in nodes {
            out.push(node);
            collect(&node.children, out);
        }
    }

    fn kinds(source: &str) -> Vec<AstKind> {
        let nodes = parse(source);
        let mut all = Vec::new();
        collect(&nodes, &mut all);
        all.into_iter()
            .map(|n| n.kind.clone())
            .filter(|k| !matches!(k, AstKind::Other(_)))
            .collect()
    }

    #[test]
    fn test_structural_constructs() {
        let source = r#"<?php
class UserService {
    public function find($id) {
        return $id;
    }
}

function helper() {}
"#;
        let nodes = parse(source);
        let mut all = Vec::new();
        collect(&nodes, &mut all);

        let class = all
            .iter()
            .find(|n| matches!(&n.kind, AstKind::Class { name } if name == "UserService"))
            .unwrap();
        assert_eq!((class.start_line, class.end_line), (2, 6));

        let method = all
            .iter()
            .find(|n| matches!(&n.kind, AstKind::Method { name } if name == "find"))
            .unwrap();
        assert_eq!((method.start_line, method.end_line), (3, 5));

        assert!(all
            .iter()
            .any(|n| matches!(&n.kind, AstKind::Function { name } if name == "helper")));
    }

    #[test]
    fn test_method_calls() {
        assert_eq!(
            kinds("<?php\n$obj->method();\n"),
            vec![AstKind::MethodCall {
                method: Callee::Named("method".into())
            }]
        );
        assert_eq!(
            kinds("<?php\n$obj->$variable();\n"),
            vec![AstKind::MethodCall {
                method: Callee::Variable
            }]
        );
        for braced in ["<?php\n$obj->{FOO}();\n", "<?php\n$obj->{'run'}();\n"] {
            let found = kinds(braced);
            assert!(
                found.contains(&AstKind::MethodCall {
                    method: Callee::Dynamic
                }),
                "{}",
                braced
            );
            assert!(!found
                .iter()
                .any(|k| matches!(k, AstKind::MethodCall { method: Callee::Named(_) })));
        }
        assert_eq!(
            kinds("<?php\n$obj?->method();\n"),
            vec![AstKind::MethodCall {
                method: Callee::Named("method".into())
            }]
        );
    }

    #[test]
    fn test_function_calls() {
        assert_eq!(
            kinds("<?php\nbar();\n"),
            vec![AstKind::FunctionCall {
                function: Callee::Named("bar".into())
            }]
        );
        assert_eq!(
            kinds("<?php\n\\Vendor\\Pkg\\helper();\n"),
            vec![AstKind::FunctionCall {
                function: Callee::Named("helper".into())
            }]
        );
        assert_eq!(
            kinds("<?php\n$fn();\n"),
            vec![AstKind::FunctionCall {
                function: Callee::Variable
            }]
        );
        assert_eq!(
            kinds("<?php\n$arr[0]();\n"),
            vec![AstKind::FunctionCall {
                function: Callee::Subscript
            }]
        );
    }

    #[test]
    fn test_globals_and_error_suppression() {
        let found = kinds("<?php\nfunction f() {\n    global $db, $config;\n    @unlink($path);\n}\n");
        assert!(found.contains(&AstKind::Global {
            names: vec!["db".into(), "config".into()]
        }));
        assert!(found.contains(&AstKind::ErrorSuppression));
        assert!(found.contains(&AstKind::FunctionCall {
            function: Callee::Named("unlink".into())
        }));
    }

    #[test]
    fn test_last_segment() {
        assert_eq!(last_segment("\\A\\b").as_deref(), Some("b"));
        assert_eq!(last_segment("b").as_deref(), Some("b"));
        assert_eq!(last_segment("A\\"), None);
    }
}

//! A class or function depends on everything it uses in its body: the
//! methods and functions it calls, the globals it pulls in and the `@`
//! operator.

use crate::graph::{EntityType, RelationType};
use crate::indexer::{Extractor, ListenerRegistry};
use crate::parser::AstKind;

/// Name of the reference recorded for `@`.
pub const ERROR_SUPPRESSOR: &str = "@";

/// Finds calls, `global` statements and error suppression.
#[derive(Debug, Clone, Copy, Default)]
pub struct DependOn;

impl Extractor for DependOn {
    fn name(&self) -> &'static str {
        "depend_on"
    }

    fn register_listeners(&self, registry: &mut ListenerRegistry) {
        registry
            .enter_misc(&["method_call", "function_call"], |location, node| {
                let target = match &node.kind {
                    AstKind::MethodCall { method } => {
                        method.name().map(|name| (EntityType::Method, name))
                    }
                    AstKind::FunctionCall { function } => {
                        function.name().map(|name| (EntityType::Function, name))
                    }
                    _ => None,
                };
                if let Some((entity_type, name)) = target {
                    location.relate_current(
                        RelationType::Dependency,
                        entity_type,
                        name,
                        node.start_line,
                    )?;
                }
                Ok(())
            })
            .enter_misc(&["global"], |location, node| {
                if let AstKind::Global { names } = &node.kind {
                    for name in names {
                        location.relate_current(
                            RelationType::Dependency,
                            EntityType::Global,
                            name,
                            node.start_line,
                        )?;
                    }
                }
                Ok(())
            })
            .enter_misc(&["error_suppression"], |location, node| {
                location.relate_current(
                    RelationType::Dependency,
                    EntityType::Builtin,
                    ERROR_SUPPRESSOR,
                    node.start_line,
                )?;
                Ok(())
            });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{Graph, Relation};
    use crate::indexer::IndexerBuilder;
    use crate::parser::{SourceParser, TreeSitterParser};
    use std::path::Path;

    fn dependencies(source: &str, owner: (EntityType, &str)) -> Vec<(EntityType, String)> {
        let path = Path::new("test.php");
        let ast = TreeSitterParser::default().parse(path, source).unwrap();
        let mut indexer = IndexerBuilder::new()
            .store(Graph::new())
            .extractor(Box::new(DependOn))
            .build()
            .unwrap();
        indexer.index_ast(path, source, &ast.nodes).unwrap();
        let graph = indexer.into_store();

        let owner = graph.find(owner.0, owner.1)[0].id();
        let is_dependency = |r: &Relation| r.relation_type == RelationType::Dependency;
        graph
            .related_nodes(owner, Some(&is_dependency))
            .into_iter()
            .map(|n| (n.entity_type(), n.name().to_string()))
            .collect()
    }

    #[test]
    fn test_function_depends_on_calls_globals_and_suppression() {
        let source = r#"<?php
function load($path) {
    global $config;
    $data = @file_get_contents($path);
    return $this->parser->parse($data);
}
"#;
        let deps = dependencies(source, (EntityType::Function, "load"));
        assert!(deps.contains(&(EntityType::Global, "config".to_string())));
        assert!(deps.contains(&(EntityType::Builtin, "@".to_string())));
        assert!(deps.contains(&(EntityType::Function, "file_get_contents".to_string())));
        assert!(deps.contains(&(EntityType::Method, "parse".to_string())));
        assert_eq!(deps.len(), 4);
    }

    #[test]
    fn test_method_dependencies_stay_with_the_method() {
        let source = r#"<?php
class Repo {
    public function all() {
        return $this->db->query();
    }
}
"#;
        let deps = dependencies(source, (EntityType::Method, "all"));
        assert_eq!(deps, vec![(EntityType::Method, "query".to_string())]);
        assert!(dependencies(source, (EntityType::Class, "Repo")).is_empty());
    }

    #[test]
    fn test_file_level_code_records_nothing() {
        let source = "<?php\nglobal $x;\nrun();\n";
        let path = Path::new("script.php");
        let ast = TreeSitterParser::default().parse(path, source).unwrap();
        let mut indexer = IndexerBuilder::new()
            .store(Graph::new())
            .extractor(Box::new(DependOn))
            .build()
            .unwrap();
        indexer.index_ast(path, source, &ast.nodes).unwrap();
        let stats = indexer.into_store().stats();
        assert_eq!(stats.relations, 0);
        assert_eq!(stats.references, 0);
        assert_eq!(stats.entities, 1);
    }
}

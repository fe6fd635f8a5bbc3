//! CLI module for dicto.
//!
//! Commands:
//! - index: build the graph and show statistics
//! - check: check the architecture rules against the graph
//! - select: list entities by type and name

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use serde_json::json;
use std::io::Write;
use std::path::PathBuf;

use crate::config::DictoConfig;
use crate::graph::{build_graph, BuildReport, EntityType, Graph};
use crate::rules::{check_all, RuleLoader, SelectorSpec, TomlRuleLoader};

#[derive(Parser)]
#[command(name = "dicto")]
#[command(about = "Architecture rules for PHP codebases", long_about = None)]
pub struct Cli {
    /// Project root directory (default: current directory)
    #[arg(short, long, default_value = ".")]
    pub root: PathBuf,

    /// Print JSON instead of text
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Index the project and show graph statistics
    Index,

    /// Check the rules and list every violation
    Check {
        /// Rule file, relative to the current directory
        /// (default: `rules.path` from dicto.toml, relative to the root)
        #[arg(short = 'f', long)]
        rules: Option<PathBuf>,
    },

    /// List entities by type and name
    Select {
        /// Entity type: file, class, method, function, global, builtin
        #[arg(short = 't', long = "type")]
        entity_type: Option<EntityType>,

        /// Regex the whole name has to match
        #[arg(short, long)]
        name: Option<String>,
    },
}

/// Run a command, writing results to `out`.
///
/// Returns `Ok(false)` when the command ran but found rule violations.
pub fn run(cli: &Cli, out: &mut dyn Write) -> Result<bool> {
    let root = cli.root.canonicalize().unwrap_or_else(|_| cli.root.clone());
    let config = DictoConfig::load_or_default(&root)?;

    match &cli.command {
        Commands::Index => {
            let (graph, report) = build_graph(&config)?;
            print_index(&graph, &report, cli.json, out)?;
            Ok(true)
        }

        Commands::Check { rules } => {
            let path = match (rules, &config.rules.path) {
                (Some(path), _) => path.clone(),
                (None, Some(path)) => root.join(path),
                (None, None) => {
                    bail!("no rule file given (use --rules or set rules.path in dicto.toml)")
                }
            };
            let rules = TomlRuleLoader::new().load_rules_from(&path)?;
            let (graph, report) = build_graph(&config)?;
            let violations = check_all(&rules, &graph);

            if cli.json {
                let value = json!({ "report": report, "violations": violations });
                writeln!(out, "{}", serde_json::to_string_pretty(&value)?)?;
            } else {
                for v in &violations {
                    writeln!(out, "{}", v)?;
                    writeln!(out, "    {}", v.source_line.trim())?;
                }
                writeln!(
                    out,
                    "{} violation(s) of {} rule(s); {}",
                    violations.len(),
                    rules.len(),
                    report
                )?;
            }
            Ok(violations.is_empty())
        }

        Commands::Select { entity_type, name } => {
            let spec = SelectorSpec {
                entity_type: entity_type.map(|t| t.to_string()),
                name: name.clone(),
                ..Default::default()
            };
            let spec = match (entity_type, name) {
                (None, None) => SelectorSpec {
                    all: Some(Vec::new()),
                    ..spec
                },
                _ => spec,
            };
            let matcher = spec
                .to_predicate()
                .context("invalid selector")?
                .compile();
            let (graph, _) = build_graph(&config)?;
            let entities: Vec<_> = matcher
                .select(&graph)
                .into_iter()
                .filter_map(|node| node.as_entity())
                .collect();

            if cli.json {
                writeln!(out, "{}", serde_json::to_string_pretty(&entities)?)?;
            } else {
                for e in &entities {
                    writeln!(
                        out,
                        "{} {} - {}:{}",
                        e.entity_type,
                        e.name,
                        e.file.display(),
                        e.start_line
                    )?;
                }
            }
            Ok(true)
        }
    }
}

fn print_index(graph: &Graph, report: &BuildReport, json: bool, out: &mut dyn Write) -> Result<()> {
    let stats = graph.stats();
    if json {
        let value = json!({ "report": report, "stats": stats });
        writeln!(out, "{}", serde_json::to_string_pretty(&value)?)?;
        return Ok(());
    }

    writeln!(out, "{}", report)?;
    writeln!(out, "Entities:   {}", stats.entities)?;
    writeln!(out, "References: {}", stats.references)?;
    writeln!(out, "Relations:  {}", stats.relations)?;
    for (path, reason) in &report.failed {
        writeln!(out, "  skipped {}: {}", path.display(), reason)?;
    }
    Ok(())
}

//! Graph builder: scans a project and indexes every source file.
//!
//! Walks source files respecting .gitignore and indexes them in parallel
//! into one shared graph. A file that can't be read or parsed is logged and
//! reported; any other error stops the build.

use ignore::WalkBuilder;
use rayon::prelude::*;
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use super::engine::Graph;
use super::store::SharedGraph;
use crate::config::DictoConfig;
use crate::error::Result;
use crate::indexer::{Indexer, IndexerBuilder};

/// Outcome of a build.
#[derive(Debug, Clone, Default, Serialize)]
pub struct BuildReport {
    /// Files indexed without error.
    pub indexed: usize,
    /// Files skipped, with the reason.
    pub failed: Vec<(PathBuf, String)>,
}

/// Source files under the project root, relative to it and sorted.
pub fn collect_files(config: &DictoConfig) -> Vec<PathBuf> {
    let root = &config.project.root;
    let mut files: Vec<PathBuf> = WalkBuilder::new(root)
        .hidden(true)
        .git_ignore(true)
        .git_global(true)
        .git_exclude(true)
        .require_git(false)
        .build()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_some_and(|ft| ft.is_file()))
        .filter(|entry| config.project.accepts(entry.path()))
        .filter_map(|entry| {
            entry
                .path()
                .strip_prefix(root)
                .ok()
                .map(Path::to_path_buf)
        })
        .collect();
    files.sort();
    files
}

/// Build the code graph for the project described by `config`.
pub fn build_graph(config: &DictoConfig) -> Result<(Graph, BuildReport)> {
    let files = collect_files(config);
    info!(
        root = %config.project.root.display(),
        file_count = files.len(),
        parallel = config.index.parallel,
        "indexing project"
    );

    let shared = SharedGraph::default();
    let indexer = IndexerBuilder::from_config(config)
        .store(shared.clone())
        .build()?;

    // Ok(None) for an indexed file, Ok(Some(reason)) for a skipped one.
    let index = |indexer: &mut Indexer<SharedGraph>, path: &PathBuf| {
        match indexer.index_file(path) {
            Ok(_) => Ok(None),
            Err(e) if e.is_recoverable() => {
                warn!(file = %path.display(), error = %e, "skipping file");
                Ok(Some((path.clone(), e.to_string())))
            }
            Err(e) => Err(e),
        }
    };

    let outcomes: Vec<Option<(PathBuf, String)>> = if config.index.parallel {
        files
            .par_iter()
            .map_init(|| indexer.clone(), index)
            .collect::<Result<_>>()?
    } else {
        let mut sequential = indexer.clone();
        files
            .iter()
            .map(|path| index(&mut sequential, path))
            .collect::<Result<_>>()?
    };
    drop(indexer);

    let mut report = BuildReport::default();
    for outcome in outcomes {
        match outcome {
            None => report.indexed += 1,
            Some(failure) => report.failed.push(failure),
        }
    }

    let graph = shared.into_inner()?;
    let stats = graph.stats();
    info!(
        files = report.indexed,
        failed = report.failed.len(),
        entities = stats.entities,
        references = stats.references,
        relations = stats.relations,
        "graph built"
    );
    Ok((graph, report))
}

impl BuildReport {
    pub fn is_clean(&self) -> bool {
        self.failed.is_empty()
    }
}

impl std::fmt::Display for BuildReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Indexed {} files ({} failed)",
            self.indexed,
            self.failed.len()
        )
    }
}

//! Dependency resolution.
//!
//! Computes, for every extension module, the transitive closure of shared
//! libraries it loads. Only libraries produced by the build graph are
//! tracked. The resolver is pure and deterministic: traversals read an
//! immutable graph and run on a worker pool, and the merge looks across
//! every closure for libraries sharing a file name.

pub mod resolve;

pub use resolve::{Resolution, ResolvedSet};

use std::collections::{HashMap, HashSet, VecDeque};

use rayon::prelude::*;

use crate::core::{Artifact, ArtifactId, BuildGraph};
use crate::errors::LayoutError;

/// Resolves shared-library closures over a build graph.
pub struct Resolver<'g> {
    graph: &'g BuildGraph,

    /// Library cycles of the whole graph, computed once
    cycles: Vec<Vec<ArtifactId>>,

    /// Worker threads for `resolve_all` (None = rayon default)
    jobs: Option<usize>,
}

impl<'g> Resolver<'g> {
    pub fn new(graph: &'g BuildGraph) -> Self {
        Resolver {
            graph,
            cycles: graph.cycles(),
            jobs: None,
        }
    }

    pub fn with_jobs(mut self, jobs: Option<usize>) -> Self {
        self.jobs = jobs.filter(|&j| j > 0);
        self
    }

    /// Compute the closure of one artifact.
    ///
    /// Traverses declared dependency edges breadth-first. Each library is
    /// visited once, so libraries reachable by several paths appear once
    /// and cycles terminate.
    pub fn resolve(&self, id: &ArtifactId) -> Result<ResolvedSet, LayoutError> {
        let root = self
            .graph
            .get(id)
            .ok_or_else(|| LayoutError::MalformedArtifact {
                identity: id.to_string(),
                reason: "not in the build graph".to_string(),
            })?;

        let mut visited: HashSet<&ArtifactId> = HashSet::new();
        visited.insert(root.id());

        let mut queue: VecDeque<&ArtifactId> = root.dependencies().iter().collect();
        let mut libraries = Vec::new();

        while let Some(dep) = queue.pop_front() {
            if !visited.insert(dep) {
                continue;
            }
            let Some(library) = self.graph.get(dep) else {
                continue;
            };
            libraries.push(dep.clone());
            queue.extend(library.dependencies());
        }

        let cycles = self
            .cycles
            .iter()
            .filter(|cycle| cycle.iter().any(|m| libraries.contains(m) || m == root.id()))
            .cloned()
            .collect();

        tracing::debug!("resolved `{}`: {} libraries", root.id(), libraries.len());

        Ok(ResolvedSet {
            root: root.id().clone(),
            libraries,
            cycles,
        })
    }

    /// Resolve every extension module and merge the results.
    ///
    /// Traversals run in parallel. On failure, the error of the first
    /// extension module (in identity order) is returned.
    pub fn resolve_all(&self) -> Result<Resolution, LayoutError> {
        let roots: Vec<&ArtifactId> = self.graph.extensions().map(|a| a.id()).collect();

        let traverse = || -> Vec<Result<ResolvedSet, LayoutError>> {
            roots.par_iter().map(|id| self.resolve(id)).collect()
        };

        let results = match self.jobs {
            Some(jobs) => match rayon::ThreadPoolBuilder::new().num_threads(jobs).build() {
                Ok(pool) => pool.install(traverse),
                Err(e) => {
                    tracing::warn!("failed to start {} resolver threads: {}", jobs, e);
                    traverse()
                }
            },
            None => traverse(),
        };

        let mut sets = Vec::with_capacity(results.len());
        for result in results {
            sets.push(result?);
        }

        let resolution = self.merge(sets);
        tracing::info!(
            "resolved {} extension modules, {} shared libraries",
            roots.len(),
            resolution.required_libraries().count()
        );
        Ok(resolution)
    }

    /// Merge per-root closures and collect the libraries none of them load.
    ///
    /// Two libraries sharing a file name only fail once the planner puts
    /// them in one directory. Elsewhere they still shadow each other in the
    /// loader's by-name cache, so they are reported here.
    fn merge(&self, sets: Vec<ResolvedSet>) -> Resolution {
        let in_closure: HashSet<&ArtifactId> =
            sets.iter().flat_map(|s| s.libraries.iter()).collect();
        let candidates = sets
            .iter()
            .flat_map(|s| s.libraries.iter())
            .chain(self.graph.shared_libraries().map(|a| a.id()));

        let mut seen: HashSet<&ArtifactId> = HashSet::new();
        let mut file_names: HashMap<&str, &Artifact> = HashMap::new();
        let mut unused = Vec::new();

        for id in candidates {
            if !seen.insert(id) {
                continue;
            }
            let Some(library) = self.graph.get(id) else {
                continue;
            };
            if let Some(existing) = file_names.insert(library.file_name(), library) {
                tracing::warn!(
                    "shared libraries `{}` ({}) and `{}` ({}) are both named `{}`",
                    existing.id(),
                    existing.origin(),
                    library.id(),
                    library.origin(),
                    library.file_name()
                );
            }
            if !in_closure.contains(id) {
                tracing::warn!("shared library `{}` is not loaded by any extension module", id);
                unused.push(id.clone());
            }
        }

        Resolution::new(sets, unused)
    }
}

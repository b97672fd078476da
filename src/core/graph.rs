//! BuildGraph - the immutable graph of build outputs.
//!
//! Artifacts live in an arena keyed by identity; dependency edges live in a
//! separate directed graph. Cyclic library dependencies are legal, so no
//! artifact holds a reference to another.

use std::collections::{BTreeMap, HashMap};

use petgraph::algo::tarjan_scc;
use petgraph::graph::{DiGraph, NodeIndex};

use crate::compat::{Classifier, CompatibilityMode};
use crate::core::artifact::{Artifact, ArtifactId, ArtifactRecord};
use crate::errors::LayoutError;

/// The validated build graph.
#[derive(Debug, Clone)]
pub struct BuildGraph {
    /// Dependency edges; `a -> b` means `a` loads `b`
    graph: DiGraph<ArtifactId, ()>,

    /// Map from identity to node index
    nodes: HashMap<ArtifactId, NodeIndex>,

    /// Artifact arena, ordered for deterministic iteration
    artifacts: BTreeMap<ArtifactId, Artifact>,
}

impl BuildGraph {
    /// Build and validate a graph from the build engine's records.
    ///
    /// Rejects malformed records, dependencies that no record provides,
    /// dependencies on extension modules, and two records claiming one
    /// identity from different origins.
    pub fn from_records(
        records: &[ArtifactRecord],
        classifier: &Classifier,
    ) -> Result<Self, LayoutError> {
        let mut graph = BuildGraph {
            graph: DiGraph::new(),
            nodes: HashMap::new(),
            artifacts: BTreeMap::new(),
        };

        for record in records {
            let artifact = Artifact::from_record(record, classifier)?;
            graph.add_artifact(artifact)?;
        }

        let edges: Vec<(ArtifactId, ArtifactId)> = graph
            .artifacts
            .values()
            .flat_map(|a| a.dependencies().iter().map(move |d| (a.id().clone(), d.clone())))
            .collect();

        for (from, to) in edges {
            let dep = graph
                .artifacts
                .get(&to)
                .ok_or_else(|| LayoutError::DanglingDependency {
                    identity: from.to_string(),
                    dependency: to.to_string(),
                })?;
            if dep.is_extension() {
                return Err(LayoutError::MalformedArtifact {
                    identity: from.to_string(),
                    reason: format!(
                        "depends on extension module `{}`; only shared libraries can be linked",
                        to
                    ),
                });
            }
            graph.graph.add_edge(graph.nodes[&from], graph.nodes[&to], ());
        }

        tracing::debug!(
            "build graph: {} artifacts, {} edges",
            graph.artifacts.len(),
            graph.graph.edge_count()
        );

        Ok(graph)
    }

    fn add_artifact(&mut self, artifact: Artifact) -> Result<(), LayoutError> {
        if let Some(existing) = self.artifacts.get(artifact.id()) {
            if existing == &artifact {
                // The same logical artifact reported twice.
                return Ok(());
            }
            if existing.origin() != artifact.origin() {
                return Err(LayoutError::NameCollision {
                    name: artifact.id().to_string(),
                    first: existing.id().to_string(),
                    first_origin: existing.origin().to_string(),
                    second: artifact.id().to_string(),
                    second_origin: artifact.origin().to_string(),
                });
            }
            return Err(LayoutError::MalformedArtifact {
                identity: artifact.id().to_string(),
                reason: format!("reported twice by {} with different details", artifact.origin()),
            });
        }

        let node = self.graph.add_node(artifact.id().clone());
        self.nodes.insert(artifact.id().clone(), node);
        self.artifacts.insert(artifact.id().clone(), artifact);
        Ok(())
    }

    /// Get an artifact by identity.
    pub fn get(&self, id: &ArtifactId) -> Option<&Artifact> {
        self.artifacts.get(id)
    }

    /// Iterate over all artifacts in identity order.
    pub fn artifacts(&self) -> impl Iterator<Item = &Artifact> {
        self.artifacts.values()
    }

    /// Extension modules in identity order.
    pub fn extensions(&self) -> impl Iterator<Item = &Artifact> {
        self.artifacts.values().filter(|a| a.is_extension())
    }

    /// Shared libraries in identity order.
    pub fn shared_libraries(&self) -> impl Iterator<Item = &Artifact> {
        self.artifacts.values().filter(|a| !a.is_extension())
    }

    /// Compatibility modes of every extension module.
    pub fn modes(&self) -> Vec<(ArtifactId, CompatibilityMode)> {
        self.extensions()
            .filter_map(|a| a.mode().map(|m| (a.id().clone(), *m)))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.artifacts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.artifacts.is_empty()
    }

    /// Direct dependencies in declared order.
    pub fn deps(&self, id: &ArtifactId) -> &[ArtifactId] {
        self.artifacts
            .get(id)
            .map(|a| a.dependencies())
            .unwrap_or(&[])
    }

    /// Artifacts that load the given one.
    pub fn dependents(&self, id: &ArtifactId) -> Vec<ArtifactId> {
        let Some(&node) = self.nodes.get(id) else {
            return Vec::new();
        };
        let mut dependents: Vec<ArtifactId> = self
            .graph
            .neighbors_directed(node, petgraph::Direction::Incoming)
            .map(|n| self.graph[n].clone())
            .collect();
        dependents.sort();
        dependents
    }

    /// Groups of mutually dependent shared libraries.
    ///
    /// Each group is a strongly connected component with more than one
    /// member, sorted by identity. Groups are sorted by their first member.
    pub fn cycles(&self) -> Vec<Vec<ArtifactId>> {
        let mut cycles: Vec<Vec<ArtifactId>> = tarjan_scc(&self.graph)
            .into_iter()
            .filter(|component| component.len() > 1)
            .map(|component| {
                let mut members: Vec<ArtifactId> =
                    component.into_iter().map(|n| self.graph[n].clone()).collect();
                members.sort();
                members
            })
            .collect();
        cycles.sort();
        cycles
    }
}

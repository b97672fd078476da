//! Distribution planning operation.
//!
//! Runs the whole pipeline over one build: validate the build graph,
//! resolve library closures, plan the install layout and aggregate the
//! distribution tag.

use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::compat::{aggregate, DistributionTag};
use crate::core::{ArtifactRecord, BuildGraph, PackageTree};
use crate::errors::LayoutError;
use crate::layout::{LayoutPlan, LayoutPlanner};
use crate::resolver::Resolver;
use crate::util::Config;

/// Inputs of one planning pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanInput {
    /// Records emitted by the build engine
    pub records: Vec<ArtifactRecord>,

    /// Declared dotted package names
    pub packages: Vec<String>,
}

/// Package list as written by the metadata collaborator: either a bare
/// array or an object with a `packages` key.
#[derive(Deserialize)]
#[serde(untagged)]
enum PackagesFile {
    List(Vec<String>),
    Table { packages: Vec<String> },
}

impl PlanInput {
    pub fn new(records: Vec<ArtifactRecord>, packages: Vec<String>) -> Self {
        PlanInput { records, packages }
    }

    /// Read the build graph records and, if given, the package list.
    pub fn load(graph_path: &Path, packages_path: Option<&Path>) -> Result<Self> {
        let contents = std::fs::read_to_string(graph_path)
            .with_context(|| format!("failed to read build graph: {}", graph_path.display()))?;
        let records: Vec<ArtifactRecord> = serde_json::from_str(&contents)
            .with_context(|| format!("failed to parse build graph: {}", graph_path.display()))?;

        let packages = match packages_path {
            Some(path) => {
                let contents = std::fs::read_to_string(path)
                    .with_context(|| format!("failed to read package list: {}", path.display()))?;
                let file: PackagesFile = serde_json::from_str(&contents).with_context(|| {
                    format!("failed to parse package list: {}", path.display())
                })?;
                match file {
                    PackagesFile::List(packages) | PackagesFile::Table { packages } => packages,
                }
            }
            None => Vec::new(),
        };

        tracing::debug!(
            "loaded {} records and {} packages",
            records.len(),
            packages.len()
        );

        Ok(PlanInput { records, packages })
    }
}

/// The result handed to the installer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlanOutput {
    pub tag: DistributionTag,
    pub plan: LayoutPlan,
}

/// Plan a distribution.
///
/// Fails on the first fatal error; a partial plan is never returned.
pub fn plan_distribution(input: &PlanInput, config: &Config) -> Result<PlanOutput, LayoutError> {
    let platform = config.platform();

    let graph = BuildGraph::from_records(&input.records, &config.classifier())?;
    let tree = PackageTree::from_names(&input.packages)?;

    let resolution = Resolver::new(&graph).with_jobs(config.jobs()).resolve_all()?;

    let planner = LayoutPlanner::new(platform, config.libs_dir());
    let plan = planner.plan(&graph, &resolution, &tree)?;

    let modes = graph.modes();
    let tag = if modes.is_empty() {
        let platform_tag = plan
            .ships_libraries()
            .then_some(planner.platform().platform_tag.as_str());
        DistributionTag::pure(platform_tag)
    } else {
        aggregate(&modes, &planner.platform().platform_tag)?
    };

    Ok(PlanOutput { tag, plan })
}

//! LayoutPlan - where every artifact goes in the install tree.

use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::core::{ArtifactId, ArtifactKind};
use crate::layout::loader::LoaderConvention;

/// One artifact of the plan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlanEntry {
    pub identity: ArtifactId,

    pub kind: ArtifactKind,

    /// Build output to copy
    pub source_path: PathBuf,

    /// Destination relative to the install root
    pub destination_path: PathBuf,

    /// Directories the loader must search, relative to the artifact
    pub runtime_search_directives: Vec<String>,
}

impl PlanEntry {
    /// Directory the artifact is installed into.
    pub fn destination_dir(&self) -> &Path {
        self.destination_path.parent().unwrap_or(Path::new(""))
    }
}

/// The planned install layout, ordered by destination path.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct LayoutPlan {
    entries: Vec<PlanEntry>,

    /// Shared location for libraries used by several packages, if any
    /// library was placed there
    #[serde(skip_serializing_if = "Option::is_none")]
    libs_dir: Option<PathBuf>,
}

impl LayoutPlan {
    pub(crate) fn new(mut entries: Vec<PlanEntry>, libs_dir: Option<PathBuf>) -> Self {
        entries.sort_by(|a, b| a.destination_path.cmp(&b.destination_path));
        LayoutPlan { entries, libs_dir }
    }

    pub fn entries(&self) -> &[PlanEntry] {
        &self.entries
    }

    pub fn get(&self, identity: &ArtifactId) -> Option<&PlanEntry> {
        self.entries.iter().find(|e| &e.identity == identity)
    }

    pub fn libs_dir(&self) -> Option<&Path> {
        self.libs_dir.as_deref()
    }

    /// Whether the plan ships any shared library.
    pub fn ships_libraries(&self) -> bool {
        self.entries.iter().any(|e| e.kind == ArtifactKind::SharedLibrary)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Directories an artifact's loader will search, reconstructed from its
    /// directives. Directives that do not follow `convention` are skipped.
    pub fn search_dirs(
        &self,
        identity: &ArtifactId,
        convention: &dyn LoaderConvention,
    ) -> Vec<PathBuf> {
        let Some(entry) = self.get(identity) else {
            return Vec::new();
        };
        entry
            .runtime_search_directives
            .iter()
            .filter_map(|d| convention.resolve(d, entry.destination_dir()))
            .collect()
    }
}

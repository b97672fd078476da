//! Resolve - the immutable result of dependency resolution.
//!
//! A `ResolvedSet` is the closure of one root artifact. A `Resolution` is
//! the merge of every root's closure for one pass over the build graph.

use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;

use crate::core::ArtifactId;

/// Transitive shared-library closure of one artifact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedSet {
    /// The artifact the traversal started from
    pub root: ArtifactId,

    /// Libraries required at load time, in breadth-first discovery order
    pub libraries: Vec<ArtifactId>,

    /// Dependency cycles the closure touches, each sorted by identity
    pub cycles: Vec<Vec<ArtifactId>>,
}

impl ResolvedSet {
    pub fn contains(&self, id: &ArtifactId) -> bool {
        self.libraries.contains(id)
    }

    pub fn len(&self) -> usize {
        self.libraries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.libraries.is_empty()
    }
}

/// The merged closures of every extension module in a build graph.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Resolution {
    /// Closure per extension module
    sets: BTreeMap<ArtifactId, ResolvedSet>,

    /// Extension modules that load each library, directly or not
    users: BTreeMap<ArtifactId, BTreeSet<ArtifactId>>,

    /// Libraries no extension module loads
    unused: Vec<ArtifactId>,
}

impl Resolution {
    pub(crate) fn new(sets: Vec<ResolvedSet>, unused: Vec<ArtifactId>) -> Self {
        let mut users: BTreeMap<ArtifactId, BTreeSet<ArtifactId>> = BTreeMap::new();
        for set in &sets {
            for lib in &set.libraries {
                users.entry(lib.clone()).or_default().insert(set.root.clone());
            }
        }

        Resolution {
            sets: sets.into_iter().map(|s| (s.root.clone(), s)).collect(),
            users,
            unused,
        }
    }

    /// Closure of an extension module.
    pub fn get(&self, root: &ArtifactId) -> Option<&ResolvedSet> {
        self.sets.get(root)
    }

    /// Every closure, ordered by root identity.
    pub fn sets(&self) -> impl Iterator<Item = &ResolvedSet> {
        self.sets.values()
    }

    /// Extension modules that load `library`.
    pub fn users_of(&self, library: &ArtifactId) -> impl Iterator<Item = &ArtifactId> {
        self.users.get(library).into_iter().flatten()
    }

    /// Libraries in at least one closure, ordered by identity.
    pub fn required_libraries(&self) -> impl Iterator<Item = &ArtifactId> {
        self.users.keys()
    }

    pub fn unused_libraries(&self) -> &[ArtifactId] {
        &self.unused
    }
}

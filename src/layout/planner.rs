//! Layout planning.
//!
//! Maps resolved artifacts to destinations in the install tree and
//! computes the runtime search directives that let every binary find the
//! libraries it loads. Planning is a pure function of its inputs.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::path::{Path, PathBuf};

use crate::core::{Artifact, ArtifactId, BuildGraph, NodeId, PackageTree, Platform};
use crate::errors::LayoutError;
use crate::layout::loader::{convention_for, LoaderConvention};
use crate::layout::plan::{LayoutPlan, PlanEntry};
use crate::resolver::Resolution;

/// Plans the install layout for one target platform.
pub struct LayoutPlanner {
    platform: Platform,

    /// Shared location for libraries used by several packages
    libs_dir: PathBuf,

    convention: Box<dyn LoaderConvention>,
}

impl LayoutPlanner {
    pub fn new(platform: Platform, libs_dir: impl Into<PathBuf>) -> Self {
        let convention = convention_for(platform.family);
        LayoutPlanner {
            platform,
            libs_dir: libs_dir.into(),
            convention,
        }
    }

    pub fn platform(&self) -> &Platform {
        &self.platform
    }

    pub fn convention(&self) -> &dyn LoaderConvention {
        self.convention.as_ref()
    }

    /// Plan the layout of every artifact in the graph.
    ///
    /// Extension modules go into the package their dotted parent names.
    /// Shared libraries go where the build installs them, else alongside
    /// the one package that loads them, else into the shared location.
    /// Members of a dependency cycle are always placed together.
    pub fn plan(
        &self,
        graph: &BuildGraph,
        resolution: &Resolution,
        tree: &PackageTree,
    ) -> Result<LayoutPlan, LayoutError> {
        let owners = self.extension_owners(graph, tree)?;
        let library_dirs = self.place_libraries(graph, resolution, tree, &owners)?;

        let mut entries = Vec::with_capacity(graph.len());

        for ext in graph.extensions() {
            let dir = tree.dir(owners[ext.id()]);
            let Some(mode) = ext.mode() else {
                return Err(LayoutError::MalformedArtifact {
                    identity: ext.id().to_string(),
                    reason: "extension module has no compatibility mode".to_string(),
                });
            };
            let destination = dir.join(self.platform.extension_filename(ext.id().name(), mode));

            let closure = resolution
                .get(ext.id())
                .map(|set| set.libraries.as_slice())
                .unwrap_or(&[]);
            let directives = self.directives(dir, closure, &library_dirs);

            tracing::debug!("placing `{}` at {}", ext.id(), destination.display());
            entries.push(entry(ext, destination, directives));
        }

        for lib in graph.shared_libraries() {
            let dir = library_dirs[lib.id()].as_path();
            let destination = dir.join(lib.file_name());
            let directives = self.directives(dir, lib.dependencies(), &library_dirs);

            tracing::debug!("placing `{}` at {}", lib.id(), destination.display());
            entries.push(entry(lib, destination, directives));
        }

        check_destinations(graph, &entries)?;

        let uses_libs_dir = library_dirs.values().any(|d| *d == self.libs_dir);
        let plan = LayoutPlan::new(entries, uses_libs_dir.then(|| self.libs_dir.clone()));

        tracing::info!(
            "planned {} artifacts ({} extension modules)",
            plan.len(),
            graph.extensions().count()
        );

        Ok(plan)
    }

    /// Package node of every extension module.
    fn extension_owners<'a>(
        &self,
        graph: &'a BuildGraph,
        tree: &PackageTree,
    ) -> Result<HashMap<&'a ArtifactId, NodeId>, LayoutError> {
        let mut owners = HashMap::new();
        for ext in graph.extensions() {
            // A module named like a package would shadow it on import.
            if tree.contains(ext.id().as_str()) {
                return Err(LayoutError::NameCollision {
                    name: ext.id().to_string(),
                    first: ext.id().to_string(),
                    first_origin: ext.origin().to_string(),
                    second: ext.id().to_string(),
                    second_origin: "the package tree".to_string(),
                });
            }

            let owner = tree
                .owner_of(ext.id())
                .ok_or_else(|| LayoutError::MalformedArtifact {
                    identity: ext.id().to_string(),
                    reason: format!(
                        "package `{}` is not declared",
                        ext.id().parent().unwrap_or_default()
                    ),
                })?;
            owners.insert(ext.id(), owner);
        }
        Ok(owners)
    }

    /// Directory of every shared library.
    ///
    /// Libraries are placed per dependency cycle so a cycle never spans two
    /// directories. Acyclic libraries form groups of one.
    fn place_libraries<'a>(
        &self,
        graph: &'a BuildGraph,
        resolution: &Resolution,
        tree: &PackageTree,
        owners: &HashMap<&ArtifactId, NodeId>,
    ) -> Result<BTreeMap<&'a ArtifactId, PathBuf>, LayoutError> {
        let cycles = graph.cycles();
        let mut dirs: BTreeMap<&'a ArtifactId, PathBuf> = BTreeMap::new();

        for lib in graph.shared_libraries() {
            if dirs.contains_key(lib.id()) {
                continue;
            }

            let group: Vec<&'a Artifact> = match cycles.iter().find(|c| c.contains(lib.id())) {
                Some(cycle) => cycle.iter().filter_map(|m| graph.get(m)).collect(),
                None => vec![lib],
            };

            let dir = self.group_dir(&group, resolution, tree, owners)?;
            for member in group {
                dirs.insert(member.id(), dir.clone());
            }
        }

        Ok(dirs)
    }

    fn group_dir(
        &self,
        group: &[&Artifact],
        resolution: &Resolution,
        tree: &PackageTree,
        owners: &HashMap<&ArtifactId, NodeId>,
    ) -> Result<PathBuf, LayoutError> {
        let mut pinned: BTreeSet<NodeId> = BTreeSet::new();
        for member in group {
            if let Some(package) = member.install_package() {
                let node = tree
                    .find(package.as_str())
                    .ok_or_else(|| LayoutError::MalformedArtifact {
                        identity: member.id().to_string(),
                        reason: format!("install package `{}` is not declared", package),
                    })?;
                pinned.insert(node);
            }
        }

        if pinned.len() > 1 {
            let mut packages: Vec<String> = pinned
                .iter()
                .map(|&n| tree.display_name(n).to_string())
                .collect();
            packages.sort();
            return Err(LayoutError::UnplannableCycle {
                members: group.iter().map(|m| m.id().to_string()).collect(),
                packages,
            });
        }

        if let Some(&node) = pinned.first() {
            return Ok(tree.dir(node).to_path_buf());
        }

        let users: BTreeSet<NodeId> = group
            .iter()
            .flat_map(|m| resolution.users_of(m.id()))
            .filter_map(|ext| owners.get(ext).copied())
            .collect();

        match users.first() {
            Some(&node) if users.len() == 1 => Ok(tree.dir(node).to_path_buf()),
            _ => Ok(self.libs_dir.clone()),
        }
    }

    /// Directives for a binary in `from_dir` loading `libraries`, in order
    /// of first use, without duplicates.
    fn directives(
        &self,
        from_dir: &Path,
        libraries: &[ArtifactId],
        library_dirs: &BTreeMap<&ArtifactId, PathBuf>,
    ) -> Vec<String> {
        let mut directives: Vec<String> = Vec::new();
        for lib in libraries {
            let Some(to_dir) = library_dirs.get(lib) else {
                continue;
            };
            if let Some(directive) = self.convention.directive(from_dir, to_dir) {
                if !directives.contains(&directive) {
                    directives.push(directive);
                }
            }
        }
        directives
    }
}

fn entry(artifact: &Artifact, destination: PathBuf, directives: Vec<String>) -> PlanEntry {
    PlanEntry {
        identity: artifact.id().clone(),
        kind: artifact.kind(),
        source_path: artifact.build_output().to_path_buf(),
        destination_path: destination,
        runtime_search_directives: directives,
    }
}

/// No two artifacts may be installed at the same path.
///
/// Artifacts of different origins landing on one file name in one directory
/// are a `NameCollision`; a clash within one origin is a `PathConflict`.
fn check_destinations(graph: &BuildGraph, entries: &[PlanEntry]) -> Result<(), LayoutError> {
    let mut seen: HashMap<&Path, &ArtifactId> = HashMap::new();
    for entry in entries {
        let Some(first) = seen.insert(&entry.destination_path, &entry.identity) else {
            continue;
        };

        if let (Some(a), Some(b)) = (graph.get(first), graph.get(&entry.identity)) {
            if a.origin() != b.origin() {
                return Err(LayoutError::NameCollision {
                    name: b.file_name().to_string(),
                    first: a.id().to_string(),
                    first_origin: a.origin().to_string(),
                    second: b.id().to_string(),
                    second_origin: b.origin().to_string(),
                });
            }
        }
        return Err(LayoutError::PathConflict {
            path: entry.destination_path.clone(),
            first: first.to_string(),
            second: entry.identity.to_string(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compat::Classifier;
    use crate::core::{ArtifactRecord, Origin, PlatformFamily};
    use crate::resolver::Resolver;
    use crate::test_support::{ext, id, lib, linux};

    fn plan(records: &[ArtifactRecord], packages: &[&str]) -> Result<LayoutPlan, LayoutError> {
        plan_for(linux(), records, packages)
    }

    fn plan_for(
        platform: Platform,
        records: &[ArtifactRecord],
        packages: &[&str],
    ) -> Result<LayoutPlan, LayoutError> {
        let graph = BuildGraph::from_records(records, &Classifier::new())?;
        let resolution = Resolver::new(&graph).resolve_all()?;
        let tree = PackageTree::from_names(packages)?;
        LayoutPlanner::new(platform, ".dist.libs").plan(&graph, &resolution, &tree)
    }

    fn dest(plan: &LayoutPlan, identity: &str) -> PathBuf {
        plan.get(&id(identity)).unwrap().destination_path.clone()
    }

    #[test]
    fn test_nested_extension_destinations() {
        let plan = plan(
            &[ext("plat"), ext("mypkg.extension"), ext("mypkg.sub._examplemod")],
            &["mypkg.sub"],
        )
        .unwrap();

        assert_eq!(dest(&plan, "plat"), PathBuf::from("plat.cpython-311-x86_64-linux-gnu.so"));
        assert_eq!(
            dest(&plan, "mypkg.extension"),
            PathBuf::from("mypkg/extension.cpython-311-x86_64-linux-gnu.so")
        );
        assert_eq!(
            dest(&plan, "mypkg.sub._examplemod"),
            PathBuf::from("mypkg/sub/_examplemod.cpython-311-x86_64-linux-gnu.so")
        );
        assert_eq!(plan.libs_dir(), None);
    }

    #[test]
    fn test_private_library_placed_alongside() {
        let plan = plan(
            &[ext("mypkg._examplemod").with_dependency("examplelib"), lib("examplelib")],
            &["mypkg"],
        )
        .unwrap();

        assert_eq!(dest(&plan, "examplelib"), PathBuf::from("mypkg/libexamplelib.so"));
        let module = plan.get(&id("mypkg._examplemod")).unwrap();
        assert_eq!(module.runtime_search_directives, vec!["$ORIGIN".to_string()]);
    }

    #[test]
    fn test_pinned_library_stays_in_its_package() {
        let plan = plan(
            &[
                ext("_examplemod").with_dependency("examplelib"),
                lib("examplelib").with_install_package("mypkg"),
            ],
            &["mypkg"],
        )
        .unwrap();

        assert_eq!(dest(&plan, "examplelib"), PathBuf::from("mypkg/libexamplelib.so"));
        let module = plan.get(&id("_examplemod")).unwrap();
        assert_eq!(module.runtime_search_directives, vec!["$ORIGIN/mypkg".to_string()]);
    }

    #[test]
    fn test_library_shared_by_siblings_is_placed_once() {
        let plan = plan(
            &[
                ext("pkg_a.mod").with_dependency("bar"),
                ext("pkg_b.inner.mod").with_dependency("bar"),
                lib("bar"),
            ],
            &["pkg_a", "pkg_b.inner"],
        )
        .unwrap();

        let shared = PathBuf::from(".dist.libs");
        assert_eq!(dest(&plan, "bar"), shared.join("libbar.so"));
        assert_eq!(plan.libs_dir(), Some(shared.as_path()));

        let convention = convention_for(PlatformFamily::Elf);
        for dependent in ["pkg_a.mod", "pkg_b.inner.mod"] {
            let dirs = plan.search_dirs(&id(dependent), convention.as_ref());
            assert_eq!(dirs, vec![shared.clone()], "{dependent}");
        }
        assert_eq!(
            plan.get(&id("pkg_b.inner.mod")).unwrap().runtime_search_directives,
            vec!["$ORIGIN/../../.dist.libs".to_string()]
        );
    }

    #[test]
    fn test_shared_library_directives_on_every_platform() {
        let records = [
            ext("pkg_a.mod").with_dependency("bar"),
            ext("pkg_b.mod").with_dependency("bar"),
            lib("bar"),
        ];

        for family in [PlatformFamily::Elf, PlatformFamily::MachO, PlatformFamily::Windows] {
            let plan = plan_for(Platform::new(family), &records, &["pkg_a", "pkg_b"]).unwrap();
            let convention = convention_for(family);
            for dependent in ["pkg_a.mod", "pkg_b.mod"] {
                let entry = plan.get(&id(dependent)).unwrap();
                let lib_dir = plan.get(&id("bar")).unwrap().destination_dir().to_path_buf();
                assert_eq!(
                    plan.search_dirs(&id(dependent), convention.as_ref()),
                    vec![lib_dir],
                    "{family}: {:?}",
                    entry.runtime_search_directives
                );
            }
        }
    }

    #[test]
    fn test_cycle_in_one_package_is_colocated() {
        let plan = plan(
            &[
                ext("mypkg.mod").with_dependency("liba"),
                lib("liba").with_dependency("libb"),
                lib("libb").with_dependency("liba"),
            ],
            &["mypkg"],
        )
        .unwrap();

        assert_eq!(dest(&plan, "liba"), PathBuf::from("mypkg/libliba.so"));
        assert_eq!(dest(&plan, "libb"), PathBuf::from("mypkg/liblibb.so"));
        let liba = plan.get(&id("liba")).unwrap();
        assert_eq!(liba.runtime_search_directives, vec!["$ORIGIN".to_string()]);
    }

    #[test]
    fn test_cycle_with_one_pinned_member_follows_it() {
        let plan = plan(
            &[
                ext("pkg_a.mod").with_dependency("liba"),
                lib("liba").with_dependency("libb"),
                lib("libb").with_dependency("liba").with_install_package("pkg_b"),
            ],
            &["pkg_a", "pkg_b"],
        )
        .unwrap();

        assert_eq!(dest(&plan, "liba"), PathBuf::from("pkg_b/libliba.so"));
        assert_eq!(dest(&plan, "libb"), PathBuf::from("pkg_b/liblibb.so"));
    }

    #[test]
    fn test_cycle_split_across_packages_is_unplannable() {
        let err = plan(
            &[
                ext("pkg_a.mod").with_dependency("liba"),
                ext("pkg_b.mod").with_dependency("libb"),
                lib("liba").with_dependency("libb").with_install_package("pkg_a"),
                lib("libb").with_dependency("liba").with_install_package("pkg_b"),
            ],
            &["pkg_a", "pkg_b"],
        )
        .unwrap_err();

        assert_eq!(
            err,
            LayoutError::UnplannableCycle {
                members: vec!["liba".to_string(), "libb".to_string()],
                packages: vec!["pkg_a".to_string(), "pkg_b".to_string()],
            }
        );
    }

    #[test]
    fn test_unused_library_ships_in_shared_location() {
        let plan = plan(&[ext("plat"), lib("orphan")], &[]).unwrap();
        assert_eq!(dest(&plan, "orphan"), PathBuf::from(".dist.libs/liborphan.so"));
        assert!(plan.ships_libraries());
    }

    #[test]
    fn test_module_named_like_package_collides() {
        let err = plan(&[ext("mypkg")], &["mypkg"]).unwrap_err();
        assert!(matches!(err, LayoutError::NameCollision { ref name, .. } if name == "mypkg"));
    }

    #[test]
    fn test_undeclared_package_is_malformed() {
        let err = plan(&[ext("other.mod")], &["mypkg"]).unwrap_err();
        assert!(matches!(err, LayoutError::MalformedArtifact { .. }));
    }

    #[test]
    fn test_path_conflict() {
        // The pinned library lands on the module's own file name.
        let records = [
            ext("mypkg.mod"),
            ArtifactRecord::shared_library(
                "clash",
                "build/mod.cpython-311-x86_64-linux-gnu.so",
            )
            .with_install_package("mypkg"),
        ];
        let err = plan(&records, &["mypkg"]).unwrap_err();
        match err {
            LayoutError::PathConflict { path, first, second } => {
                assert_eq!(path, PathBuf::from("mypkg/mod.cpython-311-x86_64-linux-gnu.so"));
                assert_eq!(first, "mypkg.mod");
                assert_eq!(second, "clash");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_same_file_name_from_two_origins_in_one_dir_collides() {
        let records = [
            ext("mypkg.mod").with_dependency("bar").with_dependency("vendored_bar"),
            lib("bar").with_origin(Origin::Subproject("bar".to_string())),
            ArtifactRecord::shared_library("vendored_bar", "build/vendor/libbar.so"),
        ];
        let err = plan(&records, &["mypkg"]).unwrap_err();
        match err {
            LayoutError::NameCollision {
                name,
                first_origin,
                second_origin,
                ..
            } => {
                assert_eq!(name, "libbar.so");
                assert_eq!(first_origin, "subproject `bar`");
                assert_eq!(second_origin, "main project");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_same_file_name_in_separate_packages() {
        let plan = plan(
            &[
                ext("pkg_a.mod").with_dependency("pkg_a.helper"),
                ext("pkg_b.mod").with_dependency("pkg_b.helper"),
                ArtifactRecord::shared_library("pkg_a.helper", "build/a/libhelper.so"),
                ArtifactRecord::shared_library("pkg_b.helper", "build/b/libhelper.so"),
            ],
            &["pkg_a", "pkg_b"],
        )
        .unwrap();

        assert_eq!(dest(&plan, "pkg_a.helper"), PathBuf::from("pkg_a/libhelper.so"));
        assert_eq!(dest(&plan, "pkg_b.helper"), PathBuf::from("pkg_b/libhelper.so"));
    }

    #[test]
    fn test_unpinned_cycle_used_by_two_packages_goes_to_shared_location() {
        let plan = plan(
            &[
                ext("pkg_a.mod").with_dependency("liba"),
                ext("pkg_b.mod").with_dependency("libb"),
                lib("liba").with_dependency("libb"),
                lib("libb").with_dependency("liba"),
            ],
            &["pkg_a", "pkg_b"],
        )
        .unwrap();

        assert_eq!(dest(&plan, "liba"), PathBuf::from(".dist.libs/libliba.so"));
        assert_eq!(dest(&plan, "libb"), PathBuf::from(".dist.libs/liblibb.so"));
        for module in ["pkg_a.mod", "pkg_b.mod"] {
            assert_eq!(
                plan.get(&id(module)).unwrap().runtime_search_directives,
                vec!["$ORIGIN/../.dist.libs".to_string()]
            );
        }
    }

    #[test]
    fn test_destinations_are_unique() {
        let plan = plan(
            &[
                ext("plat"),
                ext("mypkg.plat").with_dependency("bar"),
                ext("mypkg.sub.plat").with_dependency("bar"),
                lib("bar").with_dependency("baz"),
                lib("baz"),
            ],
            &["mypkg.sub"],
        )
        .unwrap();

        let mut destinations: Vec<_> = plan.entries().iter().map(|e| &e.destination_path).collect();
        let total = destinations.len();
        destinations.dedup();
        assert_eq!(destinations.len(), total);
        assert_eq!(total, 5);
    }
}

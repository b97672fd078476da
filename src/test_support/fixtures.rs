//! Build graph fixtures for common packaging scenarios.
//!
//! Each fixture returns the records a build would emit together with the
//! declared package names.

use crate::compat::CompatibilityFlags;
use crate::core::{ArtifactRecord, Origin, PythonVersion};

use super::{ext, lib};

/// A build graph fixture.
#[derive(Debug, Clone)]
pub struct GraphFixture {
    pub records: Vec<ArtifactRecord>,
    pub packages: Vec<&'static str>,
}

/// A library the build installs inside the package that uses it.
pub fn sharedlib_in_package() -> GraphFixture {
    GraphFixture {
        records: vec![
            ext("mypkg._example").with_dependency("examplelib"),
            lib("examplelib").with_install_package("mypkg"),
        ],
        packages: vec!["mypkg"],
    }
}

/// A top-level module linking a library built by the main project.
pub fn link_against_local_lib() -> GraphFixture {
    GraphFixture {
        records: vec![ext("example").with_dependency("examplelib"), lib("examplelib")],
        packages: vec![],
    }
}

/// Modules in two packages loading a library built by subproject `bar`.
pub fn subproject_shared() -> GraphFixture {
    let bar = Origin::Subproject("bar".to_string());
    GraphFixture {
        records: vec![
            ext("foo.foo").with_dependency("bar"),
            ext("baz.baz").with_dependency("bar"),
            lib("bar").with_origin(bar),
        ],
        packages: vec!["foo", "baz"],
    }
}

/// `plat` built once by the main project and again by a subproject.
pub fn plat_rebuilt() -> GraphFixture {
    GraphFixture {
        records: vec![
            ext("plat"),
            ext("plat").with_origin(Origin::Subproject("rebuild".to_string())),
        ],
        packages: vec![],
    }
}

/// Modules for the limited API from Python 3.8 and 3.8 again.
pub fn limited_api() -> GraphFixture {
    let stable = |identity: &str, output: &str| {
        ArtifactRecord::extension(identity, output).with_flags(CompatibilityFlags {
            python: Some(PythonVersion::new(3, 12)),
            limited_api: Some(PythonVersion::new(3, 8)),
            ..Default::default()
        })
    };
    GraphFixture {
        records: vec![
            stable("limited.module", "build/module.abi3.so"),
            stable("limited.other", "build/other.abi3.so"),
        ],
        packages: vec!["limited"],
    }
}

//! Test utilities for berth unit tests.
//!
//! Builders for artifact records and the build graphs the planner is
//! exercised against.
//!
//! # Example
//!
//! ```rust,ignore
//! use crate::test_support::{ext, lib};
//!
//! let records = [ext("mypkg._examplemod").with_dependency("examplelib"), lib("examplelib")];
//! ```

pub mod fixtures;

use crate::compat::CompatibilityFlags;
use crate::core::{ArtifactId, ArtifactRecord, Platform, PlatformFamily, PythonVersion};

pub use fixtures::*;

/// Extension module built for CPython 3.11 with no ABI suffix in its
/// build output name.
pub fn ext(identity: &str) -> ArtifactRecord {
    let name = identity.rsplit('.').next().unwrap_or(identity);
    ArtifactRecord::extension(identity, format!("build/{}.so", name)).with_flags(CompatibilityFlags {
        python: Some(PythonVersion::new(3, 11)),
        ..Default::default()
    })
}

/// Shared library built as `build/lib<name>.so`.
pub fn lib(identity: &str) -> ArtifactRecord {
    let name = identity.rsplit('.').next().unwrap_or(identity);
    ArtifactRecord::shared_library(identity, format!("build/lib{}.so", name))
}

pub fn id(s: &str) -> ArtifactId {
    ArtifactId::parse(s).unwrap()
}

/// x86_64 Linux with fixed suffix and tag, independent of the host.
pub fn linux() -> Platform {
    Platform::new(PlatformFamily::Elf)
        .with_multiarch("x86_64-linux-gnu")
        .with_platform_tag("linux_x86_64")
}

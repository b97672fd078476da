//! Core data structures for berth.
//!
//! This module contains the foundational types the planner works on:
//! - Artifacts and their identities
//! - The build graph of artifacts and dependency edges
//! - The declared package tree
//! - Target platform and interpreter versions

pub mod artifact;
pub mod graph;
pub mod package;
pub mod platform;
pub mod python;

pub use artifact::{Artifact, ArtifactId, ArtifactKind, ArtifactRecord, Origin};
pub use graph::BuildGraph;
pub use package::{NodeId, PackageNode, PackageTree};
pub use platform::{Platform, PlatformFamily};
pub use python::PythonVersion;

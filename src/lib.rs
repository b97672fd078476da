//! berth - install layout planning for Python native extensions
//!
//! This crate takes the artifacts a build produced (extension modules and
//! the shared libraries they load) and decides where each one goes in the
//! installed distribution, how each finds its libraries at runtime, and
//! which compatibility tag the distribution advertises.

pub mod compat;
pub mod core;
pub mod errors;
pub mod layout;
pub mod ops;
pub mod resolver;
pub mod util;

/// Test utilities for berth unit tests.
///
/// This module is only available when compiling with `--cfg test`. It
/// provides artifact record builders and build graph fixtures.
#[cfg(test)]
pub mod test_support;

pub use compat::{CompatibilityMode, DistributionTag};
pub use crate::core::{ArtifactId, ArtifactRecord, BuildGraph, PackageTree, Platform};
pub use errors::LayoutError;
pub use layout::{LayoutPlan, LayoutPlanner};
pub use ops::{plan_distribution, PlanInput, PlanOutput};
pub use resolver::{Resolution, ResolvedSet, Resolver};

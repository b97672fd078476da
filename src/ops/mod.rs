//! High-level operations.
//!
//! This module contains the implementation of berth commands.

pub mod plan_distribution;

pub use plan_distribution::{plan_distribution, PlanInput, PlanOutput};

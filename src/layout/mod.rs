//! Install layout planning.
//!
//! Turns a resolved build graph into a `LayoutPlan`: a destination for every
//! artifact plus the runtime search directives its loader needs.

pub mod loader;
pub mod plan;
pub mod planner;

pub use loader::{convention_for, ElfRunPath, LoaderConvention, MachOLoaderPath, WindowsDllDirectory};
pub use plan::{LayoutPlan, PlanEntry};
pub use planner::LayoutPlanner;

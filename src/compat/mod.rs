//! Binary compatibility of extension modules.

pub mod classify;
pub mod mode;
pub mod suffix;
pub mod tag;

pub use classify::{Classifier, CompatibilityFlags};
pub use mode::CompatibilityMode;
pub use suffix::{ExtensionSuffix, SuffixAbi};
pub use tag::{aggregate, CompatibilityClass, DistributionTag};

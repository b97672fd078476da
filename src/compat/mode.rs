//! Binary compatibility modes of extension modules.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::core::PythonVersion;

/// The binary compatibility an extension module was built for.
///
/// Fixed at build time. Resolution never changes it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "kebab-case")]
pub enum CompatibilityMode {
    /// Tied to exactly one interpreter minor version. `free_threading` is
    /// set when the build was made with free-threading support.
    PerVersionAbi {
        python: PythonVersion,
        #[serde(default, skip_serializing_if = "std::ops::Not::not")]
        free_threading: bool,
    },

    /// Limited API; loads on `min` and every later minor version.
    StableAbi { min: PythonVersion },

    /// Built for `python`, declares itself safe without the GIL, so it loads
    /// under both the standard and the free-threaded interpreter.
    FreeThreadedOptional { python: PythonVersion },

    /// Built against the free-threaded ABI; loads only there.
    FreeThreadedRequired { python: PythonVersion },
}

impl CompatibilityMode {
    /// Per-version mode of a build without free-threading support.
    pub fn per_version(python: PythonVersion) -> Self {
        CompatibilityMode::PerVersionAbi {
            python,
            free_threading: false,
        }
    }

    /// Interpreter version the module is pinned to, if any.
    pub fn pinned_version(&self) -> Option<PythonVersion> {
        match self {
            CompatibilityMode::StableAbi { .. } => None,
            CompatibilityMode::PerVersionAbi { python, .. }
            | CompatibilityMode::FreeThreadedOptional { python }
            | CompatibilityMode::FreeThreadedRequired { python } => Some(*python),
        }
    }

    pub fn is_stable_abi(&self) -> bool {
        matches!(self, CompatibilityMode::StableAbi { .. })
    }

    /// Whether the module can be loaded by a free-threaded interpreter.
    pub fn supports_free_threading(&self) -> bool {
        matches!(
            self,
            CompatibilityMode::PerVersionAbi {
                free_threading: true,
                ..
            } | CompatibilityMode::FreeThreadedOptional { .. }
                | CompatibilityMode::FreeThreadedRequired { .. }
        )
    }
}

impl fmt::Display for CompatibilityMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CompatibilityMode::PerVersionAbi {
                python,
                free_threading: true,
            } => write!(f, "per-version-abi({}, free-threading)", python),
            CompatibilityMode::PerVersionAbi { python, .. } => {
                write!(f, "per-version-abi({})", python)
            }
            CompatibilityMode::StableAbi { min } => write!(f, "stable-abi({})", min),
            CompatibilityMode::FreeThreadedOptional { python } => {
                write!(f, "free-threaded-optional({})", python)
            }
            CompatibilityMode::FreeThreadedRequired { python } => {
                write!(f, "free-threaded-required({})", python)
            }
        }
    }
}

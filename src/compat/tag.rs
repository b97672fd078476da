//! Distribution tag aggregation.
//!
//! Merges per-module compatibility modes into the single tag advertised by
//! the distribution. The tag is the narrowest guarantee every module meets.

use std::fmt;

use serde::Serialize;

use crate::compat::mode::CompatibilityMode;
use crate::core::{ArtifactId, PythonVersion};
use crate::errors::LayoutError;

/// Compatibility class of a whole distribution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "class", rename_all = "kebab-case")]
pub enum CompatibilityClass {
    /// No extension modules
    Pure,
    /// Every module uses the stable ABI; loads on `baseline` and later.
    StableAbi { baseline: PythonVersion },
    /// Pinned to one interpreter version.
    PerVersion { python: PythonVersion },
    /// Pinned to one free-threaded interpreter version.
    FreeThreaded { python: PythonVersion },
}

/// The aggregate compatibility descriptor of a distribution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DistributionTag {
    pub python_tag: String,
    pub abi_tag: String,
    pub platform_tag: String,
    pub class: CompatibilityClass,
    /// Every module also supports the free-threaded interpreter.
    pub free_threading_optional: bool,
}

impl DistributionTag {
    fn new(class: CompatibilityClass, platform_tag: &str, free_threading_optional: bool) -> Self {
        let (python_tag, abi_tag) = match class {
            CompatibilityClass::Pure => ("py3".to_string(), "none".to_string()),
            CompatibilityClass::StableAbi { baseline } => {
                (format!("cp{}", baseline.nodot()), "abi3".to_string())
            }
            CompatibilityClass::PerVersion { python } => {
                (format!("cp{}", python.nodot()), format!("cp{}", python.nodot()))
            }
            CompatibilityClass::FreeThreaded { python } => {
                (format!("cp{}", python.nodot()), format!("cp{}t", python.nodot()))
            }
        };

        DistributionTag {
            python_tag,
            abi_tag,
            platform_tag: platform_tag.to_string(),
            class,
            free_threading_optional,
        }
    }

    /// Tag of a distribution without extension modules. Shipping native
    /// libraries still makes it platform specific.
    pub fn pure(platform_tag: Option<&str>) -> Self {
        Self::new(CompatibilityClass::Pure, platform_tag.unwrap_or("any"), false)
    }

    /// Every supported ABI tag, the primary one first.
    pub fn abi_tags(&self) -> Vec<String> {
        let mut tags = vec![self.abi_tag.clone()];
        if self.free_threading_optional {
            if let CompatibilityClass::PerVersion { python } = self.class {
                tags.push(format!("cp{}t", python.nodot()));
            }
        }
        tags
    }

    /// Every expanded `python-abi-platform` tag.
    pub fn tags(&self) -> Vec<String> {
        self.abi_tags()
            .into_iter()
            .map(|abi| format!("{}-{}-{}", self.python_tag, abi, self.platform_tag))
            .collect()
    }
}

impl fmt::Display for DistributionTag {
    /// Compressed tag set (`cp313-cp313.cp313t-linux_x86_64`).
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}-{}-{}",
            self.python_tag,
            self.abi_tags().join("."),
            self.platform_tag
        )
    }
}

/// Merge the modes of every extension module into one distribution tag.
///
/// Fails with `IncompatibleDistribution` when no tag describes all modules.
pub fn aggregate(
    modes: &[(ArtifactId, CompatibilityMode)],
    platform_tag: &str,
) -> Result<DistributionTag, LayoutError> {
    if modes.is_empty() {
        return Ok(DistributionTag::pure(Some(platform_tag)));
    }

    let conflict = |a: &(ArtifactId, CompatibilityMode), b: &(ArtifactId, CompatibilityMode)| {
        LayoutError::IncompatibleDistribution {
            first: a.0.to_string(),
            first_mode: a.1.to_string(),
            second: b.0.to_string(),
            second_mode: b.1.to_string(),
        }
    };

    // All version-pinned modules must agree on the interpreter.
    let mut pinned: Option<(&(ArtifactId, CompatibilityMode), PythonVersion)> = None;
    for entry in modes {
        if let Some(version) = entry.1.pinned_version() {
            match pinned {
                None => pinned = Some((entry, version)),
                Some((first, v)) if v != version => return Err(conflict(first, entry)),
                Some(_) => {}
            }
        }
    }

    // A module that needs the free-threaded interpreter cannot ship with one
    // built without free-threading support.
    if let Some(required) = modes
        .iter()
        .find(|(_, m)| matches!(m, CompatibilityMode::FreeThreadedRequired { .. }))
    {
        if let Some(lacking) = modes.iter().find(|(_, m)| !m.supports_free_threading()) {
            return Err(conflict(required, lacking));
        }
    }

    // The highest stable baseline wins; it must not exceed the pinned version.
    let mut baseline: Option<&(ArtifactId, CompatibilityMode)> = None;
    for entry in modes {
        if let CompatibilityMode::StableAbi { min } = entry.1 {
            let higher = match baseline {
                Some((_, CompatibilityMode::StableAbi { min: current })) => min > *current,
                _ => true,
            };
            if higher {
                baseline = Some(entry);
            }
        }
    }
    if let (Some(stable), Some((pinned_entry, version))) = (baseline, pinned) {
        if let CompatibilityMode::StableAbi { min } = stable.1 {
            if min > version {
                return Err(conflict(stable, pinned_entry));
            }
        }
    }

    let class = match pinned {
        Some((_, python)) => {
            if modes
                .iter()
                .any(|(_, m)| matches!(m, CompatibilityMode::FreeThreadedRequired { .. }))
            {
                CompatibilityClass::FreeThreaded { python }
            } else {
                CompatibilityClass::PerVersion { python }
            }
        }
        None => match baseline {
            Some((_, CompatibilityMode::StableAbi { min })) => {
                CompatibilityClass::StableAbi { baseline: *min }
            }
            _ => CompatibilityClass::Pure,
        },
    };

    let free_threading_optional = matches!(class, CompatibilityClass::PerVersion { .. })
        && modes
            .iter()
            .all(|(_, m)| matches!(m, CompatibilityMode::FreeThreadedOptional { .. }));

    let tag = DistributionTag::new(class, platform_tag, free_threading_optional);
    tracing::info!("distribution tag: {}", tag);
    Ok(tag)
}

//! Compatibility classification of extension modules.
//!
//! The mode comes from the build-time flags recorded alongside the module.
//! When a record has no flags, it is inferred from the filename suffix the
//! build produced. When it has both, they must agree.

use serde::{Deserialize, Serialize};

use crate::compat::mode::CompatibilityMode;
use crate::compat::suffix::{ExtensionSuffix, SuffixAbi};
use crate::core::PythonVersion;
use crate::errors::LayoutError;

/// Build-time flags recorded for an extension module.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct CompatibilityFlags {
    /// Interpreter the module was compiled against
    pub python: Option<PythonVersion>,

    /// Lowest version of the limited API the module targets
    pub limited_api: Option<PythonVersion>,

    /// Free-threading support was requested for the build
    pub free_threading: bool,

    /// The module registers itself as safe to run without the GIL
    pub gil_not_used: bool,

    /// The module only works under a free-threaded interpreter
    pub free_threading_required: bool,
}

/// Derives a `CompatibilityMode` for each extension module.
#[derive(Debug, Clone)]
pub struct Classifier {
    /// Interpreter assumed when a record does not name one
    default_python: Option<PythonVersion>,
    /// Baseline assumed for stable-ABI suffixes without an explicit flag
    default_limited_api: PythonVersion,
}

impl Default for Classifier {
    fn default() -> Self {
        Classifier {
            default_python: None,
            default_limited_api: PythonVersion::STABLE_ABI_FLOOR,
        }
    }
}

impl Classifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_default_python(mut self, python: PythonVersion) -> Self {
        self.default_python = Some(python);
        self
    }

    pub fn with_default_limited_api(mut self, baseline: PythonVersion) -> Self {
        self.default_limited_api = baseline;
        self
    }

    /// Classify an extension module.
    ///
    /// `filename` is the name of the build output, used to infer or check the
    /// mode against what the build actually produced.
    pub fn classify(
        &self,
        identity: &str,
        flags: Option<&CompatibilityFlags>,
        filename: Option<&str>,
    ) -> Result<CompatibilityMode, LayoutError> {
        let suffix = filename.and_then(ExtensionSuffix::parse);

        let mode = match flags {
            Some(flags) => self.mode_from_flags(identity, flags, suffix.as_ref())?,
            None => match &suffix {
                Some(suffix) => self.mode_from_suffix(suffix),
                None => {
                    return Err(LayoutError::MalformedArtifact {
                        identity: identity.to_string(),
                        reason: "extension module has no compatibility flags and its \
                                 filename carries no recognisable ABI suffix"
                            .to_string(),
                    })
                }
            },
        };

        if let Some(suffix) = &suffix {
            check_suffix(identity, &mode, suffix)?;
        }

        tracing::debug!("classified `{}` as {}", identity, mode);
        Ok(mode)
    }

    fn mode_from_flags(
        &self,
        identity: &str,
        flags: &CompatibilityFlags,
        suffix: Option<&ExtensionSuffix>,
    ) -> Result<CompatibilityMode, LayoutError> {
        if let Some(min) = flags.limited_api {
            if flags.free_threading_required {
                return Err(LayoutError::IncompatibleFlags {
                    identity: identity.to_string(),
                    reason: format!(
                        "built for the limited API ({}) and requires free-threading; \
                         the stable ABI does not guarantee free-threaded safety",
                        min
                    ),
                });
            }
            if min < PythonVersion::STABLE_ABI_FLOOR {
                return Err(LayoutError::IncompatibleFlags {
                    identity: identity.to_string(),
                    reason: format!(
                        "limited API {} predates the stable ABI ({})",
                        min,
                        PythonVersion::STABLE_ABI_FLOOR
                    ),
                });
            }
            return Ok(CompatibilityMode::StableAbi { min });
        }

        let python = flags
            .python
            .or_else(|| suffix.and_then(suffix_python))
            .or(self.default_python)
            .ok_or_else(|| LayoutError::MalformedArtifact {
                identity: identity.to_string(),
                reason: "no interpreter version recorded for the build".to_string(),
            })?;

        if flags.free_threading_required {
            Ok(CompatibilityMode::FreeThreadedRequired { python })
        } else if flags.free_threading && flags.gil_not_used {
            Ok(CompatibilityMode::FreeThreadedOptional { python })
        } else {
            Ok(CompatibilityMode::PerVersionAbi {
                python,
                free_threading: flags.free_threading,
            })
        }
    }

    fn mode_from_suffix(&self, suffix: &ExtensionSuffix) -> CompatibilityMode {
        match &suffix.abi {
            SuffixAbi::Stable => CompatibilityMode::StableAbi {
                min: self.default_limited_api,
            },
            SuffixAbi::Interpreter {
                python,
                free_threaded: true,
                ..
            } => CompatibilityMode::FreeThreadedRequired { python: *python },
            SuffixAbi::Interpreter { python, .. } => CompatibilityMode::per_version(*python),
        }
    }
}

fn suffix_python(suffix: &ExtensionSuffix) -> Option<PythonVersion> {
    match &suffix.abi {
        SuffixAbi::Interpreter { python, .. } => Some(*python),
        SuffixAbi::Stable => None,
    }
}

/// The suffix the build produced must match the declared mode.
fn check_suffix(
    identity: &str,
    mode: &CompatibilityMode,
    suffix: &ExtensionSuffix,
) -> Result<(), LayoutError> {
    let mismatch = |reason: String| -> Result<(), LayoutError> {
        Err(LayoutError::IncompatibleFlags {
            identity: identity.to_string(),
            reason,
        })
    };

    match (&suffix.abi, mode) {
        (SuffixAbi::Stable, CompatibilityMode::StableAbi { .. }) => Ok(()),
        (SuffixAbi::Stable, _) => mismatch(format!(
            "declared {} but the module is tagged for the stable ABI",
            mode
        )),
        (SuffixAbi::Interpreter { .. }, CompatibilityMode::StableAbi { .. }) => mismatch(
            "declares compatibility with the limited API but the module is not tagged for it"
                .to_string(),
        ),
        (
            SuffixAbi::Interpreter {
                python,
                free_threaded,
                ..
            },
            _,
        ) => {
            if Some(*python) != mode.pinned_version() {
                return mismatch(format!(
                    "declared {} but the module is tagged for Python {}",
                    mode, python
                ));
            }
            let wants_ft_abi = matches!(mode, CompatibilityMode::FreeThreadedRequired { .. });
            if *free_threaded != wants_ft_abi {
                return mismatch(format!(
                    "declared {} but the module suffix {} the free-threaded marker",
                    mode,
                    if *free_threaded { "carries" } else { "lacks" }
                ));
            }
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn py(minor: u8) -> PythonVersion {
        PythonVersion::new(3, minor)
    }

    fn flags() -> CompatibilityFlags {
        CompatibilityFlags {
            python: Some(py(12)),
            ..Default::default()
        }
    }

    #[test]
    fn test_no_flags_is_per_version() {
        let mode = Classifier::new().classify("plat", Some(&flags()), None).unwrap();
        assert_eq!(mode, CompatibilityMode::per_version(py(12)));
    }

    #[test]
    fn test_limited_api_is_stable() {
        let f = CompatibilityFlags {
            limited_api: Some(py(8)),
            ..flags()
        };
        let mode = Classifier::new()
            .classify("module", Some(&f), Some("module.abi3.so"))
            .unwrap();
        assert_eq!(mode, CompatibilityMode::StableAbi { min: py(8) });
    }

    #[test]
    fn test_free_threaded_optional() {
        let f = CompatibilityFlags {
            python: Some(py(13)),
            free_threading: true,
            gil_not_used: true,
            ..Default::default()
        };
        let mode = Classifier::new().classify("native", Some(&f), None).unwrap();
        assert_eq!(mode, CompatibilityMode::FreeThreadedOptional { python: py(13) });
    }

    #[test]
    fn test_free_threading_without_gil_slot_stays_per_version() {
        let f = CompatibilityFlags {
            python: Some(py(13)),
            free_threading: true,
            ..Default::default()
        };
        let mode = Classifier::new()
            .classify("native", Some(&f), Some("native.cpython-313-x86_64-linux-gnu.so"))
            .unwrap();
        assert_eq!(
            mode,
            CompatibilityMode::PerVersionAbi {
                python: py(13),
                free_threading: true,
            }
        );
        assert!(mode.supports_free_threading());
    }

    #[test]
    fn test_free_threaded_required() {
        let f = CompatibilityFlags {
            python: Some(py(13)),
            free_threading_required: true,
            ..Default::default()
        };
        let mode = Classifier::new()
            .classify("native", Some(&f), Some("native.cpython-313t-x86_64-linux-gnu.so"))
            .unwrap();
        assert_eq!(mode, CompatibilityMode::FreeThreadedRequired { python: py(13) });
    }

    #[test]
    fn test_stable_abi_and_required_free_threading_rejected() {
        let f = CompatibilityFlags {
            limited_api: Some(py(8)),
            free_threading_required: true,
            ..flags()
        };
        let err = Classifier::new().classify("plat", Some(&f), None).unwrap_err();
        assert!(matches!(err, LayoutError::IncompatibleFlags { ref identity, .. } if identity == "plat"));
    }

    #[test]
    fn test_limited_api_with_interpreter_suffix_rejected() {
        let f = CompatibilityFlags {
            limited_api: Some(py(8)),
            ..flags()
        };
        let err = Classifier::new()
            .classify("module", Some(&f), Some("module.cpython-312-x86_64-linux-gnu.so"))
            .unwrap_err();
        match err {
            LayoutError::IncompatibleFlags { reason, .. } => {
                assert!(reason.contains("limited API"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_version_mismatch_with_suffix_rejected() {
        let err = Classifier::new()
            .classify("plat", Some(&flags()), Some("plat.cpython-311-x86_64-linux-gnu.so"))
            .unwrap_err();
        assert!(matches!(err, LayoutError::IncompatibleFlags { .. }));
    }

    #[test]
    fn test_infer_from_suffix() {
        let classifier = Classifier::new().with_default_limited_api(py(7));

        assert_eq!(
            classifier.classify("m", None, Some("m.abi3.so")).unwrap(),
            CompatibilityMode::StableAbi { min: py(7) }
        );
        assert_eq!(
            classifier.classify("m", None, Some("m.cp311-win_amd64.pyd")).unwrap(),
            CompatibilityMode::per_version(py(11))
        );
        assert_eq!(
            classifier.classify("m", None, Some("m.cpython-313t-darwin.so")).unwrap(),
            CompatibilityMode::FreeThreadedRequired { python: py(13) }
        );
    }

    #[test]
    fn test_nothing_to_classify_from() {
        let err = Classifier::new().classify("m", None, Some("m.so")).unwrap_err();
        assert!(matches!(err, LayoutError::MalformedArtifact { .. }));
    }

    #[test]
    fn test_python_from_suffix_or_default() {
        let f = CompatibilityFlags::default();
        let mode = Classifier::new()
            .classify("m", Some(&f), Some("m.cpython-310-x86_64-linux-gnu.so"))
            .unwrap();
        assert_eq!(mode, CompatibilityMode::per_version(py(10)));

        let mode = Classifier::new()
            .with_default_python(py(9))
            .classify("m", Some(&f), None)
            .unwrap();
        assert_eq!(mode, CompatibilityMode::per_version(py(9)));

        let err = Classifier::new().classify("m", Some(&f), None).unwrap_err();
        assert!(matches!(err, LayoutError::MalformedArtifact { .. }));
    }
}

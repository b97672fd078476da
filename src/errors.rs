//! Layout error types and diagnostics.
//!
//! Every failure of a resolution pass is fatal. Errors carry the identities
//! of the artifacts involved so callers can say which origins collided.

use std::path::PathBuf;

use miette::Diagnostic as MietteDiagnostic;
use thiserror::Error;

use crate::util::diagnostic::Diagnostic;

/// Error raised while resolving or planning a distribution layout.
#[derive(Debug, Clone, PartialEq, Eq, Error, MietteDiagnostic)]
pub enum LayoutError {
    #[error("malformed artifact `{identity}`: {reason}")]
    #[diagnostic(code(berth::model::malformed_artifact))]
    MalformedArtifact { identity: String, reason: String },

    #[error("`{identity}` depends on `{dependency}`, which is not in the build graph")]
    #[diagnostic(
        code(berth::model::dangling_dependency),
        help("only libraries produced by the build graph can be bundled")
    )]
    DanglingDependency { identity: String, dependency: String },

    #[error("incompatible compatibility flags on `{identity}`: {reason}")]
    #[diagnostic(code(berth::compat::incompatible_flags))]
    IncompatibleFlags { identity: String, reason: String },

    #[error("`{first}` and `{second}` both claim `{name}`")]
    #[diagnostic(
        code(berth::resolve::name_collision),
        help("rename one of the artifacts or drop one of the conflicting builds")
    )]
    NameCollision {
        name: String,
        first: String,
        first_origin: String,
        second: String,
        second_origin: String,
    },

    #[error("`{first}` and `{second}` are both planned at `{}`", .path.display())]
    #[diagnostic(code(berth::layout::path_conflict))]
    PathConflict {
        path: PathBuf,
        first: String,
        second: String,
    },

    #[error("dependency cycle {} spans packages {}", .members.join(" <-> "), .packages.join(", "))]
    #[diagnostic(
        code(berth::layout::unplannable_cycle),
        help("install every library of the cycle into the same package")
    )]
    UnplannableCycle {
        members: Vec<String>,
        packages: Vec<String>,
    },

    #[error("`{first}` ({first_mode}) cannot ship alongside `{second}` ({second_mode})")]
    #[diagnostic(code(berth::tag::incompatible_distribution))]
    IncompatibleDistribution {
        first: String,
        first_mode: String,
        second: String,
        second_mode: String,
    },
}

impl LayoutError {
    /// Identities of every artifact implicated in this error.
    pub fn identities(&self) -> Vec<&str> {
        match self {
            LayoutError::MalformedArtifact { identity, .. }
            | LayoutError::IncompatibleFlags { identity, .. } => vec![identity.as_str()],
            LayoutError::DanglingDependency {
                identity,
                dependency,
            } => vec![identity.as_str(), dependency.as_str()],
            LayoutError::NameCollision { first, second, .. }
            | LayoutError::PathConflict { first, second, .. }
            | LayoutError::IncompatibleDistribution { first, second, .. } => {
                vec![first.as_str(), second.as_str()]
            }
            LayoutError::UnplannableCycle { members, .. } => {
                members.iter().map(String::as_str).collect()
            }
        }
    }

    /// Convert to a user-friendly diagnostic.
    pub fn to_diagnostic(&self) -> Diagnostic {
        match self {
            LayoutError::MalformedArtifact { identity, reason } => {
                Diagnostic::error(format!("malformed artifact `{}`", identity))
                    .with_context(reason.clone())
                    .with_suggestion("Check the record emitted by the build graph")
            }

            LayoutError::DanglingDependency {
                identity,
                dependency,
            } => Diagnostic::error(format!("dangling dependency in `{}`", identity))
                .with_context(format!("`{}` is not produced by this build", dependency))
                .with_suggestion(format!(
                    "Build `{}` as part of the project or a subproject",
                    dependency
                ))
                .with_suggestion("Drop the dependency if it is provided by the system"),

            LayoutError::IncompatibleFlags { identity, reason } => {
                Diagnostic::error(format!("incompatible flags on `{}`", identity))
                    .with_context(reason.clone())
                    .with_suggestion("Build the module either for the limited API or for free-threading")
            }

            LayoutError::NameCollision {
                name,
                first,
                first_origin,
                second,
                second_origin,
            } => Diagnostic::error(format!("name collision on `{}`", name))
                .with_context(format!("`{}` from {}", first, first_origin))
                .with_context(format!("`{}` from {}", second, second_origin))
                .with_suggestion("Rename one of the artifacts")
                .with_suggestion("Skip the conflicting subproject build"),

            LayoutError::PathConflict {
                path,
                first,
                second,
            } => Diagnostic::error(format!("path conflict at `{}`", path.display()))
                .with_location(path.clone())
                .with_context(format!("planned for `{}` and `{}`", first, second))
                .with_suggestion("Give the artifacts distinct file names"),

            LayoutError::UnplannableCycle { members, packages } => {
                Diagnostic::error("library cycle cannot be colocated")
                    .with_context(format!("cycle: {}", members.join(" <-> ")))
                    .with_context(format!("pinned to: {}", packages.join(", ")))
                    .with_suggestion("Install every library of the cycle into one package")
                    .with_suggestion("Break the cycle between the libraries")
            }

            LayoutError::IncompatibleDistribution {
                first,
                first_mode,
                second,
                second_mode,
            } => Diagnostic::error("no single distribution tag describes these modules")
                .with_context(format!("`{}` is {}", first, first_mode))
                .with_context(format!("`{}` is {}", second, second_mode))
                .with_suggestion("Build every module for the same interpreter configuration"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_name_collision_diagnostic() {
        let err = LayoutError::NameCollision {
            name: "plat".to_string(),
            first: "plat".to_string(),
            first_origin: "main project".to_string(),
            second: "plat".to_string(),
            second_origin: "subproject `rebuild`".to_string(),
        };

        let output = err.to_diagnostic().format(false);

        assert!(output.contains("name collision on `plat`"));
        assert!(output.contains("main project"));
        assert!(output.contains("subproject `rebuild`"));
        assert!(output.contains("help: consider:"));
    }

    #[test]
    fn test_identities() {
        let err = LayoutError::UnplannableCycle {
            members: vec!["liba".to_string(), "libb".to_string()],
            packages: vec!["pkg1".to_string(), "pkg2".to_string()],
        };
        assert_eq!(err.identities(), vec!["liba", "libb"]);

        let err = LayoutError::DanglingDependency {
            identity: "pkg.ext".to_string(),
            dependency: "ghost".to_string(),
        };
        assert_eq!(err.identities(), vec!["pkg.ext", "ghost"]);
    }
}

//! Build artifacts - what the build graph produced.
//!
//! An Artifact is either an importable extension module or a shared
//! library loaded by one. Artifacts are built from the records the build
//! engine emits and validated on construction.

use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::compat::{Classifier, CompatibilityFlags, CompatibilityMode};
use crate::errors::LayoutError;

/// A dotted module path such as `mypkg.sub._examplemod`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ArtifactId(String);

impl ArtifactId {
    /// Parse and validate a dotted path. Every segment must be a valid
    /// identifier.
    pub fn parse(s: &str) -> Result<Self, String> {
        if s.is_empty() {
            return Err("identity is empty".to_string());
        }
        for segment in s.split('.') {
            if !is_identifier(segment) {
                return Err(format!("`{}` is not a valid path segment", segment));
            }
        }
        Ok(ArtifactId(s.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Final segment (the local module or library name).
    pub fn name(&self) -> &str {
        self.0.rsplit('.').next().unwrap_or(&self.0)
    }

    /// Dotted path of the enclosing package, `None` for top-level names.
    pub fn parent(&self) -> Option<&str> {
        self.0.rsplit_once('.').map(|(parent, _)| parent)
    }
}

fn is_identifier(segment: &str) -> bool {
    let mut chars = segment.chars();
    match chars.next() {
        Some(c) if c.is_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_alphanumeric() || c == '_')
}

impl fmt::Display for ArtifactId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for ArtifactId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Serialize for ArtifactId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for ArtifactId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        ArtifactId::parse(&s).map_err(serde::de::Error::custom)
    }
}

/// The kind of build output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ArtifactKind {
    /// Compiled module importable by the interpreter
    #[serde(alias = "extension")]
    ExtensionModule,

    /// Shared/dynamic library (.so / .dylib / .dll) loaded by modules
    #[serde(alias = "shared", alias = "sharedlib")]
    SharedLibrary,
}

impl ArtifactKind {
    pub fn is_extension(&self) -> bool {
        matches!(self, ArtifactKind::ExtensionModule)
    }
}

/// Which buildable unit produced an artifact.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Origin {
    MainProject,
    Subproject(String),
}

impl Default for Origin {
    fn default() -> Self {
        Origin::MainProject
    }
}

impl fmt::Display for Origin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Origin::MainProject => write!(f, "main project"),
            Origin::Subproject(name) => write!(f, "subproject `{}`", name),
        }
    }
}

/// A serialized artifact record as emitted by the build engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct ArtifactRecord {
    /// Dotted path (unvalidated)
    pub identity: String,

    pub kind: ArtifactKind,

    #[serde(default)]
    pub origin: Origin,

    /// Build-time flags (extension modules only)
    #[serde(default)]
    pub compatibility_flags: Option<CompatibilityFlags>,

    /// Identities of shared libraries this artifact links against
    #[serde(default)]
    pub direct_dependencies: Vec<String>,

    /// Where the build engine wrote the output
    pub build_output_path: PathBuf,

    /// Package the build installs this shared library into, if any
    #[serde(default)]
    pub install_package: Option<String>,
}

impl ArtifactRecord {
    /// Create an extension module record.
    pub fn extension(identity: &str, output: impl Into<PathBuf>) -> Self {
        ArtifactRecord {
            identity: identity.to_string(),
            kind: ArtifactKind::ExtensionModule,
            origin: Origin::MainProject,
            compatibility_flags: None,
            direct_dependencies: Vec::new(),
            build_output_path: output.into(),
            install_package: None,
        }
    }

    /// Create a shared library record.
    pub fn shared_library(identity: &str, output: impl Into<PathBuf>) -> Self {
        ArtifactRecord {
            kind: ArtifactKind::SharedLibrary,
            ..Self::extension(identity, output)
        }
    }

    pub fn with_origin(mut self, origin: Origin) -> Self {
        self.origin = origin;
        self
    }

    pub fn with_flags(mut self, flags: CompatibilityFlags) -> Self {
        self.compatibility_flags = Some(flags);
        self
    }

    pub fn with_dependency(mut self, identity: &str) -> Self {
        self.direct_dependencies.push(identity.to_string());
        self
    }

    pub fn with_install_package(mut self, package: &str) -> Self {
        self.install_package = Some(package.to_string());
        self
    }
}

/// A validated build artifact.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifact {
    id: ArtifactId,
    kind: ArtifactKind,
    origin: Origin,
    /// Set for extension modules only
    mode: Option<CompatibilityMode>,
    /// Declared order is kept so traversals are deterministic.
    dependencies: Vec<ArtifactId>,
    build_output: PathBuf,
    install_package: Option<ArtifactId>,
}

impl Artifact {
    /// Validate a record and classify it.
    ///
    /// Dependencies are only checked for well-formedness here; whether they
    /// exist is checked by the graph.
    pub fn from_record(record: &ArtifactRecord, classifier: &Classifier) -> Result<Self, LayoutError> {
        let malformed = |reason: String| LayoutError::MalformedArtifact {
            identity: record.identity.clone(),
            reason,
        };

        let id = ArtifactId::parse(&record.identity).map_err(malformed)?;

        if let Origin::Subproject(name) = &record.origin {
            if name.trim().is_empty() {
                return Err(malformed("subproject origin does not name its subproject".to_string()));
            }
        }

        let file_name = record
            .build_output_path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| {
                malformed(format!(
                    "build output `{}` has no file name",
                    record.build_output_path.display()
                ))
            })?;

        let mut dependencies = Vec::with_capacity(record.direct_dependencies.len());
        for dep in &record.direct_dependencies {
            let dep_id = ArtifactId::parse(dep)
                .map_err(|reason| malformed(format!("dependency `{}`: {}", dep, reason)))?;
            if dep_id == id {
                return Err(malformed("artifact depends on itself".to_string()));
            }
            if !dependencies.contains(&dep_id) {
                dependencies.push(dep_id);
            }
        }

        let (mode, install_package) = match record.kind {
            ArtifactKind::ExtensionModule => {
                if record.install_package.is_some() {
                    return Err(malformed(
                        "extension modules are placed by their dotted path, not `install_package`"
                            .to_string(),
                    ));
                }
                let mode = classifier.classify(
                    &record.identity,
                    record.compatibility_flags.as_ref(),
                    Some(file_name),
                )?;
                (Some(mode), None)
            }
            ArtifactKind::SharedLibrary => {
                if record.compatibility_flags.is_some() {
                    return Err(malformed(
                        "compatibility flags only apply to extension modules".to_string(),
                    ));
                }
                let package = record
                    .install_package
                    .as_deref()
                    .map(|p| {
                        ArtifactId::parse(p)
                            .map_err(|reason| malformed(format!("install package `{}`: {}", p, reason)))
                    })
                    .transpose()?;
                (None, package)
            }
        };

        Ok(Artifact {
            id,
            kind: record.kind,
            origin: record.origin.clone(),
            mode,
            dependencies,
            build_output: record.build_output_path.clone(),
            install_package,
        })
    }

    pub fn id(&self) -> &ArtifactId {
        &self.id
    }

    pub fn kind(&self) -> ArtifactKind {
        self.kind
    }

    pub fn origin(&self) -> &Origin {
        &self.origin
    }

    pub fn mode(&self) -> Option<&CompatibilityMode> {
        self.mode.as_ref()
    }

    pub fn dependencies(&self) -> &[ArtifactId] {
        &self.dependencies
    }

    pub fn build_output(&self) -> &Path {
        &self.build_output
    }

    pub fn install_package(&self) -> Option<&ArtifactId> {
        self.install_package.as_ref()
    }

    /// On-disk name of the build output.
    pub fn file_name(&self) -> &str {
        self.build_output
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or_else(|| self.id.name())
    }

    pub fn is_extension(&self) -> bool {
        self.kind.is_extension()
    }
}

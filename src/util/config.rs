//! Configuration file support for berth.
//!
//! Settings come from `berth.toml` next to the build graph, with command
//! line flags taking precedence:
//!
//! ```toml
//! [distribution]
//! name = "mypkg"
//!
//! [target]
//! family = "elf"
//! python = "3.12"
//!
//! [layout]
//! jobs = 4
//! ```

use std::path::{Component, Path, PathBuf};

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};

use crate::compat::Classifier;
use crate::core::{Platform, PlatformFamily, PythonVersion};

/// Default configuration file name.
pub const CONFIG_FILE_NAME: &str = "berth.toml";

/// Shared library directory used when neither it nor a distribution name
/// is configured.
pub const DEFAULT_LIBS_DIR: &str = ".berth.libs";

/// berth configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub distribution: DistributionConfig,

    /// Target platform and interpreter
    pub target: TargetConfig,

    /// Layout settings
    pub layout: LayoutConfig,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DistributionConfig {
    /// Distribution name, used to name the shared library directory
    pub name: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct TargetConfig {
    /// Platform family (default: host)
    pub family: Option<PlatformFamily>,

    /// Interpreter assumed for records that do not name one
    pub python: Option<PythonVersion>,

    /// Platform component of per-version module suffixes
    pub multiarch: Option<String>,

    /// Wheel platform tag
    pub platform_tag: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct LayoutConfig {
    /// Shared library directory, relative to the install root
    pub libs_dir: Option<PathBuf>,

    /// Limited API baseline assumed for `abi3` modules without flags
    pub default_limited_api: Option<PythonVersion>,

    /// Resolver worker threads (None = one per core)
    pub jobs: Option<usize>,
}

impl Config {
    /// Load configuration from a file.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config: {}", path.display()))?;

        let config: Config = toml::from_str(&contents)
            .with_context(|| format!("failed to parse config: {}", path.display()))?;

        config
            .validate()
            .with_context(|| format!("invalid config: {}", path.display()))?;

        Ok(config)
    }

    /// Load configuration with fallback to defaults if the file doesn't
    /// exist or cannot be loaded.
    pub fn load_or_default(path: &Path) -> Self {
        if path.exists() {
            Self::load(path).unwrap_or_else(|e| {
                tracing::warn!("Failed to load config from {}: {:#}", path.display(), e);
                Self::default()
            })
        } else {
            Self::default()
        }
    }

    /// Merge another config into this one (other takes precedence).
    pub fn merge(&mut self, other: Config) {
        if other.distribution.name.is_some() {
            self.distribution.name = other.distribution.name;
        }
        if other.target.family.is_some() {
            self.target.family = other.target.family;
        }
        if other.target.python.is_some() {
            self.target.python = other.target.python;
        }
        if other.target.multiarch.is_some() {
            self.target.multiarch = other.target.multiarch;
        }
        if other.target.platform_tag.is_some() {
            self.target.platform_tag = other.target.platform_tag;
        }
        if other.layout.libs_dir.is_some() {
            self.layout.libs_dir = other.layout.libs_dir;
        }
        if other.layout.default_limited_api.is_some() {
            self.layout.default_limited_api = other.layout.default_limited_api;
        }
        if other.layout.jobs.is_some() {
            self.layout.jobs = other.layout.jobs;
        }
    }

    /// Check settings that parse but cannot be planned with.
    pub fn validate(&self) -> Result<()> {
        if let Some(dir) = &self.layout.libs_dir {
            let escapes = dir
                .components()
                .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir));
            if escapes || dir.as_os_str().is_empty() {
                bail!(
                    "libs-dir `{}` must be a relative path inside the install tree",
                    dir.display()
                );
            }
        }
        if let Some(baseline) = self.layout.default_limited_api {
            if baseline < PythonVersion::STABLE_ABI_FLOOR {
                bail!(
                    "default-limited-api {} predates the stable ABI ({})",
                    baseline,
                    PythonVersion::STABLE_ABI_FLOOR
                );
            }
        }
        if self.layout.jobs == Some(0) {
            bail!("jobs must be at least 1");
        }
        Ok(())
    }

    /// Target platform, with per-family defaults for unset fields.
    pub fn platform(&self) -> Platform {
        let mut platform = Platform::new(self.target.family.unwrap_or_else(PlatformFamily::host));
        if let Some(multiarch) = &self.target.multiarch {
            platform = platform.with_multiarch(multiarch.clone());
        }
        if let Some(tag) = &self.target.platform_tag {
            platform = platform.with_platform_tag(tag.clone());
        }
        platform
    }

    pub fn classifier(&self) -> Classifier {
        let mut classifier = Classifier::new();
        if let Some(python) = self.target.python {
            classifier = classifier.with_default_python(python);
        }
        if let Some(baseline) = self.layout.default_limited_api {
            classifier = classifier.with_default_limited_api(baseline);
        }
        classifier
    }

    /// Shared library directory: configured, else `.<name>.libs`.
    pub fn libs_dir(&self) -> PathBuf {
        if let Some(dir) = &self.layout.libs_dir {
            return dir.clone();
        }
        match &self.distribution.name {
            Some(name) => PathBuf::from(format!(".{}.libs", name.replace('-', "_"))),
            None => PathBuf::from(DEFAULT_LIBS_DIR),
        }
    }

    pub fn jobs(&self) -> Option<usize> {
        self.layout.jobs
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_parse_config() {
        let config: Config = toml::from_str(
            r#"
[distribution]
name = "my-pkg"

[target]
family = "macos"
python = "3.12"
platform-tag = "macosx_14_0_arm64"

[layout]
default-limited-api = "3.8"
jobs = 2
"#,
        )
        .unwrap();

        assert_eq!(config.target.family, Some(PlatformFamily::MachO));
        assert_eq!(config.target.python, Some(PythonVersion::new(3, 12)));
        assert_eq!(config.platform().platform_tag, "macosx_14_0_arm64");
        assert_eq!(config.platform().multiarch, "darwin");
        assert_eq!(config.libs_dir(), PathBuf::from(".my_pkg.libs"));
        assert_eq!(config.jobs(), Some(2));
    }

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.libs_dir(), PathBuf::from(DEFAULT_LIBS_DIR));
        assert_eq!(config.platform().family, PlatformFamily::host());
        assert_eq!(config.jobs(), None);
    }

    #[test]
    fn test_merge_overrides() {
        let mut base: Config = toml::from_str("[target]\npython = \"3.11\"\n").unwrap();
        let cli = Config {
            target: TargetConfig {
                python: Some(PythonVersion::new(3, 13)),
                ..Default::default()
            },
            layout: LayoutConfig {
                libs_dir: Some(PathBuf::from("_libs")),
                ..Default::default()
            },
            ..Default::default()
        };
        base.merge(cli);

        assert_eq!(base.target.python, Some(PythonVersion::new(3, 13)));
        assert_eq!(base.libs_dir(), PathBuf::from("_libs"));
    }

    #[test]
    fn test_load_rejects_escaping_libs_dir() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join(CONFIG_FILE_NAME);
        std::fs::write(&path, "[layout]\nlibs-dir = \"../outside\"\n").unwrap();

        let err = Config::load(&path).unwrap_err();
        assert!(format!("{:#}", err).contains("relative path"));
        assert_eq!(Config::load_or_default(&path), Config::default());
    }

    #[test]
    fn test_load_or_default_missing() {
        let tmp = TempDir::new().unwrap();
        let config = Config::load_or_default(&tmp.path().join(CONFIG_FILE_NAME));
        assert_eq!(config, Config::default());
    }
}

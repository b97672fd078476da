//! Target platform families and their file naming conventions.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::compat::CompatibilityMode;

/// Binary format family of the target, which decides file naming and how
/// loaders find bundled libraries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlatformFamily {
    /// Linux, BSDs and other ELF targets
    #[serde(alias = "linux", alias = "posix")]
    Elf,
    /// Apple targets
    #[serde(alias = "macos", alias = "darwin")]
    MachO,
    /// Windows targets
    #[serde(alias = "win32")]
    Windows,
}

impl PlatformFamily {
    /// Detect the host family.
    pub fn host() -> Self {
        match std::env::consts::OS {
            "macos" | "ios" => PlatformFamily::MachO,
            "windows" => PlatformFamily::Windows,
            _ => PlatformFamily::Elf,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PlatformFamily::Elf => "elf",
            PlatformFamily::MachO => "macho",
            PlatformFamily::Windows => "windows",
        }
    }

    /// Default multiarch component of per-version extension suffixes.
    pub fn default_multiarch(&self) -> String {
        let arch = std::env::consts::ARCH;
        match self {
            PlatformFamily::Elf => format!("{}-linux-gnu", arch),
            PlatformFamily::MachO => "darwin".to_string(),
            PlatformFamily::Windows => windows_platform(arch).to_string(),
        }
    }

    /// Default wheel platform tag.
    pub fn default_platform_tag(&self) -> String {
        let arch = std::env::consts::ARCH;
        match self {
            PlatformFamily::Elf => format!("linux_{}", arch),
            PlatformFamily::MachO => format!("macosx_11_0_{}", arch),
            PlatformFamily::Windows => windows_platform(arch).to_string(),
        }
    }

    /// Extension of compiled extension modules.
    pub fn module_extension(&self) -> &'static str {
        match self {
            PlatformFamily::Windows => "pyd",
            PlatformFamily::Elf | PlatformFamily::MachO => "so",
        }
    }
}

fn windows_platform(arch: &str) -> &'static str {
    match arch {
        "x86" => "win32",
        "aarch64" => "win_arm64",
        _ => "win_amd64",
    }
}

impl fmt::Display for PlatformFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PlatformFamily {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "elf" | "linux" | "posix" => Ok(PlatformFamily::Elf),
            "macho" | "macos" | "darwin" => Ok(PlatformFamily::MachO),
            "windows" | "win32" => Ok(PlatformFamily::Windows),
            other => Err(format!(
                "unknown platform family `{}` (expected elf, macho or windows)",
                other
            )),
        }
    }
}

/// The platform a distribution is planned for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Platform {
    pub family: PlatformFamily,
    /// Platform component of per-version suffixes (`x86_64-linux-gnu`,
    /// `darwin`, `win_amd64`)
    pub multiarch: String,
    /// Wheel platform tag (`linux_x86_64`)
    pub platform_tag: String,
}

impl Platform {
    /// Create a platform with the family's defaults for the host architecture.
    pub fn new(family: PlatformFamily) -> Self {
        Platform {
            family,
            multiarch: family.default_multiarch(),
            platform_tag: family.default_platform_tag(),
        }
    }

    pub fn host() -> Self {
        Self::new(PlatformFamily::host())
    }

    pub fn with_multiarch(mut self, multiarch: impl Into<String>) -> Self {
        self.multiarch = multiarch.into();
        self
    }

    pub fn with_platform_tag(mut self, tag: impl Into<String>) -> Self {
        self.platform_tag = tag.into();
        self
    }

    /// Destination filename of an extension module, encoding its
    /// compatibility mode the way this platform's importer expects.
    pub fn extension_filename(&self, stem: &str, mode: &CompatibilityMode) -> String {
        let ext = self.family.module_extension();
        let abi = match mode {
            CompatibilityMode::StableAbi { .. } => {
                return match self.family {
                    PlatformFamily::Windows => format!("{}.{}", stem, ext),
                    PlatformFamily::Elf | PlatformFamily::MachO => {
                        format!("{}.abi3.{}", stem, ext)
                    }
                };
            }
            CompatibilityMode::PerVersionAbi { python, .. }
            | CompatibilityMode::FreeThreadedOptional { python } => python.nodot(),
            CompatibilityMode::FreeThreadedRequired { python } => format!("{}t", python.nodot()),
        };

        match self.family {
            PlatformFamily::Windows => format!("{}.cp{}-{}.{}", stem, abi, self.multiarch, ext),
            PlatformFamily::Elf | PlatformFamily::MachO => {
                format!("{}.cpython-{}-{}.{}", stem, abi, self.multiarch, ext)
            }
        }
    }
}

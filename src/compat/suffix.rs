//! Recognition of compiled extension module filename suffixes.
//!
//! Handles the forms importers look for:
//! - `name.abi3.so` (stable ABI, ELF and Mach-O)
//! - `name.cpython-311-x86_64-linux-gnu.so`, `name.cpython-313t-darwin.so`
//! - `name.cp311-win_amd64.pyd`, `name.cp313t-win_amd64.pyd`
//! - `name.pyd` (stable ABI on Windows)

use std::sync::LazyLock;

use regex::Regex;

use crate::core::PythonVersion;

static POSIX_MODULE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(?P<name>[^.]+)\.(?P<tag>.+)\.so$").unwrap());

static WINDOWS_MODULE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(?P<name>[^.]+)(\.(?P<tag>.+))?\.pyd$").unwrap());

static POSIX_INTERPRETER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^cpython-(?P<version>[0-9]+)(?P<ft>t)?(-(?P<platform>.+))?$").unwrap()
});

static WINDOWS_INTERPRETER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^cp(?P<version>[0-9]+)(?P<ft>t)?(-(?P<platform>.+))?$").unwrap());

/// ABI information carried by an extension module filename.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SuffixAbi {
    /// `abi3` or bare `.pyd`
    Stable,
    /// An interpreter-specific suffix.
    Interpreter {
        python: PythonVersion,
        free_threaded: bool,
        platform: Option<String>,
    },
}

/// A parsed extension module filename.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtensionSuffix {
    /// Importable module name (the part before the first dot)
    pub module: String,
    pub abi: SuffixAbi,
}

impl ExtensionSuffix {
    /// Parse a filename. Returns `None` if the name does not look like a
    /// compiled module or carries an unknown interpreter tag.
    pub fn parse(filename: &str) -> Option<Self> {
        if let Some(caps) = POSIX_MODULE.captures(filename) {
            let tag = caps.name("tag")?.as_str();
            let abi = if tag == "abi3" {
                SuffixAbi::Stable
            } else {
                interpreter_abi(&POSIX_INTERPRETER, tag)?
            };
            return Some(ExtensionSuffix {
                module: caps["name"].to_string(),
                abi,
            });
        }

        if let Some(caps) = WINDOWS_MODULE.captures(filename) {
            let abi = match caps.name("tag") {
                None => SuffixAbi::Stable,
                Some(tag) => interpreter_abi(&WINDOWS_INTERPRETER, tag.as_str())?,
            };
            return Some(ExtensionSuffix {
                module: caps["name"].to_string(),
                abi,
            });
        }

        None
    }

    pub fn is_stable(&self) -> bool {
        self.abi == SuffixAbi::Stable
    }
}

fn interpreter_abi(pattern: &Regex, tag: &str) -> Option<SuffixAbi> {
    let caps = pattern.captures(tag)?;
    Some(SuffixAbi::Interpreter {
        python: PythonVersion::from_nodot(&caps["version"])?,
        free_threaded: caps.name("ft").is_some(),
        platform: caps.name("platform").map(|m| m.as_str().to_string()),
    })
}

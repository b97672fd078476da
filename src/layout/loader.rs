//! Runtime library search conventions.
//!
//! Each platform family has its own way for a loaded binary to find the
//! shared libraries it links against:
//! - ELF: an `$ORIGIN`-relative entry in the binary's run path
//! - Mach-O: an `@loader_path`-relative entry in the binary's run path
//! - Windows: a directory registered with the DLL search path before import

use std::path::{Component, Path, PathBuf};

use crate::core::PlatformFamily;

/// How one platform family locates shared libraries at load time.
pub trait LoaderConvention: Send + Sync {
    fn family(&self) -> PlatformFamily;

    /// Directive that lets a binary installed in `from_dir` find libraries
    /// installed in `to_dir`. `None` if the loader needs no directive.
    ///
    /// Both directories are relative to the install root.
    fn directive(&self, from_dir: &Path, to_dir: &Path) -> Option<String>;

    /// Directory a directive points at when evaluated from `from_dir`.
    /// `None` if the directive does not follow this convention.
    fn resolve(&self, directive: &str, from_dir: &Path) -> Option<PathBuf>;
}

/// Select the convention for a platform family.
pub fn convention_for(family: PlatformFamily) -> Box<dyn LoaderConvention> {
    match family {
        PlatformFamily::Elf => Box::new(ElfRunPath),
        PlatformFamily::MachO => Box::new(MachOLoaderPath),
        PlatformFamily::Windows => Box::new(WindowsDllDirectory),
    }
}

/// `$ORIGIN`-relative run path entries.
#[derive(Debug, Clone, Copy, Default)]
pub struct ElfRunPath;

impl LoaderConvention for ElfRunPath {
    fn family(&self) -> PlatformFamily {
        PlatformFamily::Elf
    }

    fn directive(&self, from_dir: &Path, to_dir: &Path) -> Option<String> {
        Some(anchored("$ORIGIN", from_dir, to_dir))
    }

    fn resolve(&self, directive: &str, from_dir: &Path) -> Option<PathBuf> {
        resolve_anchored("$ORIGIN", directive, from_dir)
    }
}

/// `@loader_path`-relative run path entries.
#[derive(Debug, Clone, Copy, Default)]
pub struct MachOLoaderPath;

impl LoaderConvention for MachOLoaderPath {
    fn family(&self) -> PlatformFamily {
        PlatformFamily::MachO
    }

    fn directive(&self, from_dir: &Path, to_dir: &Path) -> Option<String> {
        Some(anchored("@loader_path", from_dir, to_dir))
    }

    fn resolve(&self, directive: &str, from_dir: &Path) -> Option<PathBuf> {
        resolve_anchored("@loader_path", directive, from_dir)
    }
}

/// Relative directories added to the DLL search path.
///
/// Windows already searches the directory of the loading module, so
/// adjacent libraries need no directive.
#[derive(Debug, Clone, Copy, Default)]
pub struct WindowsDllDirectory;

impl LoaderConvention for WindowsDllDirectory {
    fn family(&self) -> PlatformFamily {
        PlatformFamily::Windows
    }

    fn directive(&self, from_dir: &Path, to_dir: &Path) -> Option<String> {
        let rel = relative(from_dir, to_dir);
        if rel.is_empty() {
            None
        } else {
            Some(rel)
        }
    }

    fn resolve(&self, directive: &str, from_dir: &Path) -> Option<PathBuf> {
        if directive.is_empty() || Path::new(directive).is_absolute() {
            return None;
        }
        normalize(&from_dir.join(directive))
    }
}

/// Relative path from one install directory to another, `/`-separated.
/// Empty when both are the same directory.
fn relative(from_dir: &Path, to_dir: &Path) -> String {
    let rel = pathdiff::diff_paths(to_dir, from_dir).unwrap_or_else(|| to_dir.to_path_buf());
    rel.components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

fn anchored(anchor: &str, from_dir: &Path, to_dir: &Path) -> String {
    let rel = relative(from_dir, to_dir);
    if rel.is_empty() {
        anchor.to_string()
    } else {
        format!("{}/{}", anchor, rel)
    }
}

fn resolve_anchored(anchor: &str, directive: &str, from_dir: &Path) -> Option<PathBuf> {
    let rest = directive.strip_prefix(anchor)?;
    if rest.is_empty() {
        return normalize(from_dir);
    }
    let rest = rest.strip_prefix('/')?;
    normalize(&from_dir.join(rest))
}

/// Lexically normalize a path relative to the install root. Returns `None`
/// if it escapes the root.
pub fn normalize(path: &Path) -> Option<PathBuf> {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !out.pop() {
                    return None;
                }
            }
            Component::Normal(part) => out.push(part),
            Component::RootDir | Component::Prefix(_) => return None,
        }
    }
    Some(out)
}

//! Interpreter versions.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// A `major.minor` interpreter version.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PythonVersion {
    pub major: u8,
    pub minor: u8,
}

impl PythonVersion {
    /// First version with a stable ABI.
    pub const STABLE_ABI_FLOOR: PythonVersion = PythonVersion::new(3, 2);

    pub const fn new(major: u8, minor: u8) -> Self {
        PythonVersion { major, minor }
    }

    /// The compact form used in tags and suffixes (`311` for 3.11).
    pub fn nodot(&self) -> String {
        format!("{}{}", self.major, self.minor)
    }

    /// Parse the compact form (`311`). The major version is one digit.
    pub fn from_nodot(s: &str) -> Option<Self> {
        if s.len() < 2 || !s.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        let (major, minor) = s.split_at(1);
        Some(PythonVersion::new(major.parse().ok()?, minor.parse().ok()?))
    }
}

impl fmt::Display for PythonVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)
    }
}

impl FromStr for PythonVersion {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (major, minor) = s
            .trim()
            .split_once('.')
            .ok_or_else(|| format!("expected `major.minor`, got `{}`", s))?;
        let major = major
            .parse()
            .map_err(|_| format!("invalid major version in `{}`", s))?;
        let minor = minor
            .parse()
            .map_err(|_| format!("invalid minor version in `{}`", s))?;
        Ok(PythonVersion::new(major, minor))
    }
}

impl Serialize for PythonVersion {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for PythonVersion {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_and_display() {
        let v: PythonVersion = "3.11".parse().unwrap();
        assert_eq!(v, PythonVersion::new(3, 11));
        assert_eq!(v.to_string(), "3.11");
        assert_eq!(v.nodot(), "311");
    }

    #[test]
    fn test_from_nodot() {
        assert_eq!(PythonVersion::from_nodot("38"), Some(PythonVersion::new(3, 8)));
        assert_eq!(PythonVersion::from_nodot("313"), Some(PythonVersion::new(3, 13)));
        assert_eq!(PythonVersion::from_nodot("3"), None);
        assert_eq!(PythonVersion::from_nodot("31x"), None);
    }

    #[test]
    fn test_ordering() {
        assert!(PythonVersion::new(3, 8) < PythonVersion::new(3, 11));
        assert!(PythonVersion::new(3, 12) > PythonVersion::new(3, 9));
    }

    #[test]
    fn test_invalid() {
        assert!("311".parse::<PythonVersion>().is_err());
        assert!("3.x".parse::<PythonVersion>().is_err());
    }
}

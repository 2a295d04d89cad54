//! Pact specification versions.

use pact_common::PactError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Version of the pact specification a pact is written against.
///
/// The version decides which interaction kinds and matching rule layouts a
/// pact file can carry.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
pub enum PactSpecification {
    /// Not yet determined (files without metadata)
    Unknown,
    /// Version 1.0
    V1,
    /// Version 1.1
    V1_1,
    /// Version 2.0
    V2,
    /// Version 3.0
    V3,
    /// Version 4.0
    #[default]
    V4,
}

impl PactSpecification {
    /// Version string written to `metadata.pactSpecification.version`.
    #[must_use]
    pub const fn version_str(&self) -> &'static str {
        match self {
            Self::Unknown => "unknown",
            Self::V1 => "1.0.0",
            Self::V1_1 => "1.1.0",
            Self::V2 => "2.0.0",
            Self::V3 => "3.0.0",
            Self::V4 => "4.0",
        }
    }

    /// Whether matching rules can be written at this version.
    #[must_use]
    pub const fn supports_matching_rules(&self) -> bool {
        matches!(self, Self::V2 | Self::V3 | Self::V4 | Self::Unknown)
    }

    /// Whether message interactions can be written at this version.
    #[must_use]
    pub const fn supports_messages(&self) -> bool {
        matches!(self, Self::V3 | Self::V4 | Self::Unknown)
    }

    /// Version used when writing: pacts of unknown version are written in
    /// the V3 layout.
    #[must_use]
    pub const fn writable(self) -> Self {
        match self {
            Self::Unknown => Self::V3,
            other => other,
        }
    }

    /// Parse a version string.
    ///
    /// Parsing is case-insensitive, accepts an optional `v` prefix, and
    /// treats `.` and `_` as the same separator, so `"v3"`, `"3.0.0"`,
    /// `"V1_1"` and `"1.1"` are all accepted.
    ///
    /// # Errors
    ///
    /// Returns `PactError::UnsupportedSpecification` for anything else.
    pub fn parse(version: &str) -> Result<Self, PactError> {
        let normalised = version.trim().to_ascii_uppercase().replace('.', "_");
        let digits = normalised.strip_prefix('V').unwrap_or(&normalised);
        let mut parts = digits.split('_');
        let major = parts.next().unwrap_or_default();
        let minor = parts.next().unwrap_or("0");
        if parts.any(|p| p.chars().any(|c| !c.is_ascii_digit())) {
            return Err(PactError::UnsupportedSpecification(version.to_string()));
        }

        match (major, minor) {
            ("1", "0") => Ok(Self::V1),
            ("1", "1") => Ok(Self::V1_1),
            ("2", "0") => Ok(Self::V2),
            ("3", "0") => Ok(Self::V3),
            ("4", "0") => Ok(Self::V4),
            _ => Err(PactError::UnsupportedSpecification(version.to_string())),
        }
    }
}

impl FromStr for PactSpecification {
    type Err = PactError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for PactSpecification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unknown => write!(f, "unknown"),
            Self::V1 => write!(f, "V1"),
            Self::V1_1 => write!(f, "V1.1"),
            Self::V2 => write!(f, "V2"),
            Self::V3 => write!(f, "V3"),
            Self::V4 => write!(f, "V4"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_accepts_documented_spellings() {
        assert_eq!(PactSpecification::parse("v3").unwrap(), PactSpecification::V3);
        assert_eq!(PactSpecification::parse("V4").unwrap(), PactSpecification::V4);
        assert_eq!(PactSpecification::parse("3.0.0").unwrap(), PactSpecification::V3);
        assert_eq!(PactSpecification::parse("1.1").unwrap(), PactSpecification::V1_1);
        assert_eq!(PactSpecification::parse("V1_1").unwrap(), PactSpecification::V1_1);
        assert_eq!(PactSpecification::parse("2").unwrap(), PactSpecification::V2);
        assert_eq!(PactSpecification::parse(" 4.0 ").unwrap(), PactSpecification::V4);
    }

    #[test]
    fn test_parse_rejects_unknown() {
        assert!(PactSpecification::parse("5").is_err());
        assert!(PactSpecification::parse("").is_err());
        assert!(PactSpecification::parse("v1_2").is_err());
        assert!(PactSpecification::parse("latest").is_err());
    }

    #[test]
    fn test_version_strings() {
        assert_eq!(PactSpecification::V3.version_str(), "3.0.0");
        assert_eq!(PactSpecification::V4.version_str(), "4.0");
        assert_eq!(PactSpecification::default(), PactSpecification::V4);
        assert_eq!(PactSpecification::Unknown.writable(), PactSpecification::V3);
        assert_eq!(PactSpecification::V2.writable(), PactSpecification::V2);
    }

    #[test]
    fn test_ordering_follows_versions() {
        assert!(PactSpecification::V1 < PactSpecification::V1_1);
        assert!(PactSpecification::V2 < PactSpecification::V3);
        assert!(PactSpecification::V3 < PactSpecification::V4);
    }
}

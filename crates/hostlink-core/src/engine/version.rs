//! Engine version parsing and version-dependent capabilities.

use std::cmp::Ordering;
use std::fmt;

use tracing::warn;

use crate::config::EngineConfig;
use crate::error::{HostError, Result};

/// Dotted engine version, compared numerically component by component.
///
/// Each component is read from its leading digits, so `"2022.3.7f1"` parses
/// as `[2022, 3, 7]`. A version that is a strict prefix of another orders
/// before it (`"1.2" < "1.2.0"`).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EngineVersion {
    components: Vec<u64>,
}

impl EngineVersion {
    /// Parse a dotted version string such as `"5.3.6"` or `"2022.3.7f1"`.
    pub fn parse(version: &str) -> Result<Self> {
        let trimmed = version.trim();
        if trimmed.is_empty() {
            return Err(HostError::invalid("engine_version", "version string is empty"));
        }

        let components = trimmed
            .split('.')
            .filter(|part| !part.is_empty())
            .map(|part| {
                let digits: String = part.chars().take_while(|c| c.is_ascii_digit()).collect();
                digits.parse::<u64>().unwrap_or(0)
            })
            .collect::<Vec<_>>();

        if components.is_empty() {
            return Err(HostError::invalid(
                "engine_version",
                format!("no version components in {trimmed:?}"),
            ));
        }

        Ok(Self { components })
    }

    /// Numeric components, most significant first.
    pub fn components(&self) -> &[u64] {
        &self.components
    }
}

impl Ord for EngineVersion {
    fn cmp(&self, other: &Self) -> Ordering {
        self.components.cmp(&other.components)
    }
}

impl PartialOrd for EngineVersion {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for EngineVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self.components.iter().map(u64::to_string).collect();
        write!(f, "{}", parts.join("."))
    }
}

/// What the embedded engine can do, derived from its version.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineCapabilities {
    pub version: EngineVersion,
    /// Whether the engine can be constructed from a background context.
    pub background_construction: bool,
}

impl EngineCapabilities {
    /// Capabilities for `version`, assuming the oldest supported engine when
    /// the version is unknown or unparsable.
    pub fn for_version(version: Option<&str>) -> Self {
        let parsed = match version.map(EngineVersion::parse) {
            Some(Ok(parsed)) => parsed,
            Some(Err(e)) => {
                warn!(
                    "Unparsable engine version ({}), assuming {}",
                    e,
                    EngineConfig::FALLBACK_VERSION
                );
                Self::fallback_version()
            }
            None => Self::fallback_version(),
        };

        let background_construction = EngineVersion::parse(
            EngineConfig::BACKGROUND_CONSTRUCTION_MIN_VERSION,
        )
        .map(|min| parsed >= min)
        .unwrap_or(false);

        Self {
            version: parsed,
            background_construction,
        }
    }

    fn fallback_version() -> EngineVersion {
        EngineVersion {
            components: vec![5, 1, 3],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn v(s: &str) -> EngineVersion {
        EngineVersion::parse(s).unwrap()
    }

    #[test]
    fn test_numeric_ordering() {
        assert!(v("1.10") > v("1.6"));
        assert!(v("5.3.6") > v("5.3.5"));
        assert_eq!(v("5.3.6"), v("5.3.6"));
        assert!(v("1.2.3") < v("1.2.3.4"));
    }

    #[test]
    fn test_suffixes_are_ignored() {
        assert_eq!(v("2022.3.7f1").components(), &[2022, 3, 7]);
        assert_eq!(v("2022.3.7f1").to_string(), "2022.3.7");
    }

    #[test]
    fn test_empty_version_rejected() {
        assert!(EngineVersion::parse("  ").is_err());
        assert!(EngineVersion::parse("...").is_err());
    }

    #[test]
    fn test_capabilities() {
        assert!(EngineCapabilities::for_version(Some("2022.3.7f1")).background_construction);
        assert!(EngineCapabilities::for_version(Some("5.3.6")).background_construction);
        assert!(!EngineCapabilities::for_version(Some("5.2.4")).background_construction);
    }

    #[test]
    fn test_unknown_version_falls_back() {
        let caps = EngineCapabilities::for_version(None);
        assert_eq!(caps.version.to_string(), EngineConfig::FALLBACK_VERSION);
        assert!(!caps.background_construction);

        let caps = EngineCapabilities::for_version(Some(""));
        assert_eq!(caps.version.to_string(), EngineConfig::FALLBACK_VERSION);
    }
}

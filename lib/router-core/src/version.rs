//! Semantic versions of deployed APIs

use crate::{CoreError, Result};
use std::fmt;

/// Parsed form of an API version such as `v1.2` or `v1.2.3`
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct SemanticVersion {
    /// Version exactly as deployed
    pub raw: String,
    pub major: u32,
    pub minor: u32,
    pub patch: Option<u32>,
}

impl SemanticVersion {
    /// Validate `version` and split it into its components.
    ///
    /// Valid versions are `vX.Y` or `vX.Y.Z` where X, Y and Z are non-negative
    /// integers without leading zeros. `api_name` only gives the error some context.
    pub fn parse(version: &str, api_name: &str) -> Result<Self> {
        let invalid = |reason: &str| CoreError::InvalidVersion {
            api: api_name.to_string(),
            version: version.to_string(),
            reason: reason.to_string(),
        };

        let unprefixed = version
            .strip_prefix('v')
            .ok_or_else(|| invalid("version must start with 'v'"))?;

        let components: Vec<&str> = unprefixed.split('.').collect();
        if components.len() < 2 || components.len() > 3 {
            return Err(invalid("expected major.minor or major.minor.patch"));
        }

        let mut numbers = Vec::with_capacity(components.len());
        for component in &components {
            if component.is_empty() || !component.bytes().all(|b| b.is_ascii_digit()) {
                return Err(invalid("version components must be non-negative integers"));
            }
            if component.len() > 1 && component.starts_with('0') {
                return Err(invalid("version components must not have leading zeros"));
            }
            let number = component
                .parse::<u32>()
                .map_err(|_| invalid("version component out of range"))?;
            numbers.push(number);
        }

        Ok(Self {
            raw: version.to_string(),
            major: numbers[0],
            minor: numbers[1],
            patch: numbers.get(2).copied(),
        })
    }

    /// Whether `candidate` is the same as or newer than `self`.
    ///
    /// Ordering is lexicographic on (major, minor, patch). A missing patch is
    /// older than any present patch of the same major.minor, and equal
    /// versions count as "at least as new".
    pub fn is_at_least_as_new_as(&self, candidate: &SemanticVersion) -> bool {
        candidate.ordering_key() >= self.ordering_key()
    }

    /// Whether `candidate` is strictly newer than `self`
    pub fn is_older_than(&self, candidate: &SemanticVersion) -> bool {
        candidate.ordering_key() > self.ordering_key()
    }

    // Option orders None before Some, which gives the missing-patch rule.
    fn ordering_key(&self) -> (u32, u32, Option<u32>) {
        (self.major, self.minor, self.patch)
    }
}

impl fmt::Display for SemanticVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.raw)
    }
}

/// Identifier shared by every version of an API on a vhost
pub fn api_family_identifier(vhost: &str, title: &str) -> String {
    format!("{}:{}", vhost, title)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn v(raw: &str) -> SemanticVersion {
        SemanticVersion::parse(raw, "PetStore").expect("valid version")
    }

    #[test]
    fn test_parse_full_version() {
        let version = v("v1.2.3");
        assert_eq!(version.raw, "v1.2.3");
        assert_eq!((version.major, version.minor, version.patch), (1, 2, Some(3)));
    }

    #[test]
    fn test_parse_without_patch() {
        let version = v("v10.0");
        assert_eq!((version.major, version.minor, version.patch), (10, 0, None));
    }

    #[test]
    fn test_parse_rejects_malformed_versions() {
        for raw in ["1.0.0", "v1", "v1.0.0.0", "v1..0", "va.b", "v1.-1", "v1.+1", "", "v", "V1.0"] {
            let err = SemanticVersion::parse(raw, "PetStore").unwrap_err();
            match err {
                CoreError::InvalidVersion { api, version, .. } => {
                    assert_eq!(api, "PetStore");
                    assert_eq!(version, raw);
                }
                other => panic!("unexpected error for {:?}: {}", raw, other),
            }
        }
    }

    #[test]
    fn test_parse_rejects_leading_zeros() {
        for raw in ["v01.0.0", "v1.00", "v1.2.03", "v00.1"] {
            assert!(SemanticVersion::parse(raw, "PetStore").is_err(), "{} accepted", raw);
        }
        let version = v("v0.10.0");
        assert_eq!((version.major, version.minor, version.patch), (0, 10, Some(0)));
    }

    #[test]
    fn test_ordering_by_components() {
        assert!(v("v1.0.0").is_at_least_as_new_as(&v("v1.0.1")));
        assert!(v("v1.0.9").is_at_least_as_new_as(&v("v1.1.0")));
        assert!(v("v1.9.9").is_at_least_as_new_as(&v("v2.0.0")));
        assert!(!v("v1.1.0").is_at_least_as_new_as(&v("v1.0.5")));
        assert!(!v("v2.0").is_at_least_as_new_as(&v("v1.9.9")));
    }

    #[test]
    fn test_equal_versions_are_at_least_as_new() {
        assert!(v("v1.0.0").is_at_least_as_new_as(&v("v1.0.0")));
        assert!(v("v1.0").is_at_least_as_new_as(&v("v1.0")));
        assert!(!v("v1.0.0").is_older_than(&v("v1.0.0")));
    }

    #[test]
    fn test_missing_patch_is_older_than_any_patch() {
        assert!(v("v1.0").is_at_least_as_new_as(&v("v1.0.0")));
        assert!(!v("v1.0.0").is_at_least_as_new_as(&v("v1.0")));
        assert!(v("v1.0").is_older_than(&v("v1.0.0")));
        // A newer minor still wins even without a patch
        assert!(v("v1.0.7").is_at_least_as_new_as(&v("v1.1")));
    }

    #[test]
    fn test_family_identifier_ignores_version() {
        assert_eq!(api_family_identifier("gw.example.com", "PetStore"), "gw.example.com:PetStore");
    }
}

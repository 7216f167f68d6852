//! Range keys naming the major and minor scopes of a version

use crate::SemanticVersion;
use std::fmt;

/// A major-only or major.minor version scope
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum RangeKey {
    /// `vMAJOR`
    Major(u32),
    /// `vMAJOR.MINOR`
    Minor(u32, u32),
}

impl RangeKey {
    pub fn major_of(version: &SemanticVersion) -> Self {
        RangeKey::Major(version.major)
    }

    pub fn minor_of(version: &SemanticVersion) -> Self {
        RangeKey::Minor(version.major, version.minor)
    }

    /// Whether `version` falls inside this scope
    pub fn contains(&self, version: &SemanticVersion) -> bool {
        match *self {
            RangeKey::Major(major) => version.major == major,
            RangeKey::Minor(major, minor) => version.major == major && version.minor == minor,
        }
    }
}

impl fmt::Display for RangeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RangeKey::Major(major) => write!(f, "v{}", major),
            RangeKey::Minor(major, minor) => write!(f, "v{}.{}", major, minor),
        }
    }
}

/// Major range label of a version, e.g. `v1`
pub fn major_key(version: &SemanticVersion) -> String {
    RangeKey::major_of(version).to_string()
}

/// Minor range label of a version, e.g. `v1.2`
pub fn minor_key(version: &SemanticVersion) -> String {
    RangeKey::minor_of(version).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_range_keys() {
        let version = SemanticVersion::parse("v1.2.3", "PetStore").unwrap();
        assert_eq!(major_key(&version), "v1");
        assert_eq!(minor_key(&version), "v1.2");
        assert_eq!(RangeKey::major_of(&version), RangeKey::Major(1));
        assert_eq!(RangeKey::minor_of(&version), RangeKey::Minor(1, 2));
    }

    #[test]
    fn test_range_contains() {
        let version = SemanticVersion::parse("v1.2", "PetStore").unwrap();
        assert!(RangeKey::Major(1).contains(&version));
        assert!(RangeKey::Minor(1, 2).contains(&version));
        assert!(!RangeKey::Minor(1, 3).contains(&version));
        assert!(!RangeKey::Major(2).contains(&version));
    }
}

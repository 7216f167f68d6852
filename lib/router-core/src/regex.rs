//! Regex fragments for exact and range version matching
//!
//! Every fragment is a drop-in replacement for the escaped version segment of
//! a route's path regex. Nothing outside that segment is touched.

use crate::SemanticVersion;

/// Regex matching exactly the given version string
pub fn exact_regex(version: &str) -> String {
    version.replace('.', "\\.")
}

/// Regex matching the version with its patch made optional.
///
/// A version without a patch has nothing to make optional and maps to its
/// exact regex.
pub fn minor_range_regex(version: &SemanticVersion) -> String {
    match version.patch {
        None => exact_regex(&version.raw),
        Some(patch) => format!("v{}\\.{}(?:\\.{})?", version.major, version.minor, patch),
    }
}

/// Label of the major range. Used as a map key, never as a route regex.
pub fn major_range_regex(version: &SemanticVersion) -> String {
    format!("v{}", version.major)
}

/// Regex matching the version with both minor and patch made optional
pub fn major_minor_range_regex(version: &SemanticVersion) -> String {
    match version.patch {
        None => format!("v{}(?:\\.{})?", version.major, version.minor),
        Some(patch) => format!(
            "v{}(?:\\.{}(?:\\.{})?)?",
            version.major, version.minor, patch
        ),
    }
}

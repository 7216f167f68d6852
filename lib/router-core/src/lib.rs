//! Intelligent version-range routing for the gateway control plane
//!
//! This library provides:
//! - Semantic version parsing and ordering of deployed API versions
//! - Regex fragments for exact, minor-range and major-range version matching
//! - A tracker of which API version holds each version range
//! - Lifecycle handlers that widen and narrow route regexes on API create/update/delete
//! - A per-organization routing registry

pub mod error;
pub mod inventory;
pub mod lifecycle;
pub mod metrics;
pub mod range;
pub mod regex;
pub mod registry;
pub mod rewrite;
pub mod tracker;
pub mod version;

pub use error::{CoreError, Result};
pub use inventory::{ApiInventory, InMemoryInventory, RouteSet, RouteTable};
pub use lifecycle::{DeleteOutcome, SlotChange, UpsertOutcome, VersionRouter};
pub use metrics::RoutingMetrics;
pub use range::RangeKey;
pub use registry::{EventOutcome, RoutingRegistry};
pub use rewrite::{rewrite, RewritePlan};
pub use tracker::LatestVersionTracker;
pub use version::{api_family_identifier, SemanticVersion};

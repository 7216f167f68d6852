//! In-place rewriting of the version segment of route regexes
//!
//! Substitutions are first-match only, so their order matters: narrowing goes
//! from the most specific fragment to the least specific one and widening the
//! other way round. The named [`RewritePlan`] constructors fix that order.

use crate::regex::{exact_regex, major_minor_range_regex, minor_range_regex};
use crate::SemanticVersion;
use router_api::RouteRegex;
use tracing::debug;

/// Replace the first occurrence of `from` with `to` in the match regex and,
/// independently, in the rewrite pattern of `route`.
///
/// Fields not containing `from` are left untouched. Returns the number of
/// fields that changed.
pub fn rewrite<R: RouteRegex + ?Sized>(route: &mut R, from: &str, to: &str) -> usize {
    if from.is_empty() || from == to {
        return 0;
    }

    let mut changed = 0;

    if route.match_regex().contains(from) {
        let regex = route.match_regex().replacen(from, to, 1);
        route.set_match_regex(regex);
        changed += 1;
    }

    if let Some(pattern) = route.rewrite_pattern() {
        if pattern.contains(from) {
            let pattern = pattern.replacen(from, to, 1);
            route.set_rewrite_pattern(pattern);
            changed += 1;
        }
    }

    changed
}

/// One substitution of a plan
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RewriteStep {
    pub from: String,
    pub to: String,
}

/// Ordered list of substitutions applied to every route of an API
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RewritePlan {
    steps: Vec<RewriteStep>,
}

impl RewritePlan {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a substitution. Identity substitutions are dropped.
    pub fn step(mut self, from: String, to: String) -> Self {
        if from != to {
            self.steps.push(RewriteStep { from, to });
        }
        self
    }

    /// Append all steps of `other` after the steps of `self`
    pub fn then(mut self, other: RewritePlan) -> Self {
        self.steps.extend(other.steps);
        self
    }

    /// `version` lost its minor range: back to the exact regex, whether it
    /// was widened to the minor range or to the full major range.
    pub fn narrow_minor_holder(version: &SemanticVersion) -> Self {
        let exact = exact_regex(&version.raw);
        Self::new()
            .step(minor_range_regex(version), exact.clone())
            .step(major_minor_range_regex(version), exact)
    }

    /// `version` lost its major range but keeps its minor range
    pub fn narrow_major_holder(version: &SemanticVersion) -> Self {
        Self::new().step(major_minor_range_regex(version), minor_range_regex(version))
    }

    /// `version` now holds its major range (and therefore its minor range)
    pub fn widen_to_major(version: &SemanticVersion) -> Self {
        Self::new().step(exact_regex(&version.raw), major_minor_range_regex(version))
    }

    /// `version` now holds its minor range only
    pub fn widen_to_minor(version: &SemanticVersion) -> Self {
        Self::new().step(exact_regex(&version.raw), minor_range_regex(version))
    }

    /// `version` was promoted to its major range after the holder went away.
    /// Its routes may carry the minor range regex or the exact regex.
    pub fn promote_to_major(version: &SemanticVersion) -> Self {
        let exact = exact_regex(&version.raw);
        Self::new()
            .step(minor_range_regex(version), exact.clone())
            .step(exact, major_minor_range_regex(version))
    }

    /// `version` was promoted to its minor range after the holder went away
    pub fn promote_to_minor(version: &SemanticVersion) -> Self {
        Self::widen_to_minor(version)
    }

    pub fn steps(&self) -> &[RewriteStep] {
        &self.steps
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Run every step, in order, on one route
    pub fn apply<R: RouteRegex + ?Sized>(&self, route: &mut R) -> usize {
        self.steps
            .iter()
            .map(|step| rewrite(route, &step.from, &step.to))
            .sum()
    }

    /// Run the plan on each route. Returns the number of changed fields.
    pub fn apply_all<R: RouteRegex>(&self, routes: &mut [R]) -> usize {
        let changed: usize = routes.iter_mut().map(|route| self.apply(route)).sum();
        debug!("Applied {} rewrite step(s) to {} route(s), {} field(s) changed", self.steps.len(), routes.len(), changed);
        changed
    }
}

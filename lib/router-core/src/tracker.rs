//! Latest-version tracker: which version holds each range of an API family

use crate::{RangeKey, SemanticVersion};
use std::collections::{BTreeMap, HashMap};
use tracing::debug;

pub type FamilyRanges = BTreeMap<RangeKey, SemanticVersion>;

/// Per organization, per API family map from range key to its holder.
///
/// At most one holder exists per (organization, family, range). Callers
/// decide which version is latest; nothing is validated here.
#[derive(Debug, Default)]
pub struct LatestVersionTracker {
    organizations: HashMap<String, HashMap<String, FamilyRanges>>,
}

impl LatestVersionTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current holder of a range
    pub fn get(&self, organization_id: &str, family_id: &str, range: RangeKey) -> Option<&SemanticVersion> {
        self.family(organization_id, family_id)?.get(&range)
    }

    /// Record `version` as the holder of a range, replacing any previous holder
    pub fn set(&mut self, organization_id: &str, family_id: &str, range: RangeKey, version: SemanticVersion) {
        debug!("Range {} of {} in {} now held by {}", range, family_id, organization_id, version);
        self.organizations
            .entry(organization_id.to_string())
            .or_default()
            .entry(family_id.to_string())
            .or_default()
            .insert(range, version);
    }

    /// Drop the holder of a range. No-op if the range has no holder.
    pub fn remove(&mut self, organization_id: &str, family_id: &str, range: RangeKey) -> Option<SemanticVersion> {
        let removed = self
            .organizations
            .get_mut(organization_id)?
            .get_mut(family_id)?
            .remove(&range);
        if removed.is_some() {
            debug!("Range {} of {} in {} released", range, family_id, organization_id);
        }
        removed
    }

    /// All ranges of a family, if the family was ever tracked
    pub fn family(&self, organization_id: &str, family_id: &str) -> Option<&FamilyRanges> {
        self.organizations.get(organization_id)?.get(family_id)
    }

    /// Iterate every (organization, family, range, holder) entry
    pub fn entries(&self) -> impl Iterator<Item = (&str, &str, RangeKey, &SemanticVersion)> {
        self.organizations.iter().flat_map(|(org, families)| {
            families.iter().flat_map(move |(family, ranges)| {
                ranges
                    .iter()
                    .map(move |(range, holder)| (org.as_str(), family.as_str(), *range, holder))
            })
        })
    }
}

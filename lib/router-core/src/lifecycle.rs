//! API lifecycle handlers for intelligent version routing
//!
//! Each API family (same title on the same vhost) has two ownership slots per
//! version line: the major range (`v1`) and the minor range (`v1.2`). The
//! holder of a slot has its routes widened so that requests for the range
//! reach it. Create/update events may hand a slot to a newer version, delete
//! events promote the next newest sibling.

use crate::inventory::{ApiInventory, RouteSet};
use crate::metrics::RoutingMetrics;
use crate::rewrite::RewritePlan;
use crate::tracker::LatestVersionTracker;
use crate::version::api_family_identifier;
use crate::{RangeKey, SemanticVersion};
use router_api::ApiDefinition;
use tracing::{debug, info};

/// What an upsert did to the ownership slots of the API's family
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UpsertOutcome {
    /// The version could not be parsed, so routing was left alone
    Unversioned,
    /// The version was parsed. Flags tell which slots it now holds.
    Applied { latest_major: bool, latest_minor: bool },
}

/// What happened to one slot during a delete
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum SlotChange {
    /// The deleted API did not hold the slot
    #[default]
    Untouched,
    /// The slot moved to the API with this identifier
    Promoted(String),
    /// No sibling left in the range, the slot is now empty
    Released,
}

/// What a delete did to the ownership slots of the API's family
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DeleteOutcome {
    pub major: SlotChange,
    pub minor: SlotChange,
}

/// Keeps range ownership and route regexes in sync with API lifecycle events.
///
/// Events of one organization must be handled one at a time and in order.
pub struct VersionRouter {
    tracker: LatestVersionTracker,
    metrics: RoutingMetrics,
}

impl VersionRouter {
    pub fn new(metrics: RoutingMetrics) -> Self {
        Self {
            tracker: LatestVersionTracker::new(),
            metrics,
        }
    }

    pub fn tracker(&self) -> &LatestVersionTracker {
        &self.tracker
    }

    pub fn metrics(&self) -> &RoutingMetrics {
        &self.metrics
    }

    /// Handle a created or updated API.
    ///
    /// `inventory` must already contain the API and `routes` its current
    /// routes, carrying the exact version regex.
    #[allow(clippy::too_many_arguments)]
    pub fn on_api_upsert<I, R>(
        &mut self,
        inventory: &I,
        routes: &mut R,
        organization_id: &str,
        api_id: &str,
        api_name: &str,
        api_version: &str,
        vhost: &str,
    ) -> UpsertOutcome
    where
        I: ApiInventory + ?Sized,
        R: RouteSet + ?Sized,
    {
        let version = match SemanticVersion::parse(api_version, api_name) {
            Ok(version) => version,
            Err(e) => {
                debug!("Version routing disabled for {}: {}", api_id, e);
                self.metrics.unversioned_total.inc();
                return UpsertOutcome::Unversioned;
            }
        };
        self.metrics.upserts_total.inc();

        let family_id = api_family_identifier(vhost, api_name);
        let major_range = RangeKey::major_of(&version);
        let minor_range = RangeKey::minor_of(&version);

        let major_holder = self.tracker.get(organization_id, &family_id, major_range).cloned();
        let minor_holder = self.tracker.get(organization_id, &family_id, minor_range).cloned();

        let latest_major = major_holder
            .as_ref()
            .map_or(true, |holder| holder.is_at_least_as_new_as(&version));
        let latest_minor = minor_holder
            .as_ref()
            .map_or(true, |holder| holder.is_at_least_as_new_as(&version));

        if !latest_major && !latest_minor {
            debug!(
                "{} {} is not the latest in {} or {}, keeping exact match",
                api_name, version, major_range, minor_range
            );
            return UpsertOutcome::Applied {
                latest_major,
                latest_minor,
            };
        }

        // Previous holders that are about to lose a slot. A version already
        // holding the slot keeps its routes as they are.
        let displaced_minor = minor_holder.filter(|h| latest_minor && h.raw != version.raw);
        let displaced_major = major_holder.filter(|h| latest_major && h.raw != version.raw);

        if displaced_minor.is_some() || displaced_major.is_some() {
            for (sibling_id, sibling) in inventory.list_apis(organization_id) {
                if sibling.title != api_name || sibling.vhost != vhost {
                    continue;
                }

                // Minor first: a major-level substitution must not see text
                // the minor-level one just produced.
                let mut plan = RewritePlan::new();
                if let Some(holder) = displaced_minor.as_ref().filter(|h| h.raw == sibling.version) {
                    plan = plan.then(RewritePlan::narrow_minor_holder(holder));
                }
                if let Some(holder) = displaced_major.as_ref().filter(|h| h.raw == sibling.version) {
                    plan = plan.then(RewritePlan::narrow_major_holder(holder));
                }
                if plan.is_empty() {
                    continue;
                }

                let changed = plan.apply_all(routes.routes_mut(organization_id, sibling_id));
                debug!("Narrowed routes of {} ({} field(s))", sibling_id, changed);
                self.metrics.record_narrowed(changed);
            }
        }

        self.tracker
            .set(organization_id, &family_id, minor_range, version.clone());
        let plan = if latest_major {
            self.tracker
                .set(organization_id, &family_id, major_range, version.clone());
            RewritePlan::widen_to_major(&version)
        } else {
            RewritePlan::widen_to_minor(&version)
        };

        let changed = plan.apply_all(routes.routes_mut(organization_id, api_id));
        self.metrics.record_widened(changed);
        info!(
            "{} {} ({}) is latest in {}{}",
            api_name,
            version,
            api_id,
            minor_range,
            if latest_major {
                format!(" and {}", major_range)
            } else {
                String::new()
            }
        );

        UpsertOutcome::Applied {
            latest_major,
            latest_minor,
        }
    }

    /// Handle a deleted API.
    ///
    /// When the API held a slot, ownership moves to the newest remaining
    /// sibling in the range, or the slot is released when there is none.
    pub fn on_api_delete<I, R>(
        &mut self,
        inventory: &I,
        routes: &mut R,
        organization_id: &str,
        api_id: &str,
        api: &ApiDefinition,
    ) -> DeleteOutcome
    where
        I: ApiInventory + ?Sized,
        R: RouteSet + ?Sized,
    {
        let mut outcome = DeleteOutcome::default();

        let family_id = api_family_identifier(&api.vhost, &api.title);
        if self.tracker.family(organization_id, &family_id).is_none() {
            return outcome;
        }

        let version = match SemanticVersion::parse(&api.version, &api.title) {
            Ok(version) => version,
            Err(e) => {
                debug!("Version routing not tracked for {}: {}", api_id, e);
                self.metrics.unversioned_total.inc();
                return outcome;
            }
        };
        self.metrics.deletes_total.inc();

        let major_range = RangeKey::major_of(&version);
        let mut major_successor: Option<(String, SemanticVersion)> = None;

        if self.holds(organization_id, &family_id, major_range, &api.version) {
            match find_successor(inventory, organization_id, api_id, api, major_range, None) {
                Some((successor_id, successor)) => {
                    let plan = RewritePlan::promote_to_major(&successor);
                    let changed = plan.apply_all(routes.routes_mut(organization_id, &successor_id));
                    self.metrics.record_widened(changed);
                    self.metrics.record_promotion("major");
                    info!(
                        "Promoted {} {} ({}) to {} after deleting {}",
                        api.title, successor, successor_id, major_range, version
                    );
                    self.tracker
                        .set(organization_id, &family_id, major_range, successor.clone());
                    outcome.major = SlotChange::Promoted(successor_id.clone());
                    major_successor = Some((successor_id, successor));
                }
                None => {
                    self.tracker.remove(organization_id, &family_id, major_range);
                    outcome.major = SlotChange::Released;
                }
            }
        }

        let minor_range = RangeKey::minor_of(&version);
        if self.holds(organization_id, &family_id, minor_range, &api.version) {
            match &major_successor {
                // The new major holder already matches the whole major range,
                // so it takes the minor slot without another rewrite.
                Some((successor_id, successor)) if minor_range.contains(successor) => {
                    self.tracker
                        .set(organization_id, &family_id, minor_range, successor.clone());
                    outcome.minor = SlotChange::Promoted(successor_id.clone());
                }
                _ => {
                    let exclude = major_successor.as_ref().map(|(id, _)| id.as_str());
                    match find_successor(inventory, organization_id, api_id, api, minor_range, exclude) {
                        Some((successor_id, successor)) => {
                            let plan = RewritePlan::promote_to_minor(&successor);
                            let changed =
                                plan.apply_all(routes.routes_mut(organization_id, &successor_id));
                            self.metrics.record_widened(changed);
                            self.metrics.record_promotion("minor");
                            info!(
                                "Promoted {} {} ({}) to {} after deleting {}",
                                api.title, successor, successor_id, minor_range, version
                            );
                            self.tracker
                                .set(organization_id, &family_id, minor_range, successor);
                            outcome.minor = SlotChange::Promoted(successor_id);
                        }
                        None => {
                            self.tracker.remove(organization_id, &family_id, minor_range);
                            outcome.minor = SlotChange::Released;
                        }
                    }
                }
            }
        }

        outcome
    }

    fn holds(&self, organization_id: &str, family_id: &str, range: RangeKey, raw_version: &str) -> bool {
        self.tracker
            .get(organization_id, family_id, range)
            .map_or(false, |holder| holder.raw == raw_version)
    }
}

impl Default for VersionRouter {
    fn default() -> Self {
        Self::new(RoutingMetrics::default())
    }
}

/// Newest sibling of `api` inside `range`, skipping the deleted API and
/// `exclude`. Equal versions go to the smallest API identifier so the
/// result does not depend on inventory order.
fn find_successor<I: ApiInventory + ?Sized>(
    inventory: &I,
    organization_id: &str,
    deleted_id: &str,
    api: &ApiDefinition,
    range: RangeKey,
    exclude: Option<&str>,
) -> Option<(String, SemanticVersion)> {
    let mut best: Option<(&str, SemanticVersion)> = None;

    for (candidate_id, candidate) in inventory.list_apis(organization_id) {
        if candidate_id == deleted_id || Some(candidate_id) == exclude || !candidate.same_family(api) {
            continue;
        }
        let version = match SemanticVersion::parse(&candidate.version, &candidate.title) {
            Ok(version) if range.contains(&version) => version,
            _ => continue,
        };

        let better = match &best {
            None => true,
            Some((best_id, best_version)) => {
                best_version.is_older_than(&version)
                    || (!version.is_older_than(best_version) && candidate_id < *best_id)
            }
        };
        if better {
            best = Some((candidate_id, version));
        }
    }

    best.map(|(id, version)| (id.to_string(), version))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inventory::{InMemoryInventory, RouteTable};
    use router_api::Route;

    const ORG: &str = "acme";
    const VHOST: &str = "gw.example.com";
    const TITLE: &str = "PetStore";

    struct Harness {
        inventory: InMemoryInventory,
        routes: RouteTable,
        router: VersionRouter,
    }

    impl Harness {
        fn new() -> Self {
            Self {
                inventory: InMemoryInventory::new(),
                routes: RouteTable::new(),
                router: VersionRouter::default(),
            }
        }

        fn upsert(&mut self, version: &str) -> UpsertOutcome {
            let api_id = api_id(version);
            let regex = route_regex(&version.replace('.', "\\."));
            self.inventory
                .insert(ORG, &api_id, ApiDefinition::new(TITLE, version, VHOST));
            self.routes.insert(
                ORG,
                &api_id,
                vec![Route::new("pets", regex.clone(), "petstore").with_rewrite(regex, "/pets\\1")],
            );
            self.router
                .on_api_upsert(&self.inventory, &mut self.routes, ORG, &api_id, TITLE, version, VHOST)
        }

        fn delete(&mut self, version: &str) -> DeleteOutcome {
            let api_id = api_id(version);
            let api = self.inventory.get(ORG, &api_id).cloned().expect("known api");
            let outcome = self
                .router
                .on_api_delete(&self.inventory, &mut self.routes, ORG, &api_id, &api);
            self.inventory.remove(ORG, &api_id);
            self.routes.remove(ORG, &api_id);
            outcome
        }

        fn regex(&self, version: &str) -> String {
            let routes = self.routes.get(ORG, &api_id(version)).expect("routes");
            let route = &routes[0];
            assert_eq!(
                Some(route.r#match.safe_regex.as_str()),
                route.action.regex_rewrite.as_ref().map(|r| r.pattern.as_str()),
                "match regex and rewrite pattern diverged"
            );
            route.r#match.safe_regex.clone()
        }

        fn holder(&self, range: RangeKey) -> Option<String> {
            let family = api_family_identifier(VHOST, TITLE);
            self.router
                .tracker()
                .get(ORG, &family, range)
                .map(|v| v.raw.clone())
        }
    }

    fn api_id(version: &str) -> String {
        format!("petstore-{}", version)
    }

    fn route_regex(version_regex: &str) -> String {
        format!("^/petstore/{}/pets((?:/.*)*)", version_regex)
    }

    #[test]
    fn test_first_version_takes_both_ranges() {
        let mut h = Harness::new();
        let outcome = h.upsert("v1.0.0");
        assert_eq!(outcome, UpsertOutcome::Applied { latest_major: true, latest_minor: true });
        assert_eq!(h.holder(RangeKey::Major(1)).as_deref(), Some("v1.0.0"));
        assert_eq!(h.holder(RangeKey::Minor(1, 0)).as_deref(), Some("v1.0.0"));
        assert_eq!(h.regex("v1.0.0"), route_regex("v1(?:\\.0(?:\\.0)?)?"));
    }

    #[test]
    fn test_newer_minor_takes_major_range() {
        let mut h = Harness::new();
        h.upsert("v1.0.0");
        h.upsert("v1.1.0");

        assert_eq!(h.holder(RangeKey::Major(1)).as_deref(), Some("v1.1.0"));
        assert_eq!(h.holder(RangeKey::Minor(1, 1)).as_deref(), Some("v1.1.0"));
        assert_eq!(h.regex("v1.1.0"), route_regex("v1(?:\\.1(?:\\.0)?)?"));
        // v1.0.0 lost the major range but still owns v1.0
        assert_eq!(h.holder(RangeKey::Minor(1, 0)).as_deref(), Some("v1.0.0"));
        assert_eq!(h.regex("v1.0.0"), route_regex("v1\\.0(?:\\.0)?"));
    }

    #[test]
    fn test_newer_patch_takes_minor_range_only() {
        let mut h = Harness::new();
        h.upsert("v1.0.0");
        h.upsert("v1.1.0");
        let outcome = h.upsert("v1.0.5");

        assert_eq!(outcome, UpsertOutcome::Applied { latest_major: false, latest_minor: true });
        assert_eq!(h.holder(RangeKey::Major(1)).as_deref(), Some("v1.1.0"));
        assert_eq!(h.holder(RangeKey::Minor(1, 0)).as_deref(), Some("v1.0.5"));
        assert_eq!(h.regex("v1.0.5"), route_regex("v1\\.0(?:\\.5)?"));
        assert_eq!(h.regex("v1.0.0"), route_regex("v1\\.0\\.0"));
        assert_eq!(h.regex("v1.1.0"), route_regex("v1(?:\\.1(?:\\.0)?)?"));
    }

    #[test]
    fn test_older_version_keeps_exact_match() {
        let mut h = Harness::new();
        h.upsert("v1.1.0");
        let before = h.regex("v1.1.0");
        let outcome = h.upsert("v1.0.5");
        assert_eq!(outcome, UpsertOutcome::Applied { latest_major: false, latest_minor: true });

        let outcome = h.upsert("v1.0.2");
        assert_eq!(outcome, UpsertOutcome::Applied { latest_major: false, latest_minor: false });
        assert_eq!(h.regex("v1.0.2"), route_regex("v1\\.0\\.2"));
        assert_eq!(h.regex("v1.0.5"), route_regex("v1\\.0(?:\\.5)?"));
        assert_eq!(h.regex("v1.1.0"), before);
    }

    #[test]
    fn test_delete_major_holder_promotes_newest_sibling() {
        let mut h = Harness::new();
        h.upsert("v1.0.0");
        h.upsert("v1.1.0");
        h.upsert("v1.0.5");

        let outcome = h.delete("v1.1.0");
        assert_eq!(outcome.major, SlotChange::Promoted(api_id("v1.0.5")));
        assert_eq!(outcome.minor, SlotChange::Released);
        assert_eq!(h.holder(RangeKey::Major(1)).as_deref(), Some("v1.0.5"));
        assert_eq!(h.holder(RangeKey::Minor(1, 1)), None);
        assert_eq!(h.holder(RangeKey::Minor(1, 0)).as_deref(), Some("v1.0.5"));
        assert_eq!(h.regex("v1.0.5"), route_regex("v1(?:\\.0(?:\\.5)?)?"));
        assert_eq!(h.regex("v1.0.0"), route_regex("v1\\.0\\.0"));
    }

    #[test]
    fn test_delete_minor_holder_promotes_within_minor() {
        let mut h = Harness::new();
        h.upsert("v1.1.0");
        h.upsert("v1.0.0");
        h.upsert("v1.0.5");

        let outcome = h.delete("v1.0.5");
        assert_eq!(outcome.major, SlotChange::Untouched);
        assert_eq!(outcome.minor, SlotChange::Promoted(api_id("v1.0.0")));
        assert_eq!(h.regex("v1.0.0"), route_regex("v1\\.0(?:\\.0)?"));
        assert_eq!(h.regex("v1.1.0"), route_regex("v1(?:\\.1(?:\\.0)?)?"));
    }

    #[test]
    fn test_delete_promotes_same_api_to_both_slots_once() {
        let mut h = Harness::new();
        h.upsert("v1.1");
        h.upsert("v1.0.5");
        h.upsert("v1.1.0");
        assert_eq!(h.regex("v1.1"), route_regex("v1\\.1"));

        let outcome = h.delete("v1.1.0");
        assert_eq!(outcome.major, SlotChange::Promoted(api_id("v1.1")));
        assert_eq!(outcome.minor, SlotChange::Promoted(api_id("v1.1")));
        assert_eq!(h.holder(RangeKey::Minor(1, 1)).as_deref(), Some("v1.1"));
        assert_eq!(h.regex("v1.1"), route_regex("v1(?:\\.1)?"));
    }

    #[test]
    fn test_delete_last_version_releases_slots() {
        let mut h = Harness::new();
        h.upsert("v2.0.0");
        let outcome = h.delete("v2.0.0");
        assert_eq!(outcome, DeleteOutcome { major: SlotChange::Released, minor: SlotChange::Released });
        assert_eq!(h.holder(RangeKey::Major(2)), None);
        assert_eq!(h.holder(RangeKey::Minor(2, 0)), None);
    }

    #[test]
    fn test_delete_non_holder_changes_nothing() {
        let mut h = Harness::new();
        h.upsert("v1.0.0");
        h.upsert("v1.0.1");
        let outcome = h.delete("v1.0.0");
        assert_eq!(outcome, DeleteOutcome::default());
        assert_eq!(h.regex("v1.0.1"), route_regex("v1(?:\\.0(?:\\.1)?)?"));
    }

    #[test]
    fn test_delete_round_trip_restores_previous_ownership() {
        let mut h = Harness::new();
        h.upsert("v1.0.0");
        h.upsert("v1.0.5");
        let before = (h.regex("v1.0.0"), h.regex("v1.0.5"));
        let holders_before: Vec<_> = h.router.tracker().entries().map(|(_, _, r, v)| (r, v.raw.clone())).collect();

        h.upsert("v1.1.0");
        h.delete("v1.1.0");

        assert_eq!((h.regex("v1.0.0"), h.regex("v1.0.5")), before);
        let holders_after: Vec<_> = h.router.tracker().entries().map(|(_, _, r, v)| (r, v.raw.clone())).collect();
        assert_eq!(holders_after, holders_before);
    }

    #[test]
    fn test_upsert_is_idempotent() {
        let mut h = Harness::new();
        h.upsert("v1.0.0");
        h.upsert("v1.2.0");
        let first = h.regex("v1.2.0");
        let rewrites = |h: &Harness| {
            let counter = &h.router.metrics().route_rewrites_total;
            (
                counter.with_label_values(&["widen"]).get() as u64,
                counter.with_label_values(&["narrow"]).get() as u64,
            )
        };
        let before = rewrites(&h);
        let outcome = h.router.on_api_upsert(
            &h.inventory,
            &mut h.routes,
            ORG,
            &api_id("v1.2.0"),
            TITLE,
            "v1.2.0",
            VHOST,
        );
        assert_eq!(outcome, UpsertOutcome::Applied { latest_major: true, latest_minor: true });
        assert_eq!(h.regex("v1.2.0"), first);
        assert_eq!(h.regex("v1.0.0"), route_regex("v1\\.0(?:\\.0)?"));
        assert_eq!(rewrites(&h), before, "repeated upsert rewrote routes");

        // A redeploy brings fresh exact routes, which are widened again
        h.upsert("v1.2.0");
        assert_eq!(h.regex("v1.2.0"), first);
        assert_eq!(h.regex("v1.0.0"), route_regex("v1\\.0(?:\\.0)?"));
        assert_eq!(rewrites(&h).1, before.1);
    }

    #[test]
    fn test_leading_zero_version_is_left_alone() {
        let mut h = Harness::new();
        assert_eq!(h.upsert("v01.0.0"), UpsertOutcome::Unversioned);
        assert_eq!(h.regex("v01.0.0"), route_regex("v01\\.0\\.0"));
        assert_eq!(h.router.tracker().entries().count(), 0);
    }

    #[test]
    fn test_invalid_version_is_left_alone() {
        let mut h = Harness::new();
        let outcome = h.upsert("1.0.0");
        assert_eq!(outcome, UpsertOutcome::Unversioned);
        assert_eq!(h.regex("1.0.0"), route_regex("1\\.0\\.0"));
        assert_eq!(h.router.tracker().entries().count(), 0);
        assert_eq!(h.router.metrics().unversioned_total.get() as u64, 1);
    }

    #[test]
    fn test_invalid_siblings_are_never_promoted() {
        let mut h = Harness::new();
        h.upsert("v1.0.0");
        h.upsert("1.5.0");
        let outcome = h.delete("v1.0.0");
        assert_eq!(outcome.major, SlotChange::Released);
        assert_eq!(h.regex("1.5.0"), route_regex("1\\.5\\.0"));
    }

    #[test]
    fn test_families_are_independent() {
        let mut h = Harness::new();
        h.upsert("v1.0.0");
        let regex = route_regex("v1\\.1\\.0");
        h.inventory
            .insert(ORG, "orders-1.1.0", ApiDefinition::new("Orders", "v1.1.0", VHOST));
        h.routes
            .insert(ORG, "orders-1.1.0", vec![Route::new("orders", regex, "orders")]);
        h.router.on_api_upsert(
            &h.inventory,
            &mut h.routes,
            ORG,
            "orders-1.1.0",
            "Orders",
            "v1.1.0",
            VHOST,
        );
        assert_eq!(h.regex("v1.0.0"), route_regex("v1(?:\\.0(?:\\.0)?)?"));
        assert_eq!(
            h.routes.get(ORG, "orders-1.1.0").map(|r| r[0].r#match.safe_regex.clone()),
            Some(route_regex("v1(?:\\.1(?:\\.0)?)?"))
        );
    }

    #[test]
    fn test_successor_tie_break_prefers_smallest_identifier() {
        let mut inventory = InMemoryInventory::new();
        let api = ApiDefinition::new(TITLE, "v1.2.0", VHOST);
        inventory.insert(ORG, "deleted", api.clone());
        inventory.insert(ORG, "zeta", ApiDefinition::new(TITLE, "v1.1.0", VHOST));
        inventory.insert(ORG, "alpha", ApiDefinition::new(TITLE, "v1.1.0", VHOST));
        inventory.insert(ORG, "other-vhost", ApiDefinition::new(TITLE, "v1.1.9", "other"));
        inventory.insert(ORG, "older", ApiDefinition::new(TITLE, "v1.1", VHOST));

        let successor = find_successor(&inventory, ORG, "deleted", &api, RangeKey::Major(1), None);
        assert_eq!(successor.map(|(id, v)| (id, v.raw)), Some(("alpha".to_string(), "v1.1.0".to_string())));

        let successor = find_successor(&inventory, ORG, "deleted", &api, RangeKey::Major(1), Some("alpha"));
        assert_eq!(successor.map(|(id, _)| id), Some("zeta".to_string()));

        let successor = find_successor(&inventory, ORG, "deleted", &api, RangeKey::Major(2), None);
        assert!(successor.is_none());
    }
}

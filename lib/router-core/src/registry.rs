//! Routing registry holding the version routing state of every organization

use crate::inventory::{ApiInventory, InMemoryInventory, RouteTable};
use crate::lifecycle::{DeleteOutcome, UpsertOutcome, VersionRouter};
use crate::metrics::RoutingMetrics;
use crate::version::api_family_identifier;
use crate::{CoreError, RangeKey, Result, SemanticVersion};
use router_api::{ApiDefinition, LifecycleEvent, Route};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use tracing::debug;

/// Inventory, routes and range ownership of one organization
pub struct OrganizationState {
    pub inventory: InMemoryInventory,
    pub routes: RouteTable,
    pub router: VersionRouter,
}

impl OrganizationState {
    fn new(metrics: RoutingMetrics) -> Self {
        Self {
            inventory: InMemoryInventory::new(),
            routes: RouteTable::new(),
            router: VersionRouter::new(metrics),
        }
    }
}

/// Result of applying one lifecycle event
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum EventOutcome {
    Upserted(UpsertOutcome),
    Deleted(DeleteOutcome),
}

/// RoutingRegistry shards version routing state per organization.
///
/// Events of one organization are serialized on that organization's lock,
/// different organizations proceed in parallel.
pub struct RoutingRegistry {
    organizations: Arc<RwLock<HashMap<String, Arc<Mutex<OrganizationState>>>>>,
    metrics: RoutingMetrics,
}

impl RoutingRegistry {
    pub fn new(metrics: RoutingMetrics) -> Self {
        Self {
            organizations: Arc::new(RwLock::new(HashMap::new())),
            metrics,
        }
    }

    pub fn metrics(&self) -> &RoutingMetrics {
        &self.metrics
    }

    /// Register or update an API with freshly generated routes
    pub async fn upsert_api(
        &self,
        organization_id: &str,
        api_id: &str,
        api: ApiDefinition,
        routes: Vec<Route>,
    ) -> Result<UpsertOutcome> {
        let organization = self.organization_or_create(organization_id).await;
        let mut state = organization.lock().await;
        let OrganizationState {
            inventory,
            routes: route_table,
            router,
        } = &mut *state;

        // A changed version or family is a new deployment: release whatever
        // the old definition owned first.
        if let Some(previous) = inventory.get(organization_id, api_id).cloned() {
            if previous != api {
                debug!(
                    "API {} changed from {} {} to {} {}",
                    api_id, previous.title, previous.version, api.title, api.version
                );
                router.on_api_delete(&*inventory, route_table, organization_id, api_id, &previous);
            }
        }

        inventory.insert(organization_id, api_id, api.clone());
        route_table.insert(organization_id, api_id, routes);
        debug!("Registered API {} in {}", api_id, organization_id);

        Ok(router.on_api_upsert(
            &*inventory,
            route_table,
            organization_id,
            api_id,
            &api.title,
            &api.version,
            &api.vhost,
        ))
    }

    /// Remove an API, handing its ranges to the newest remaining siblings
    pub async fn delete_api(&self, organization_id: &str, api_id: &str) -> Result<DeleteOutcome> {
        let organization = self.organization(organization_id).await?;
        let mut state = organization.lock().await;
        let OrganizationState {
            inventory,
            routes: route_table,
            router,
        } = &mut *state;

        let api = inventory
            .get(organization_id, api_id)
            .cloned()
            .ok_or_else(|| CoreError::ApiNotFound(api_id.to_string()))?;

        let outcome = router.on_api_delete(&*inventory, route_table, organization_id, api_id, &api);

        inventory.remove(organization_id, api_id);
        route_table.remove(organization_id, api_id);
        debug!("Deregistered API {} from {}", api_id, organization_id);

        Ok(outcome)
    }

    /// Dispatch a lifecycle event
    pub async fn apply(&self, event: LifecycleEvent) -> Result<EventOutcome> {
        match event {
            LifecycleEvent::Upsert {
                organization_id,
                api_id,
                api,
                routes,
            } => self
                .upsert_api(&organization_id, &api_id, api, routes)
                .await
                .map(EventOutcome::Upserted),
            LifecycleEvent::Delete {
                organization_id,
                api_id,
            } => self
                .delete_api(&organization_id, &api_id)
                .await
                .map(EventOutcome::Deleted),
        }
    }

    /// Current routes of an API
    pub async fn routes(&self, organization_id: &str, api_id: &str) -> Result<Vec<Route>> {
        let organization = self.organization(organization_id).await?;
        let state = organization.lock().await;
        state
            .routes
            .get(organization_id, api_id)
            .map(<[Route]>::to_vec)
            .ok_or_else(|| CoreError::ApiNotFound(api_id.to_string()))
    }

    /// Version currently holding a range of an API family
    pub async fn latest_version(
        &self,
        organization_id: &str,
        vhost: &str,
        title: &str,
        range: RangeKey,
    ) -> Result<Option<SemanticVersion>> {
        let organization = self.organization(organization_id).await?;
        let state = organization.lock().await;
        let family_id = api_family_identifier(vhost, title);
        Ok(state
            .router
            .tracker()
            .get(organization_id, &family_id, range)
            .cloned())
    }

    /// Every route of an organization, keyed by API identifier
    pub async fn route_snapshot(&self, organization_id: &str) -> Result<HashMap<String, Vec<Route>>> {
        let organization = self.organization(organization_id).await?;
        let state = organization.lock().await;
        Ok(state
            .inventory
            .list_apis(organization_id)
            .into_iter()
            .filter_map(|(api_id, _)| {
                state
                    .routes
                    .get(organization_id, api_id)
                    .map(|routes| (api_id.to_string(), routes.to_vec()))
            })
            .collect())
    }

    /// Identifiers of every organization with state
    pub async fn organization_ids(&self) -> Vec<String> {
        let organizations = self.organizations.read().await;
        let mut ids: Vec<String> = organizations.keys().cloned().collect();
        ids.sort();
        ids
    }

    /// Get count of organizations with state
    pub async fn organization_count(&self) -> usize {
        let organizations = self.organizations.read().await;
        organizations.len()
    }

    async fn organization(&self, organization_id: &str) -> Result<Arc<Mutex<OrganizationState>>> {
        let organizations = self.organizations.read().await;
        organizations
            .get(organization_id)
            .cloned()
            .ok_or_else(|| CoreError::OrganizationNotFound(organization_id.to_string()))
    }

    async fn organization_or_create(&self, organization_id: &str) -> Arc<Mutex<OrganizationState>> {
        if let Ok(organization) = self.organization(organization_id).await {
            return organization;
        }
        let mut organizations = self.organizations.write().await;
        organizations
            .entry(organization_id.to_string())
            .or_insert_with(|| {
                debug!("Created version routing state for {}", organization_id);
                Arc::new(Mutex::new(OrganizationState::new(self.metrics.clone())))
            })
            .clone()
    }
}

impl Default for RoutingRegistry {
    fn default() -> Self {
        Self::new(RoutingMetrics::default())
    }
}

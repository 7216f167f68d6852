//! Read access to deployed APIs and write access to their routes

use router_api::{ApiDefinition, Route, RouteRegex};
use std::collections::{BTreeMap, HashMap};

/// Deployed APIs of each organization
pub trait ApiInventory {
    /// Every API of an organization as (api identifier, definition)
    fn list_apis(&self, organization_id: &str) -> Vec<(&str, &ApiDefinition)>;
}

/// Routes of each deployed API, rewritable in place
pub trait RouteSet {
    type Route: RouteRegex;

    /// Routes of one API. Empty when the API has none.
    fn routes_mut(&mut self, organization_id: &str, api_id: &str) -> &mut [Self::Route];
}

/// Inventory backed by ordered maps
#[derive(Clone, Debug, Default)]
pub struct InMemoryInventory {
    apis: HashMap<String, BTreeMap<String, ApiDefinition>>,
}

impl InMemoryInventory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register or update an API
    pub fn insert(&mut self, organization_id: &str, api_id: &str, api: ApiDefinition) {
        self.apis
            .entry(organization_id.to_string())
            .or_default()
            .insert(api_id.to_string(), api);
    }

    pub fn get(&self, organization_id: &str, api_id: &str) -> Option<&ApiDefinition> {
        self.apis.get(organization_id)?.get(api_id)
    }

    pub fn remove(&mut self, organization_id: &str, api_id: &str) -> Option<ApiDefinition> {
        let apis = self.apis.get_mut(organization_id)?;
        let removed = apis.remove(api_id);
        if apis.is_empty() {
            self.apis.remove(organization_id);
        }
        removed
    }

    pub fn len(&self) -> usize {
        self.apis.values().map(BTreeMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl ApiInventory for InMemoryInventory {
    fn list_apis(&self, organization_id: &str) -> Vec<(&str, &ApiDefinition)> {
        self.apis
            .get(organization_id)
            .map(|apis| apis.iter().map(|(id, api)| (id.as_str(), api)).collect())
            .unwrap_or_default()
    }
}

/// Route storage keyed by organization and API identifier
#[derive(Clone, Debug, Default)]
pub struct RouteTable {
    routes: HashMap<String, HashMap<String, Vec<Route>>>,
}

impl RouteTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace all routes of an API
    pub fn insert(&mut self, organization_id: &str, api_id: &str, routes: Vec<Route>) {
        self.routes
            .entry(organization_id.to_string())
            .or_default()
            .insert(api_id.to_string(), routes);
    }

    pub fn get(&self, organization_id: &str, api_id: &str) -> Option<&[Route]> {
        self.routes
            .get(organization_id)?
            .get(api_id)
            .map(Vec::as_slice)
    }

    pub fn remove(&mut self, organization_id: &str, api_id: &str) -> Option<Vec<Route>> {
        let apis = self.routes.get_mut(organization_id)?;
        let removed = apis.remove(api_id);
        if apis.is_empty() {
            self.routes.remove(organization_id);
        }
        removed
    }
}

impl RouteSet for RouteTable {
    type Route = Route;

    fn routes_mut(&mut self, organization_id: &str, api_id: &str) -> &mut [Route] {
        match self
            .routes
            .get_mut(organization_id)
            .and_then(|apis| apis.get_mut(api_id))
        {
            Some(routes) => routes.as_mut_slice(),
            None => &mut [],
        }
    }
}

//! API lifecycle notifications consumed by the version routing control plane

use crate::{ApiDefinition, Route};
use serde::{Deserialize, Serialize};

/// An API was created, updated or deleted
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum LifecycleEvent {
    /// API created or updated, together with its freshly generated routes
    #[serde(rename_all = "camelCase")]
    Upsert {
        organization_id: String,
        api_id: String,
        api: ApiDefinition,
        #[serde(default)]
        routes: Vec<Route>,
    },
    /// API removed from the gateway
    #[serde(rename_all = "camelCase")]
    Delete {
        organization_id: String,
        api_id: String,
    },
}

impl LifecycleEvent {
    pub fn organization_id(&self) -> &str {
        match self {
            LifecycleEvent::Upsert { organization_id, .. } => organization_id,
            LifecycleEvent::Delete { organization_id, .. } => organization_id,
        }
    }

    pub fn api_id(&self) -> &str {
        match self {
            LifecycleEvent::Upsert { api_id, .. } => api_id,
            LifecycleEvent::Delete { api_id, .. } => api_id,
        }
    }
}

//! Replays lifecycle events through the routing registry

use anyhow::{Context, Result};
use router_api::{LifecycleEvent, Route};
use router_core::{EventOutcome, RoutingRegistry};
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::Path;
use tracing::{debug, info, warn};

/// Route table of every organization after the replay
#[derive(Debug, Default, Serialize)]
pub struct RouteReport {
    pub organizations: BTreeMap<String, BTreeMap<String, Vec<Route>>>,
}

/// Read a JSON array of lifecycle events
pub fn load_events(path: &Path) -> Result<Vec<LifecycleEvent>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read events file {}", path.display()))?;
    parse_events(&content)
}

pub fn parse_events(content: &str) -> Result<Vec<LifecycleEvent>> {
    serde_json::from_str(content).context("Failed to parse lifecycle events")
}

/// Apply events in order. Events that fail are logged and skipped.
pub async fn replay(registry: &RoutingRegistry, events: Vec<LifecycleEvent>) -> Result<RouteReport> {
    let total = events.len();
    let mut applied = 0;

    for event in events {
        let organization_id = event.organization_id().to_string();
        let api_id = event.api_id().to_string();
        match registry.apply(event).await {
            Ok(EventOutcome::Upserted(outcome)) => {
                debug!("Upserted {}/{}: {:?}", organization_id, api_id, outcome);
                applied += 1;
            }
            Ok(EventOutcome::Deleted(outcome)) => {
                debug!("Deleted {}/{}: {:?}", organization_id, api_id, outcome);
                applied += 1;
            }
            Err(e) => warn!("Ignoring event for {}/{}: {}", organization_id, api_id, e),
        }
    }
    info!("Applied {} of {} lifecycle events", applied, total);

    let mut report = RouteReport::default();
    for organization_id in registry.organization_ids().await {
        let routes = registry.route_snapshot(&organization_id).await?;
        report
            .organizations
            .insert(organization_id, routes.into_iter().collect());
    }
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;

    const EVENTS: &str = r#"[
        {"type": "upsert", "organizationId": "acme", "apiId": "pets-1", "api": {"title": "PetStore", "version": "v1.0.0", "vhost": "gw"},
         "routes": [{"name": "pets", "match": {"safeRegex": "^/petstore/v1\\.0\\.0/pets"}, "action": {"cluster": "pets-1"}}]},
        {"type": "upsert", "organizationId": "acme", "apiId": "pets-2", "api": {"title": "PetStore", "version": "v1.1.0", "vhost": "gw"},
         "routes": [{"name": "pets", "match": {"safeRegex": "^/petstore/v1\\.1\\.0/pets"}, "action": {"cluster": "pets-2"}}]},
        {"type": "delete", "organizationId": "acme", "apiId": "unknown"},
        {"type": "delete", "organizationId": "acme", "apiId": "pets-2"}
    ]"#;

    #[tokio::test]
    async fn test_replay_events() {
        let registry = RoutingRegistry::default();
        let events = parse_events(EVENTS).unwrap();
        assert_eq!(events.len(), 4);

        let report = replay(&registry, events).await.unwrap();
        let acme = &report.organizations["acme"];
        assert_eq!(acme.len(), 1);
        assert_eq!(
            acme["pets-1"][0].r#match.safe_regex,
            "^/petstore/v1(?:\\.0(?:\\.0)?)?/pets"
        );
    }

    #[test]
    fn test_parse_events_rejects_garbage() {
        assert!(parse_events("{\"type\": \"rename\"}").is_err());
    }
}

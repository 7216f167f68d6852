//! Prometheus metrics for version routing

use anyhow::Result;
use prometheus::{Counter, CounterVec, Encoder, Opts, Registry, TextEncoder};
use std::sync::Arc;

/// Counters describing how lifecycle events changed range ownership
#[derive(Clone)]
pub struct RoutingMetrics {
    /// API create/update events handled
    pub upserts_total: Counter,
    /// API delete events handled
    pub deletes_total: Counter,
    /// Events skipped because the API version could not be parsed
    pub unversioned_total: Counter,
    /// Route fields rewritten, by direction (widen or narrow)
    pub route_rewrites_total: CounterVec,
    /// Holders promoted after a delete, by slot (major or minor)
    pub promotions_total: CounterVec,
    /// Prometheus registry for metrics
    pub registry: Arc<Registry>,
}

impl RoutingMetrics {
    pub fn new() -> crate::Result<Self> {
        let registry = Arc::new(Registry::new());

        let upserts_total = Counter::new(
            "version_routing_upserts_total",
            "Total API create/update events handled",
        )?;

        let deletes_total = Counter::new(
            "version_routing_deletes_total",
            "Total API delete events handled",
        )?;

        let unversioned_total = Counter::new(
            "version_routing_unversioned_total",
            "Events ignored because the API version is not a semantic version",
        )?;

        let route_rewrites_total = CounterVec::new(
            Opts::new(
                "version_routing_route_rewrites_total",
                "Route regex fields rewritten by direction",
            ),
            &["direction"],
        )?;

        let promotions_total = CounterVec::new(
            Opts::new(
                "version_routing_promotions_total",
                "Range holders promoted after a delete by slot",
            ),
            &["slot"],
        )?;

        registry.register(Box::new(upserts_total.clone()))?;
        registry.register(Box::new(deletes_total.clone()))?;
        registry.register(Box::new(unversioned_total.clone()))?;
        registry.register(Box::new(route_rewrites_total.clone()))?;
        registry.register(Box::new(promotions_total.clone()))?;

        Ok(Self {
            upserts_total,
            deletes_total,
            unversioned_total,
            route_rewrites_total,
            promotions_total,
            registry,
        })
    }

    pub(crate) fn record_widened(&self, fields: usize) {
        self.route_rewrites_total
            .with_label_values(&["widen"])
            .inc_by(fields as f64);
    }

    pub(crate) fn record_narrowed(&self, fields: usize) {
        self.route_rewrites_total
            .with_label_values(&["narrow"])
            .inc_by(fields as f64);
    }

    pub(crate) fn record_promotion(&self, slot: &str) {
        self.promotions_total.with_label_values(&[slot]).inc();
    }

    /// Gather all metrics in Prometheus text format
    pub fn gather(&self) -> Result<String> {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = vec![];
        encoder.encode(&metric_families, &mut buffer)?;
        Ok(String::from_utf8(buffer)?)
    }
}

impl Default for RoutingMetrics {
    fn default() -> Self {
        Self::new().expect("Failed to create default RoutingMetrics")
    }
}

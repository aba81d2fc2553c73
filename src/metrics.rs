//! Prometheus `/metrics` exposer (spec §4.8), grounded on
//! `RisingwaveLabs/risingwave`'s `MetricsManager`.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::State;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::Router;
use prometheus::{Encoder, IntGauge, Opts, Registry, TextEncoder};
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use crate::types::ReplicationStats;

/// Registers the replication counters as `IntGauge`s carrying a fixed
/// `{source, target}` label set and refreshes them from a
/// [`ReplicationStats`] snapshot on every scrape.
pub struct MetricsRegistry {
    registry: Registry,
    stats: Arc<ReplicationStats>,
    schemas_replicated: IntGauge,
    configs_replicated: IntGauge,
    deletes_replicated: IntGauge,
    modes_replicated: IntGauge,
    errors: IntGauge,
    events_processed: IntGauge,
    events_filtered: IntGauge,
    last_offset: IntGauge,
}

impl MetricsRegistry {
    pub fn new(stats: Arc<ReplicationStats>, source: &str, target: &str) -> Result<Self, prometheus::Error> {
        let registry = Registry::new();
        let labels: std::collections::HashMap<String, String> =
            [("source".to_string(), source.to_string()), ("target".to_string(), target.to_string())]
                .into_iter()
                .collect();

        let gauge = |name: &str, help: &str| -> Result<IntGauge, prometheus::Error> {
            let opts = Opts::new(name, help).const_labels(labels.clone());
            let gauge = IntGauge::with_opts(opts)?;
            registry.register(Box::new(gauge.clone()))?;
            Ok(gauge)
        };

        Ok(Self {
            schemas_replicated: gauge("srctl_schemas_replicated", "schemas registered on the target")?,
            configs_replicated: gauge("srctl_configs_replicated", "compatibility configs applied")?,
            deletes_replicated: gauge("srctl_deletes_replicated", "version/subject deletes applied")?,
            modes_replicated: gauge("srctl_modes_replicated", "mode changes applied")?,
            errors: gauge("srctl_errors_total", "failed apply attempts")?,
            events_processed: gauge("srctl_events_processed", "change-log records processed")?,
            events_filtered: gauge("srctl_events_filtered", "change-log records skipped by subject filter")?,
            last_offset: gauge("srctl_last_offset", "last change-log offset processed")?,
            registry,
            stats,
        })
    }

    fn refresh(&self) {
        let snapshot = self.stats.snapshot();
        self.schemas_replicated.set(snapshot.schemas_replicated as i64);
        self.configs_replicated.set(snapshot.configs_replicated as i64);
        self.deletes_replicated.set(snapshot.deletes_replicated as i64);
        self.modes_replicated.set(snapshot.modes_replicated as i64);
        self.errors.set(snapshot.errors as i64);
        self.events_processed.set(snapshot.events_processed as i64);
        self.events_filtered.set(snapshot.events_filtered as i64);
        self.last_offset.set(snapshot.last_offset);
    }

    /// Serves `/metrics` on `addr` until `cancel` fires.
    pub async fn serve(self: Arc<Self>, addr: SocketAddr, cancel: CancellationToken) -> std::io::Result<()> {
        let app = Router::new().route("/metrics", get(scrape)).with_state(self);

        let listener = TcpListener::bind(addr).await?;
        info!(%addr, "metrics exposer listening");

        axum::serve(listener, app)
            .with_graceful_shutdown(async move { cancel.cancelled().await })
            .await
    }
}

async fn scrape(State(metrics): State<Arc<MetricsRegistry>>) -> Response {
    metrics.refresh();

    let encoder = TextEncoder::new();
    let mut buffer = Vec::new();
    let families = metrics.registry.gather();

    if let Err(error) = encoder.encode(&families, &mut buffer) {
        error!(%error, "failed to encode metrics");
        return (http::StatusCode::INTERNAL_SERVER_ERROR, "encode error").into_response();
    }

    (
        [(http::header::CONTENT_TYPE, encoder.format_type().to_string())],
        buffer,
    )
        .into_response()
}

//! Periodic stats reporter (spec §4.8).

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::types::ReplicationStats;

/// Prints a [`StatsSnapshot`](crate::types::StatsSnapshot) at `interval`
/// until `cancel` fires. Intended to be spawned alongside the replicator
/// or cloner.
pub async fn report_periodically(
    stats: Arc<ReplicationStats>,
    interval: Duration,
    cancel: CancellationToken,
) {
    let mut ticker = tokio::time::interval(interval);
    ticker.tick().await;

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                info!(snapshot = ?stats.snapshot(), "final stats");
                return;
            }
            _ = ticker.tick() => {
                info!(snapshot = ?stats.snapshot(), "replication progress");
            }
        }
    }
}

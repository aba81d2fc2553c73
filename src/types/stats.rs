use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};

use serde::Serialize;

/// Shared, lock-free counters updated by a replicator/cloner and read by the
/// periodic reporter and the metrics exposer. Counters never go backwards;
/// snapshot reads are individually relaxed, so a snapshot may show brief
/// skew across fields under concurrent writers.
#[derive(Debug, Default)]
pub struct ReplicationStats {
    schemas_replicated: AtomicU64,
    configs_replicated: AtomicU64,
    deletes_replicated: AtomicU64,
    modes_replicated: AtomicU64,
    errors: AtomicU64,
    events_processed: AtomicU64,
    events_filtered: AtomicU64,
    last_offset: AtomicI64,
    start_time: AtomicI64,
}

impl ReplicationStats {
    pub fn new(start_time_epoch_secs: i64) -> Self {
        let stats = Self::default();
        stats.start_time.store(start_time_epoch_secs, Ordering::Relaxed);
        stats
    }

    pub fn incr_schemas_replicated(&self) {
        self.schemas_replicated.fetch_add(1, Ordering::Relaxed);
    }

    pub fn incr_configs_replicated(&self) {
        self.configs_replicated.fetch_add(1, Ordering::Relaxed);
    }

    pub fn incr_deletes_replicated(&self) {
        self.deletes_replicated.fetch_add(1, Ordering::Relaxed);
    }

    pub fn incr_modes_replicated(&self) {
        self.modes_replicated.fetch_add(1, Ordering::Relaxed);
    }

    pub fn incr_errors(&self) {
        self.errors.fetch_add(1, Ordering::Relaxed);
    }

    pub fn incr_events_processed(&self) {
        self.events_processed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn incr_events_filtered(&self) {
        self.events_filtered.fetch_add(1, Ordering::Relaxed);
    }

    pub fn set_last_offset(&self, offset: i64) {
        self.last_offset.store(offset, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            schemas_replicated: self.schemas_replicated.load(Ordering::Relaxed),
            configs_replicated: self.configs_replicated.load(Ordering::Relaxed),
            deletes_replicated: self.deletes_replicated.load(Ordering::Relaxed),
            modes_replicated: self.modes_replicated.load(Ordering::Relaxed),
            errors: self.errors.load(Ordering::Relaxed),
            events_processed: self.events_processed.load(Ordering::Relaxed),
            events_filtered: self.events_filtered.load(Ordering::Relaxed),
            last_offset: self.last_offset.load(Ordering::Relaxed),
            start_time: self.start_time.load(Ordering::Relaxed),
        }
    }
}

/// A consistent value-copy of [`ReplicationStats`] at one instant.
#[derive(Debug, Clone, Copy, Default, Eq, PartialEq, Serialize)]
pub struct StatsSnapshot {
    pub schemas_replicated: u64,
    pub configs_replicated: u64,
    pub deletes_replicated: u64,
    pub modes_replicated: u64,
    pub errors: u64,
    pub events_processed: u64,
    pub events_filtered: u64,
    pub last_offset: i64,
    pub start_time: i64,
}

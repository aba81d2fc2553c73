//! Continuous Replicator (spec §4.7): created → initial-sync → streaming →
//! stopped, tailing the Change-Log Consumer and applying one event at a
//! time, strictly in bus offset order.

mod dispatch;

use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::api::SchemaRegistryAPI;
use crate::bus::ChangeLogConsumer;
use crate::clone::{clone_registry, ClonerConfig};
use crate::error::ReplicatorError;
use crate::types::{Mode, ReplicationStats};

pub use dispatch::SubjectFilter;

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
#[repr(u8)]
pub enum ReplicatorState {
    Created = 0,
    InitialSync = 1,
    Streaming = 2,
    Stopped = 3,
}

impl From<u8> for ReplicatorState {
    fn from(value: u8) -> Self {
        match value {
            1 => ReplicatorState::InitialSync,
            2 => ReplicatorState::Streaming,
            3 => ReplicatorState::Stopped,
            _ => ReplicatorState::Created,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ReplicatorConfig {
    pub preserve_ids: bool,
    pub no_initial_sync: bool,
    pub subject_filter: Option<SubjectFilter>,
    pub cloner: ClonerConfig,
}

impl Default for ReplicatorConfig {
    fn default() -> Self {
        Self {
            preserve_ids: true,
            no_initial_sync: false,
            subject_filter: None,
            cloner: ClonerConfig::default(),
        }
    }
}

/// Shared state handle so a caller can observe the replicator's stage
/// (e.g. to expose it alongside the stats reporter).
pub struct ReplicatorHandle {
    state: AtomicU8,
}

impl ReplicatorHandle {
    fn new() -> Self {
        Self {
            state: AtomicU8::new(ReplicatorState::Created as u8),
        }
    }

    pub fn state(&self) -> ReplicatorState {
        ReplicatorState::from(self.state.load(Ordering::Relaxed))
    }

    fn set(&self, state: ReplicatorState) {
        self.state.store(state as u8, Ordering::Relaxed);
    }
}

impl Default for ReplicatorHandle {
    fn default() -> Self {
        Self::new()
    }
}

/// Runs the replicator to completion (i.e. until `cancel` fires). `source`
/// is only used for the initial bulk clone; the streaming stage is driven
/// entirely by the change-log.
pub async fn run<A>(
    source: Arc<A>,
    target: Arc<A>,
    bus: ChangeLogConsumer,
    config: ReplicatorConfig,
    cancel: CancellationToken,
    stats: Arc<ReplicationStats>,
    handle: Arc<ReplicatorHandle>,
) -> Result<(), ReplicatorError>
where
    A: SchemaRegistryAPI + ?Sized + 'static,
{
    if !config.no_initial_sync {
        handle.set(ReplicatorState::InitialSync);

        if let Err(error) = clone_registry(
            source.clone(),
            target.clone(),
            config.cloner,
            cancel.clone(),
            stats.clone(),
        )
        .await
        {
            warn!(%error, "initial sync reported errors, continuing to streaming");
        }
    }

    handle.set(ReplicatorState::Streaming);

    if config.preserve_ids {
        target.update_global_resource_mode(Mode::Import, true).await.ok();
    }

    let result = stream(target.as_ref(), &bus, &config, &cancel, stats.as_ref()).await;

    handle.set(ReplicatorState::Stopped);

    if config.preserve_ids {
        if let Err(error) = target.update_global_resource_mode(Mode::ReadWrite, true).await {
            warn!(%error, "failed to restore global READWRITE mode on shutdown");
        }
    }

    info!(snapshot = ?stats.snapshot(), "replicator stopped");

    result
}

async fn stream<A>(
    target: &A,
    bus: &ChangeLogConsumer,
    config: &ReplicatorConfig,
    cancel: &CancellationToken,
    stats: &ReplicationStats,
) -> Result<(), ReplicatorError>
where
    A: SchemaRegistryAPI + ?Sized,
{
    loop {
        if cancel.is_cancelled() {
            return Ok(());
        }

        let event = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Ok(()),
            event = bus.next() => event?,
        };

        let Some(event) = event else {
            continue;
        };

        stats.set_last_offset(event.offset());
        stats.incr_events_processed();

        if dispatch::is_filtered(&event, config.subject_filter.as_ref()) {
            stats.incr_events_filtered();
            continue;
        }

        match dispatch::apply(target, config.preserve_ids, &event, stats).await {
            Ok(()) => {}
            Err(error) if error.is_idempotent() => {
                info!(offset = event.offset(), "idempotent no-op on replay");
            }
            Err(error) => {
                stats.incr_errors();
                warn!(offset = event.offset(), %error, "failed to apply change event");
            }
        }
    }
}

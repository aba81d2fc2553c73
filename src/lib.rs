mod api;
mod backup;
mod bus;
mod client;
mod clone;
mod config;
mod context;
mod dangling;
mod error;
mod metrics;
mod replicate;
mod splitter;
mod stats;
mod types;
mod walker;
mod workers;

mod prelude {
    pub use crate::api::SchemaRegistryAPI;
    pub use crate::backup::manifest::{Manifest, SubjectBackup, VersionBackup};
    pub use crate::backup::{backup, restore, BackupConfig, RestoreConfig};
    pub use crate::bus::{BusConfig, ChangeLogConsumer, SaslConfig, SaslMechanism, TlsConfig};
    pub use crate::client::config::SchemaRegistryConfig;
    pub use crate::client::SchemaRegistryClient;
    pub use crate::clone::{clone_registry, ClonerConfig};
    pub use crate::config::{resolve_registry, KafkaProfile, RegistryProfile, ResolvedRegistry, SrctlConfig};
    pub use crate::dangling::{scan as scan_dangling, DanglingScannerConfig};
    pub use crate::error::{BusError, ParseError, ReplicatorError, SchemaRegistryError};
    pub use crate::metrics::MetricsRegistry;
    pub use crate::replicate::{run as run_replicator, ReplicatorConfig, ReplicatorHandle, ReplicatorState, SubjectFilter};
    pub use crate::splitter::{split, SplitConfig};
    pub use crate::stats::report_periodically;
    pub use crate::types::{
        ChangeEvent, CompatibilityLevel, DanglingReason, DanglingReference, ExtractedType, Mode,
        Reference, ReplicationStats, Schema, SchemaType, SplitResult, StatsSnapshot, StringSchema,
        Subject, SubjectVersion, Tag, TagAssignment, UnregisteredSchema, Version,
    };
    pub use crate::walker::{walk, SchemaNode, WalkResult};
    pub use crate::workers::{run_pool, WorkerPoolConfig};
}

pub use prelude::*;

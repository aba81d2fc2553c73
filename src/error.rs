use std::error::Error as StdError;
use std::io;

use reqwest::header::{InvalidHeaderName, InvalidHeaderValue};
use thiserror::Error as ThisError;

pub type BoxError = Box<dyn StdError + Send + Sync>;

/// Substrings the registry is known to embed in 409 bodies for conditions
/// that every core caller (cloner, replicator, restore, tag-cloning) treats
/// as success rather than failure.
const IDEMPOTENT_CONFLICT_MARKERS: &[&str] =
    &["already exists", "already registered", "already deleted"];

/// True when an upstream error body indicates a conflict that the caller
/// asked for anyway (re-registering the same schema, re-deleting an already
/// soft-deleted version, ...). Cloner/replicator/restore treat this as a
/// no-op rather than a failure.
pub fn is_idempotent_conflict(body: &str) -> bool {
    let lower = body.to_ascii_lowercase();
    IDEMPOTENT_CONFLICT_MARKERS
        .iter()
        .any(|marker| lower.contains(marker))
}

#[derive(Debug, ThisError)]
pub enum ConfigurationError {
    #[error("Error parsing header name: {source}")]
    InvalidHeaderName {
        #[from]
        source: InvalidHeaderName,
    },

    #[error("Error parsing header value: {source}")]
    InvalidHeaderValue {
        #[from]
        source: InvalidHeaderValue,
    },

    #[error("Error applying authentication header: {source}")]
    Io {
        #[from]
        source: io::Error,
    },

    #[error("Error configuring proxy: {source}")]
    Proxy {
        #[from]
        source: reqwest::Error,
    },

    #[error("Missing required configuration: {message}")]
    Missing { message: String },
}

#[derive(Debug, ThisError)]
pub enum HttpCallError {
    #[error("Error parsing Schema Registry response '{body}' into '{target}': {source}")]
    JsonParse {
        body: String,
        target: &'static str,
        source: BoxError,
    },

    #[error("Upstream error: {url} returned {status}: {body}")]
    UpstreamError {
        url: String,
        status: u16,
        body: String,
    },

    #[error("Unexpected HTTP Call error: {source}")]
    Unexpected {
        #[from]
        source: reqwest::Error,
    },
}

impl HttpCallError {
    /// `true` for a 404 on a GET — callers fold this into "no references to
    /// consider" rather than a fault.
    pub fn is_not_found(&self) -> bool {
        matches!(self, HttpCallError::UpstreamError { status, .. } if *status == 404)
    }

    /// `true` for a 409 whose body matches a known idempotent marker.
    pub fn is_idempotent_conflict(&self) -> bool {
        matches!(
            self,
            HttpCallError::UpstreamError { status, body, .. }
                if *status == 409 && is_idempotent_conflict(body)
        )
    }
}

#[derive(Debug, ThisError)]
pub enum SchemaRegistryError {
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),

    #[error(transparent)]
    HttpCall(#[from] HttpCallError),

    #[error("Error parsing invalid schema type: {message}")]
    InvalidSchemaType { message: String },

    #[error("Error parsing compatibility level: {message}")]
    InvalidCompatibilityLevel { message: String },

    #[error("attempted to register id {id} against subject '{subject}' outside IMPORT mode")]
    ModeViolation { subject: String, id: u32 },

    #[error("Error: {0}")]
    Other(BoxError),
}

impl SchemaRegistryError {
    pub fn invalid_schema_type<T: ToString>(s: T) -> Self {
        SchemaRegistryError::InvalidSchemaType {
            message: s.to_string(),
        }
    }

    /// `true` for a not-found or an idempotent-conflict HTTP response.
    pub fn is_idempotent(&self) -> bool {
        matches!(self, SchemaRegistryError::HttpCall(inner) if inner.is_idempotent_conflict())
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, SchemaRegistryError::HttpCall(inner) if inner.is_not_found())
    }
}

/// Transport-level failures talking to the change-log bus.
#[derive(Debug, ThisError)]
pub enum BusError {
    #[error("Kafka client error: {source}")]
    Client {
        #[from]
        source: rdkafka::error::KafkaError,
    },

    #[error("Kafka consumer configuration error: {message}")]
    Configuration { message: String },

    #[error("bus poll timed out waiting for cancellation")]
    PollTimeout,
}

/// Malformed event key/value, manifest, or schema body.
#[derive(Debug, ThisError)]
pub enum ParseError {
    #[error("malformed change-log key: {message}")]
    ChangeKey { message: String },

    #[error("malformed change-log value: {message}")]
    ChangeValue { message: String },

    #[error("malformed schema body ({schema_type}): {message}")]
    SchemaBody {
        schema_type: &'static str,
        message: String,
    },

    #[error("malformed backup manifest: {message}")]
    Manifest { message: String },

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

/// Top-level error returned by every public function in the replication,
/// cloning, splitting, scanning, and backup modules.
#[derive(Debug, ThisError)]
pub enum ReplicatorError {
    #[error(transparent)]
    SchemaRegistry(#[from] SchemaRegistryError),

    #[error(transparent)]
    Bus(#[from] BusError),

    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error(transparent)]
    Io(#[from] io::Error),

    #[error("operation cancelled")]
    Cancelled,
}

impl ReplicatorError {
    pub fn is_idempotent(&self) -> bool {
        matches!(self, ReplicatorError::SchemaRegistry(inner) if inner.is_idempotent())
    }
}

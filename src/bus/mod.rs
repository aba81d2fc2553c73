//! Change-Log Consumer (spec §4.2): a lazy, offset-ordered view over the
//! registry's `_schemas` topic, built on `rdkafka`'s `StreamConsumer`
//! (grounded on `dustin10/kaftui`'s `kafka.rs` `ClientConfig`/
//! `StreamConsumer` usage).

pub mod config;

use rdkafka::consumer::{Consumer, StreamConsumer};
use rdkafka::Message;

use crate::error::{BusError, ParseError};
use crate::types::{ChangeEvent, ChangeKey, ChangeKeyType};
pub use config::{BusConfig, SaslConfig, SaslMechanism, TlsConfig};

/// One decoded, offset-stamped record from the change-log.
pub struct ChangeLogConsumer {
    consumer: StreamConsumer,
    topic: String,
    poll_timeout: std::time::Duration,
}

impl ChangeLogConsumer {
    pub fn new(config: &BusConfig) -> Result<Self, BusError> {
        let consumer: StreamConsumer = config.build()?.create()?;
        consumer.subscribe(&[config.topic.as_str()])?;

        Ok(Self {
            consumer,
            topic: config.topic.clone(),
            poll_timeout: config.poll_timeout,
        })
    }

    /// Polls the bus for the next record, bounded by the configured
    /// poll timeout so callers remain responsive to cancellation even
    /// when the topic is idle. Returns `Ok(None)` on a poll timeout.
    pub async fn next(&self) -> Result<Option<ChangeEvent>, BusError> {
        let message = match tokio::time::timeout(self.poll_timeout, self.consumer.recv()).await {
            Ok(result) => result?,
            Err(_) => return Ok(None),
        };

        let offset = message.offset();
        let key = message.key().unwrap_or_default();
        let value = message.payload();

        let event = decode(key, value, offset).map_err(|error| {
            tracing::warn!(topic = %self.topic, offset, %error, "failed to decode change-log record");
            error
        });

        match event {
            Ok(event) => Ok(Some(event)),
            Err(_) => Ok(Some(ChangeEvent::Noop { offset })),
        }
    }

    pub fn topic(&self) -> &str {
        &self.topic
    }
}

fn decode(key: &[u8], value: Option<&[u8]>, offset: i64) -> Result<ChangeEvent, ParseError> {
    let key: ChangeKey = serde_json::from_slice(key).map_err(|error| ParseError::ChangeKey {
        message: error.to_string(),
    })?;

    let value: Option<serde_json::Value> = match value {
        Some(bytes) if !bytes.is_empty() => {
            let parsed = serde_json::from_slice(bytes).map_err(|error| ParseError::ChangeValue {
                message: error.to_string(),
            })?;
            Some(parsed)
        }
        _ => None,
    };

    let event = match key.keytype {
        ChangeKeyType::Schema => ChangeEvent::Schema {
            subject: key.subject.unwrap_or_default(),
            version: key.version.unwrap_or_default(),
            value,
            offset,
        },
        ChangeKeyType::DeleteSubject => ChangeEvent::DeleteSubject {
            subject: key.subject.unwrap_or_default(),
            offset,
        },
        ChangeKeyType::ClearSubject => ChangeEvent::ClearSubject {
            subject: key.subject.unwrap_or_default(),
            offset,
        },
        ChangeKeyType::Config => ChangeEvent::Config {
            subject: key.subject,
            value,
            offset,
        },
        ChangeKeyType::Mode => ChangeEvent::Mode {
            subject: key.subject,
            value,
            offset,
        },
        ChangeKeyType::Noop => ChangeEvent::Noop { offset },
    };

    Ok(event)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_schema_tombstone_as_version_delete() {
        let key = br#"{"keytype":"SCHEMA","subject":"orders-value","version":3,"magic":1}"#;
        let event = decode(key, None, 42).unwrap();

        assert_eq!(
            event,
            ChangeEvent::Schema {
                subject: "orders-value".to_string(),
                version: 3,
                value: None,
                offset: 42,
            }
        );
    }

    #[test]
    fn decodes_noop() {
        let key = br#"{"keytype":"NOOP"}"#;
        let event = decode(key, None, 7).unwrap();

        assert_eq!(event, ChangeEvent::Noop { offset: 7 });
    }

    #[test]
    fn rejects_malformed_key() {
        let key = b"not json";
        assert!(decode(key, None, 0).is_err());
    }
}

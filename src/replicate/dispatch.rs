//! Maps one decoded [`ChangeEvent`] to a target-registry action (spec §4.7's
//! keytype table) plus the subject-name glob filter.

use crate::api::SchemaRegistryAPI;
use crate::error::SchemaRegistryError;
use crate::types::{
    ChangeEvent, ClusterConfig, Mode, ReplicationStats, SubjectConfig, UnregisteredSchema, Version,
};

/// A simple glob over subject names: `*` matches any run of characters,
/// everything else is matched literally. Good enough for the common
/// `orders-*` / `*-value` shapes operators write; not a full glob engine.
#[derive(Debug, Clone)]
pub struct SubjectFilter {
    pattern: String,
}

impl SubjectFilter {
    pub fn new(pattern: impl Into<String>) -> Self {
        Self {
            pattern: pattern.into(),
        }
    }

    fn matches(&self, subject: &str) -> bool {
        let mut parts = self.pattern.split('*');
        let Some(first) = parts.next() else {
            return true;
        };

        let Some(rest) = subject.strip_prefix(first) else {
            return false;
        };

        let mut cursor = rest;
        for part in parts {
            if part.is_empty() {
                continue;
            }

            match cursor.find(part) {
                Some(index) => cursor = &cursor[index + part.len()..],
                None => return false,
            }
        }

        true
    }
}

/// Global CONFIG/MODE events (empty subject) are never filtered.
pub fn is_filtered(event: &ChangeEvent, filter: Option<&SubjectFilter>) -> bool {
    let Some(filter) = filter else {
        return false;
    };

    match event.subject() {
        Some(subject) => !filter.matches(subject),
        None => false,
    }
}

pub async fn apply<A>(
    target: &A,
    preserve_ids: bool,
    event: &ChangeEvent,
    stats: &ReplicationStats,
) -> Result<(), SchemaRegistryError>
where
    A: SchemaRegistryAPI + ?Sized,
{
    match event {
        ChangeEvent::Schema {
            subject,
            version,
            value: None,
            ..
        } => {
            target
                .delete_subject_version(subject, Version::Number(*version), false)
                .await?;
            stats.incr_deletes_replicated();
        }
        ChangeEvent::Schema {
            subject,
            value: Some(value),
            ..
        } => {
            apply_schema(target, preserve_ids, subject, value).await?;
            stats.incr_schemas_replicated();
        }
        ChangeEvent::DeleteSubject { subject, .. } => {
            target.delete_subject(subject, false).await?;
            stats.incr_deletes_replicated();
        }
        ChangeEvent::ClearSubject { subject, .. } => {
            target.delete_subject(subject, true).await?;
            stats.incr_deletes_replicated();
        }
        ChangeEvent::Config { subject, value, .. } => {
            apply_config(target, subject.as_deref(), value.as_ref()).await?;
            stats.incr_configs_replicated();
        }
        ChangeEvent::Mode { subject, value, .. } => {
            apply_mode(target, preserve_ids, subject.as_deref(), value.as_ref()).await?;
            stats.incr_modes_replicated();
        }
        ChangeEvent::Noop { .. } => {}
    }

    Ok(())
}

async fn apply_schema<A>(
    target: &A,
    preserve_ids: bool,
    subject: &str,
    value: &serde_json::Value,
) -> Result<(), SchemaRegistryError>
where
    A: SchemaRegistryAPI + ?Sized,
{
    let body = value.get("schema").and_then(|v| v.as_str()).unwrap_or_default();
    let schema_type = value
        .get("schemaType")
        .and_then(|v| v.as_str())
        .and_then(|s| s.parse().ok())
        .unwrap_or_default();
    let id = value.get("id").and_then(|v| v.as_u64()).unwrap_or_default() as u32;

    let mut schema = UnregisteredSchema::schema(body).schema_type(schema_type);
    if preserve_ids {
        schema = schema.id(id);

        target
            .update_subject_resource_mode(subject, Mode::Import, true)
            .await
            .ok();
    }

    target.register_schema(subject, &schema).await?;
    Ok(())
}

async fn apply_config<A>(
    target: &A,
    subject: Option<&str>,
    value: Option<&serde_json::Value>,
) -> Result<(), SchemaRegistryError>
where
    A: SchemaRegistryAPI + ?Sized,
{
    let compatibility_level = value
        .and_then(|v| v.get("compatibilityLevel").or_else(|| v.get("compatibility")))
        .and_then(|v| v.as_str())
        .and_then(|s| s.parse().ok());

    match (subject, compatibility_level) {
        (Some(subject), Some(level)) => {
            let config = SubjectConfig::new().compatibility_level(level);
            target.update_subject_configuration(subject, &config).await?;
        }
        (Some(subject), None) => {
            // CONFIG tombstone: clear the subject-level compatibility override,
            // reverting the subject to the cluster default.
            target.delete_subject_configuration(subject).await?;
        }
        (None, Some(level)) => {
            let config = ClusterConfig::new().compatibility_level(level);
            target.update_configuration(&config).await?;
        }
        (None, None) => {}
    }

    Ok(())
}

async fn apply_mode<A>(
    target: &A,
    preserve_ids: bool,
    subject: Option<&str>,
    value: Option<&serde_json::Value>,
) -> Result<(), SchemaRegistryError>
where
    A: SchemaRegistryAPI + ?Sized,
{
    match (subject, value) {
        (Some(subject), None) => {
            // MODE tombstone: clear the subject-level mode override, reverting
            // the subject to the cluster's global mode.
            target.delete_subject_resource_mode(subject).await?;
        }
        (Some(subject), Some(value)) => {
            let mode = decode_mode(value, preserve_ids);
            target.update_subject_resource_mode(subject, mode, true).await?;
        }
        (None, Some(value)) => {
            let mode = decode_mode(value, preserve_ids);
            target.update_global_resource_mode(mode, true).await?;
        }
        (None, None) => {}
    }

    Ok(())
}

fn decode_mode(value: &serde_json::Value, preserve_ids: bool) -> Mode {
    let mode = value
        .get("mode")
        .and_then(|v| v.as_str())
        .map(|s| match s {
            "READONLY" => Mode::ReadOnly,
            "IMPORT" => Mode::Import,
            _ => Mode::ReadWrite,
        })
        .unwrap_or_default();

    if preserve_ids && mode == Mode::ReadWrite {
        Mode::Import
    } else {
        mode
    }
}

#[cfg(test)]
mod filter_tests {
    use super::*;

    #[test]
    fn prefix_suffix_wildcard_matches() {
        let filter = SubjectFilter::new("orders-*");
        assert!(filter.matches("orders-value"));
        assert!(!filter.matches("customers-value"));
    }

    #[test]
    fn infix_wildcard_matches_both_ends() {
        let filter = SubjectFilter::new("*-value");
        assert!(filter.matches("orders-value"));
        assert!(!filter.matches("orders-key"));
    }

    #[test]
    fn global_events_are_never_filtered() {
        let filter = SubjectFilter::new("orders-*");
        let event = ChangeEvent::Config {
            subject: None,
            value: None,
            offset: 1,
        };
        assert!(!is_filtered(&event, Some(&filter)));
    }

    #[test]
    fn non_matching_subject_is_filtered() {
        let filter = SubjectFilter::new("orders-*");
        let event = ChangeEvent::Schema {
            subject: "customers-value".to_string(),
            version: 1,
            value: None,
            offset: 1,
        };
        assert!(is_filtered(&event, Some(&filter)));
    }
}

#[cfg(all(test, feature = "testing"))]
mod apply_tests {
    use super::*;
    use crate::api::MockSchemaRegistryAPI;
    use crate::error::{HttpCallError, SchemaRegistryError};
    use serde_json::json;

    #[tokio::test]
    async fn schema_tombstone_deletes_the_version() {
        let mut target = MockSchemaRegistryAPI::new();
        target
            .expect_delete_subject_version()
            .returning(|_subject, _version, _permanent| Ok(3));

        let event = ChangeEvent::Schema {
            subject: "orders-value".to_string(),
            version: 3,
            value: None,
            offset: 10,
        };

        let stats = ReplicationStats::new(0);
        apply(&target, true, &event, &stats).await.unwrap();

        assert_eq!(stats.snapshot().deletes_replicated, 1);
        assert_eq!(stats.snapshot().schemas_replicated, 0);
    }

    #[tokio::test]
    async fn schema_value_registers_with_import_mode_when_preserving_ids() {
        let mut target = MockSchemaRegistryAPI::new();
        target
            .expect_update_subject_resource_mode()
            .returning(|_subject, mode, _force| Ok(mode));
        target.expect_register_schema().returning(|subject, schema| {
            assert_eq!(subject, "orders-value");
            assert_eq!(schema.id, Some(7));
            Ok(7)
        });

        let event = ChangeEvent::Schema {
            subject: "orders-value".to_string(),
            version: 1,
            value: Some(json!({"schema": "{\"type\":\"string\"}", "schemaType": "AVRO", "id": 7})),
            offset: 11,
        };

        let stats = ReplicationStats::new(0);
        apply(&target, true, &event, &stats).await.unwrap();

        assert_eq!(stats.snapshot().schemas_replicated, 1);
    }

    #[tokio::test]
    async fn schema_register_then_tombstone_bumps_both_counters() {
        let mut target = MockSchemaRegistryAPI::new();
        target
            .expect_update_subject_resource_mode()
            .returning(|_subject, mode, _force| Ok(mode));
        target.expect_register_schema().returning(|_subject, _schema| Ok(7));
        target
            .expect_delete_subject_version()
            .returning(|_subject, _version, _permanent| Ok(1));

        let stats = ReplicationStats::new(0);

        let register = ChangeEvent::Schema {
            subject: "orders-value".to_string(),
            version: 1,
            value: Some(json!({"schema": "{}", "schemaType": "AVRO", "id": 7})),
            offset: 20,
        };
        apply(&target, true, &register, &stats).await.unwrap();

        let tombstone = ChangeEvent::Schema {
            subject: "orders-value".to_string(),
            version: 1,
            value: None,
            offset: 21,
        };
        apply(&target, true, &tombstone, &stats).await.unwrap();

        let snapshot = stats.snapshot();
        assert_eq!(snapshot.schemas_replicated, 1);
        assert_eq!(snapshot.deletes_replicated, 1);
    }

    #[tokio::test]
    async fn idempotent_register_conflict_is_reported_to_caller() {
        let mut target = MockSchemaRegistryAPI::new();
        target.expect_register_schema().returning(|_subject, _schema| {
            Err(SchemaRegistryError::HttpCall(HttpCallError::UpstreamError {
                url: "http://target".to_string(),
                status: 409,
                body: "Schema already registered".to_string(),
            }))
        });

        let event = ChangeEvent::Schema {
            subject: "orders-value".to_string(),
            version: 1,
            value: Some(json!({"schema": "{}", "schemaType": "AVRO"})),
            offset: 12,
        };

        let stats = ReplicationStats::new(0);
        let error = apply(&target, false, &event, &stats).await.unwrap_err();
        assert!(error.is_idempotent());
    }

    #[tokio::test]
    async fn delete_subject_event_deletes_softly() {
        let mut target = MockSchemaRegistryAPI::new();
        target
            .expect_delete_subject()
            .returning(|_subject, permanent| {
                assert!(!permanent);
                Ok(vec![1, 2])
            });

        let event = ChangeEvent::DeleteSubject {
            subject: "orders-value".to_string(),
            offset: 13,
        };

        let stats = ReplicationStats::new(0);
        apply(&target, false, &event, &stats).await.unwrap();
        assert_eq!(stats.snapshot().deletes_replicated, 1);
    }

    #[tokio::test]
    async fn global_config_event_updates_cluster_compatibility() {
        let mut target = MockSchemaRegistryAPI::new();
        target
            .expect_update_configuration()
            .returning(|config| Ok(config.clone()));

        let event = ChangeEvent::Config {
            subject: None,
            value: Some(json!({"compatibilityLevel": "FULL"})),
            offset: 14,
        };

        let stats = ReplicationStats::new(0);
        apply(&target, false, &event, &stats).await.unwrap();
        assert_eq!(stats.snapshot().configs_replicated, 1);
    }

    #[tokio::test]
    async fn subject_config_tombstone_clears_the_override() {
        let mut target = MockSchemaRegistryAPI::new();
        target
            .expect_delete_subject_configuration()
            .withf(|subject| subject == "orders-value")
            .returning(|_subject| Ok(()));

        let event = ChangeEvent::Config {
            subject: Some("orders-value".to_string()),
            value: None,
            offset: 16,
        };

        let stats = ReplicationStats::new(0);
        apply(&target, false, &event, &stats).await.unwrap();
        assert_eq!(stats.snapshot().configs_replicated, 1);
    }

    #[tokio::test]
    async fn mode_event_escalates_readwrite_to_import_when_preserving_ids() {
        let mut target = MockSchemaRegistryAPI::new();
        target
            .expect_update_subject_resource_mode()
            .returning(|_subject, mode, _force| {
                assert_eq!(mode, Mode::Import);
                Ok(mode)
            });

        let event = ChangeEvent::Mode {
            subject: Some("orders-value".to_string()),
            value: Some(json!({"mode": "READWRITE"})),
            offset: 15,
        };

        let stats = ReplicationStats::new(0);
        apply(&target, true, &event, &stats).await.unwrap();
        assert_eq!(stats.snapshot().modes_replicated, 1);
    }

    #[tokio::test]
    async fn subject_mode_tombstone_clears_the_override_instead_of_forcing_import() {
        let mut target = MockSchemaRegistryAPI::new();
        target
            .expect_delete_subject_resource_mode()
            .withf(|subject| subject == "orders-value")
            .returning(|_subject| Ok(()));

        let event = ChangeEvent::Mode {
            subject: Some("orders-value".to_string()),
            value: None,
            offset: 17,
        };

        let stats = ReplicationStats::new(0);
        apply(&target, true, &event, &stats).await.unwrap();
        assert_eq!(stats.snapshot().modes_replicated, 1);
    }
}

//! Bulk Cloner (spec §4.6): collect, order, apply.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::api::SchemaRegistryAPI;
use crate::error::ReplicatorError;
use crate::types::{CompatibilityLevel, Mode, ReplicationStats, SubjectConfig, Tag, UnregisteredSchema, Version};
use crate::workers::{run_pool, WorkerPoolConfig};

#[derive(Debug, Clone, Copy)]
pub struct ClonerConfig {
    pub worker_pool: WorkerPoolConfig,
    pub preserve_ids: bool,
    pub include_compatibility: bool,
    pub clone_tags: bool,
}

impl Default for ClonerConfig {
    fn default() -> Self {
        Self {
            worker_pool: WorkerPoolConfig::default(),
            preserve_ids: true,
            include_compatibility: true,
            clone_tags: true,
        }
    }
}

#[derive(Debug, Clone)]
struct PlannedVersion {
    version: u32,
    schema: UnregisteredSchema,
}

#[derive(Debug, Clone)]
struct PlannedSubject {
    subject: String,
    compatibility: Option<CompatibilityLevel>,
    versions: Vec<PlannedVersion>,
}

/// Fetches every (subject, version) in `source`, recursively pulling in any
/// cross-subject reference that falls outside the initially enumerated
/// subject list, until the closure is fixed.
async fn collect_plan<A>(
    source: &A,
    preserve_ids: bool,
    include_compatibility: bool,
) -> Result<Vec<PlannedSubject>, ReplicatorError>
where
    A: SchemaRegistryAPI + ?Sized,
{
    let mut plans: BTreeMap<String, PlannedSubject> = BTreeMap::new();
    let mut pending: Vec<String> = source.get_subjects(false).await?;
    let mut seen: BTreeSet<String> = BTreeSet::new();

    while let Some(subject) = pending.pop() {
        if !seen.insert(subject.clone()) {
            continue;
        }

        let mut versions = source.get_subject_versions(&subject, false).await?;
        versions.sort_unstable();

        let compatibility = if include_compatibility {
            source
                .get_subject_configuration(&subject)
                .await
                .ok()
                .and_then(|c| c.compatibility_level)
        } else {
            None
        };

        let mut planned_versions = Vec::with_capacity(versions.len());
        for version in versions {
            let subject_version = source
                .get_subject_version(&subject, Version::Number(version))
                .await?;

            for reference in subject_version.references.iter().flatten() {
                if !seen.contains(&reference.subject) {
                    pending.push(reference.subject.clone());
                }
            }

            let mut schema = UnregisteredSchema::schema(subject_version.schema.to_string())
                .schema_type(subject_version.schema_type)
                .references(subject_version.references.clone().unwrap_or_default());

            if preserve_ids {
                schema = schema.id(subject_version.id);
            }

            planned_versions.push(PlannedVersion { version, schema });
        }

        plans.insert(
            subject.clone(),
            PlannedSubject {
                subject,
                compatibility,
                versions: planned_versions,
            },
        );
    }

    Ok(plans.into_values().collect())
}

async fn apply_subject<A>(
    target: &A,
    stats: &ReplicationStats,
    preserve_ids: bool,
    plan: PlannedSubject,
) where
    A: SchemaRegistryAPI + ?Sized,
{
    if let Some(compatibility) = plan.compatibility {
        let config = SubjectConfig::new().compatibility_level(compatibility);
        if let Err(error) = target.update_subject_configuration(&plan.subject, &config).await {
            warn!(subject = %plan.subject, %error, "failed to set subject compatibility, continuing");
        }
    }

    if preserve_ids {
        if let Err(error) = target
            .update_subject_resource_mode(&plan.subject, Mode::Import, true)
            .await
        {
            warn!(subject = %plan.subject, %error, "failed to set subject IMPORT mode, IDs may not be preserved");
        }
    }

    for planned in plan.versions {
        match target.register_schema(&plan.subject, &planned.schema).await {
            Ok(_) => stats.incr_schemas_replicated(),
            Err(error) if error.is_idempotent() => {
                info!(subject = %plan.subject, version = planned.version, "schema already present, skipping");
            }
            Err(error) => {
                stats.incr_errors();
                warn!(subject = %plan.subject, version = planned.version, %error, "failed to register schema");
            }
        }
    }

    if preserve_ids {
        if let Err(error) = target
            .update_subject_resource_mode(&plan.subject, Mode::ReadWrite, true)
            .await
        {
            warn!(subject = %plan.subject, %error, "failed to restore subject to READWRITE");
        }
    }
}

async fn clone_tags<A>(source: &A, target: &A, plans: &[PlannedSubject])
where
    A: SchemaRegistryAPI + ?Sized,
{
    let definitions = match source.list_tags().await {
        Ok(tags) => tags,
        Err(error) => {
            warn!(%error, "failed to list tag definitions, skipping tag clone");
            return;
        }
    };

    for tag in &definitions {
        if let Err(error) = target.create_tag(tag).await {
            if !error.is_idempotent() {
                warn!(tag = %tag.name, %error, "failed to create tag definition");
            }
        }
    }

    for plan in plans {
        if let Ok(assignments) = source.list_subject_tags(&plan.subject).await {
            for assignment in assignments {
                if let Err(error) = target.assign_tag(&assignment).await {
                    if !error.is_idempotent() {
                        warn!(subject = %plan.subject, %error, "failed to assign subject tag");
                    }
                }
            }
        }

        for planned in &plan.versions {
            if let Ok(assignments) = source
                .list_version_tags(&plan.subject, Version::Number(planned.version))
                .await
            {
                for assignment in assignments {
                    if let Err(error) = target.assign_tag(&assignment).await {
                        if !error.is_idempotent() {
                            warn!(subject = %plan.subject, version = planned.version, %error, "failed to assign version tag");
                        }
                    }
                }
            }
        }
    }

    let _: Vec<Tag> = definitions;
}

pub async fn clone_registry<A>(
    source: Arc<A>,
    target: Arc<A>,
    config: ClonerConfig,
    cancel: CancellationToken,
    stats: Arc<ReplicationStats>,
) -> Result<(), ReplicatorError>
where
    A: SchemaRegistryAPI + ?Sized + 'static,
{
    let plans = collect_plan(source.as_ref(), config.preserve_ids, config.include_compatibility).await?;

    if config.preserve_ids {
        target.update_global_resource_mode(Mode::Import, true).await?;
    }

    run_pool(
        config.worker_pool,
        plans.clone(),
        cancel,
        {
            let target = target.clone();
            let stats = stats.clone();
            let preserve_ids = config.preserve_ids;
            move |plan: PlannedSubject| {
                let target = target.clone();
                let stats = stats.clone();
                async move {
                    apply_subject(target.as_ref(), stats.as_ref(), preserve_ids, plan).await;
                }
            }
        },
        |_: ()| {},
    )
    .await;

    if config.preserve_ids {
        if let Err(error) = target.update_global_resource_mode(Mode::ReadWrite, true).await {
            warn!(%error, "failed to restore global READWRITE mode after clone");
        }
    }

    if config.clone_tags {
        clone_tags(source.as_ref(), target.as_ref(), &plans).await;
    }

    Ok(())
}

#[cfg(all(test, feature = "testing"))]
mod tests {
    use super::*;
    use crate::api::MockSchemaRegistryAPI;
    use crate::types::{SchemaType, Subject};

    #[tokio::test]
    async fn clone_registry_preserves_source_ids() {
        let mut source = MockSchemaRegistryAPI::new();
        source.expect_get_subjects().returning(|_deleted| Ok(vec!["orders-value".to_string()]));
        source
            .expect_get_subject_versions()
            .returning(|_subject, _deleted| Ok(vec![1]));
        source.expect_get_subject_version().returning(|subject, _version| {
            Ok(Subject {
                id: 42,
                subject: subject.to_string(),
                version: 1,
                schema_type: SchemaType::Avro,
                schema: "{\"type\":\"string\"}".to_string().into(),
                references: None,
            })
        });

        let mut target = MockSchemaRegistryAPI::new();
        target
            .expect_update_global_resource_mode()
            .returning(|mode, _force| Ok(mode));
        target
            .expect_update_subject_resource_mode()
            .returning(|_subject, mode, _force| Ok(mode));
        target.expect_register_schema().returning(|subject, schema| {
            assert_eq!(subject, "orders-value");
            assert_eq!(schema.id, Some(42));
            Ok(schema.id.unwrap())
        });

        let stats = Arc::new(ReplicationStats::new(0));
        let cloner_config = ClonerConfig {
            include_compatibility: false,
            clone_tags: false,
            ..ClonerConfig::default()
        };

        clone_registry(
            Arc::new(source),
            Arc::new(target),
            cloner_config,
            CancellationToken::new(),
            stats.clone(),
        )
        .await
        .unwrap();

        let snapshot = stats.snapshot();
        assert_eq!(snapshot.schemas_replicated, 1);
        assert_eq!(snapshot.errors, 0);
    }

    #[tokio::test]
    async fn clone_registry_skips_idempotent_conflicts_without_counting_errors() {
        let mut source = MockSchemaRegistryAPI::new();
        source.expect_get_subjects().returning(|_| Ok(vec!["orders-value".to_string()]));
        source
            .expect_get_subject_versions()
            .returning(|_, _| Ok(vec![1]));
        source.expect_get_subject_version().returning(|subject, _version| {
            Ok(Subject {
                id: 1,
                subject: subject.to_string(),
                version: 1,
                schema_type: SchemaType::Avro,
                schema: "{\"type\":\"string\"}".to_string().into(),
                references: None,
            })
        });

        let mut target = MockSchemaRegistryAPI::new();
        target.expect_register_schema().returning(|_subject, _schema| {
            Err(crate::error::SchemaRegistryError::HttpCall(
                crate::error::HttpCallError::UpstreamError {
                    url: "http://target".to_string(),
                    status: 409,
                    body: "Schema already registered".to_string(),
                },
            ))
        });

        let stats = Arc::new(ReplicationStats::new(0));
        let cloner_config = ClonerConfig {
            preserve_ids: false,
            include_compatibility: false,
            clone_tags: false,
            ..ClonerConfig::default()
        };

        clone_registry(
            Arc::new(source),
            Arc::new(target),
            cloner_config,
            CancellationToken::new(),
            stats.clone(),
        )
        .await
        .unwrap();

        let snapshot = stats.snapshot();
        assert_eq!(snapshot.schemas_replicated, 0);
        assert_eq!(snapshot.errors, 0);
    }
}

//! Dangling Scanner (spec §4.5).

use std::sync::Arc;

use dashmap::DashMap;
use tokio_util::sync::CancellationToken;
use tracing::warn;

use crate::api::SchemaRegistryAPI;
use crate::error::ReplicatorError;
use crate::types::{DanglingReason, DanglingReference, Version};
use crate::workers::{run_pool, WorkerPoolConfig};

#[derive(Debug, Clone, Copy, Default)]
pub struct DanglingScannerConfig {
    pub worker_pool: WorkerPoolConfig,
}

/// Subjects whose versions (active, then all-including-deleted) are fetched
/// at most once per scan and shared across workers.
struct VersionCache<A: SchemaRegistryAPI + ?Sized> {
    client: Arc<A>,
    active: DashMap<String, Option<Vec<u32>>>,
    all: DashMap<String, Option<Vec<u32>>>,
}

impl<A: SchemaRegistryAPI + ?Sized> VersionCache<A> {
    fn new(client: Arc<A>) -> Self {
        Self {
            client,
            active: DashMap::new(),
            all: DashMap::new(),
        }
    }

    /// `None` means the subject does not exist (never existed or was hard
    /// deleted entirely).
    async fn versions(&self, subject: &str, include_deleted: bool) -> Option<Vec<u32>> {
        let cache = if include_deleted { &self.all } else { &self.active };

        if let Some(cached) = cache.get(subject) {
            return cached.clone();
        }

        let result = self
            .client
            .get_subject_versions(subject, include_deleted)
            .await
            .ok();

        cache.insert(subject.to_string(), result.clone());
        result
    }
}

pub async fn scan<A>(
    client: Arc<A>,
    config: DanglingScannerConfig,
    cancel: CancellationToken,
) -> Result<Vec<DanglingReference>, ReplicatorError>
where
    A: SchemaRegistryAPI + ?Sized + 'static,
{
    let subjects = client.get_subjects(true).await?;
    let non_internal: Vec<String> = subjects
        .into_iter()
        .filter(|s| !s.starts_with('_'))
        .collect();

    let cache = Arc::new(VersionCache::new(client.clone()));
    let mut findings = Vec::new();

    run_pool(
        config.worker_pool,
        non_internal,
        cancel,
        {
            let client = client.clone();
            let cache = cache.clone();
            move |subject: String| {
                let client = client.clone();
                let cache = cache.clone();
                async move { scan_subject(client, cache, subject).await }
            }
        },
        |result: Vec<DanglingReference>| findings.extend(result),
    )
    .await;

    findings.sort_by(|a, b| {
        (a.parent_subject.as_str(), a.parent_version)
            .cmp(&(b.parent_subject.as_str(), b.parent_version))
    });

    Ok(findings)
}

async fn scan_subject<A>(
    client: Arc<A>,
    cache: Arc<VersionCache<A>>,
    subject: String,
) -> Vec<DanglingReference>
where
    A: SchemaRegistryAPI + ?Sized,
{
    let Some(versions) = cache.versions(&subject, true).await else {
        return Vec::new();
    };

    let mut findings = Vec::new();

    for version in versions {
        let schema = match client.get_subject_version(&subject, Version::Number(version)).await {
            Ok(schema) => schema,
            Err(error) => {
                warn!(%subject, version, %error, "skipping version: fetch failed");
                continue;
            }
        };

        let Some(references) = schema.references else {
            continue;
        };

        for reference in references {
            if cache.versions(&reference.subject, false).await.is_none() {
                let reason = if cache.versions(&reference.subject, true).await.is_some() {
                    DanglingReason::SubjectSoftDeleted
                } else {
                    DanglingReason::SubjectNeverExisted
                };

                findings.push(DanglingReference {
                    parent_subject: subject.clone(),
                    parent_version: version,
                    referenced_subject: reference.subject,
                    referenced_version: reference.version,
                    reason,
                });
                continue;
            }

            let active = cache.versions(&reference.subject, false).await.unwrap_or_default();
            if active.contains(&reference.version) {
                continue;
            }

            let all = cache.versions(&reference.subject, true).await.unwrap_or_default();
            let reason = if all.contains(&reference.version) {
                DanglingReason::VersionSoftDeleted
            } else {
                DanglingReason::VersionNeverExisted
            };

            findings.push(DanglingReference {
                parent_subject: subject.clone(),
                parent_version: version,
                referenced_subject: reference.subject,
                referenced_version: reference.version,
                reason,
            });
        }
    }

    findings
}

#[cfg(all(test, feature = "testing"))]
mod tests {
    use super::*;
    use crate::api::MockSchemaRegistryAPI;
    use crate::error::{HttpCallError, SchemaRegistryError};
    use crate::types::{Reference, SchemaType, Subject};

    fn not_found() -> SchemaRegistryError {
        SchemaRegistryError::HttpCall(HttpCallError::UpstreamError {
            url: "http://registry".to_string(),
            status: 404,
            body: "not found".to_string(),
        })
    }

    #[tokio::test]
    async fn flags_a_reference_to_a_subject_that_never_existed() {
        let mut client = MockSchemaRegistryAPI::new();
        client
            .expect_get_subjects()
            .returning(|_deleted| Ok(vec!["orders-value".to_string()]));

        client
            .expect_get_subject_versions()
            .withf(|subject, deleted| subject == "orders-value" && *deleted)
            .returning(|_, _| Ok(vec![1]));
        client
            .expect_get_subject_versions()
            .withf(|subject, _deleted| subject == "ghost-value")
            .returning(|_, _| Err(not_found()));

        client.expect_get_subject_version().returning(|subject, _version| {
            Ok(Subject {
                id: 1,
                subject: subject.to_string(),
                version: 1,
                schema_type: SchemaType::Avro,
                schema: "{}".to_string().into(),
                references: Some(vec![Reference::new("Ghost", "ghost-value")]),
            })
        });

        let findings = scan(Arc::new(client), DanglingScannerConfig::default(), CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].referenced_subject, "ghost-value");
        assert_eq!(findings[0].reason, DanglingReason::SubjectNeverExisted);
    }

    #[tokio::test]
    async fn flags_a_reference_to_a_version_that_was_soft_deleted() {
        let mut client = MockSchemaRegistryAPI::new();
        client
            .expect_get_subjects()
            .returning(|_| Ok(vec!["orders-value".to_string()]));

        client
            .expect_get_subject_versions()
            .withf(|subject, deleted| subject == "orders-value" && *deleted)
            .returning(|_, _| Ok(vec![1]));
        client
            .expect_get_subject_versions()
            .withf(|subject, deleted| subject == "customer-value" && !*deleted)
            .returning(|_, _| Ok(vec![1]));
        client
            .expect_get_subject_versions()
            .withf(|subject, deleted| subject == "customer-value" && *deleted)
            .returning(|_, _| Ok(vec![1, 2]));

        client.expect_get_subject_version().returning(|subject, _version| {
            Ok(Subject {
                id: 1,
                subject: subject.to_string(),
                version: 1,
                schema_type: SchemaType::Avro,
                schema: "{}".to_string().into(),
                references: Some(vec![Reference::new("Customer", "customer-value").version(2)]),
            })
        });

        let findings = scan(Arc::new(client), DanglingScannerConfig::default(), CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].reason, DanglingReason::VersionSoftDeleted);
    }

    #[tokio::test]
    async fn no_findings_when_every_reference_resolves() {
        let mut client = MockSchemaRegistryAPI::new();
        client
            .expect_get_subjects()
            .returning(|_| Ok(vec!["orders-value".to_string()]));
        client
            .expect_get_subject_versions()
            .returning(|_subject, _deleted| Ok(vec![1]));
        client.expect_get_subject_version().returning(|subject, _version| {
            Ok(Subject {
                id: 1,
                subject: subject.to_string(),
                version: 1,
                schema_type: SchemaType::Avro,
                schema: "{}".to_string().into(),
                references: Some(vec![Reference::new("Customer", "customer-value")]),
            })
        });

        let findings = scan(Arc::new(client), DanglingScannerConfig::default(), CancellationToken::new())
            .await
            .unwrap();

        assert!(findings.is_empty());
    }
}

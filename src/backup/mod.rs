//! Backup / Restore (spec §4.10).

pub mod manifest;

use std::collections::{BTreeMap, HashMap, HashSet, VecDeque};
use std::path::{Path, PathBuf};

use percent_encoding::{utf8_percent_encode, NON_ALPHANUMERIC};
use tracing::{info, warn};

use crate::api::SchemaRegistryAPI;
use crate::error::{ParseError, ReplicatorError};
use crate::types::{Mode, ReplicationStats, UnregisteredSchema, Version};
use manifest::{GlobalConfig, GlobalMode, Manifest, SubjectBackup, TagsBackup, VersionBackup};

#[derive(Debug, Clone, Copy, Default)]
pub struct BackupConfig {
    /// Carries source schema ids into the backup so a later restore can
    /// preserve them. Requires the target to support IMPORT mode.
    pub by_id: bool,
    pub include_global_config: bool,
    pub include_global_mode: bool,
    pub include_tags: bool,
    /// Writes `id-mappings.json` (id -> every subject/version registered
    /// under it) and one `schemas-by-id/<id>.json` per distinct id.
    pub include_id_mappings: bool,
}

fn encode_subject(subject: &str) -> String {
    utf8_percent_encode(subject, NON_ALPHANUMERIC).to_string()
}

pub async fn backup<A>(
    client: &A,
    root: &Path,
    timestamp: &str,
    config: BackupConfig,
) -> Result<PathBuf, ReplicatorError>
where
    A: SchemaRegistryAPI + ?Sized,
{
    let backup_dir = root.join(format!("sr-backup-{timestamp}"));
    tokio::fs::create_dir_all(backup_dir.join("subjects")).await?;

    let subjects = client.get_subjects(false).await?;
    let mut written_subjects = Vec::with_capacity(subjects.len());
    let mut id_mappings: BTreeMap<u32, manifest::IdMapping> = BTreeMap::new();

    for subject in &subjects {
        let mut versions = client.get_subject_versions(subject, false).await?;
        versions.sort_unstable();

        let compatibility = client
            .get_subject_configuration(subject)
            .await
            .ok()
            .and_then(|c| c.compatibility_level);

        let mut version_backups = Vec::with_capacity(versions.len());
        for version in versions {
            let subject_version = client.get_subject_version(subject, Version::Number(version)).await?;

            if config.include_id_mappings {
                id_mappings
                    .entry(subject_version.id)
                    .or_insert_with(|| manifest::IdMapping {
                        id: subject_version.id,
                        locations: Vec::new(),
                    })
                    .locations
                    .push(manifest::SubjectVersionRef {
                        subject: subject.clone(),
                        version,
                    });
            }

            version_backups.push(VersionBackup {
                version,
                id: subject_version.id,
                schema_type: subject_version.schema_type,
                schema: subject_version.schema.to_string(),
                references: subject_version.references.unwrap_or_default(),
            });
        }

        let subject_backup = SubjectBackup {
            subject: subject.clone(),
            compatibility,
            versions: version_backups,
        };

        let path = backup_dir
            .join("subjects")
            .join(format!("{}.json", encode_subject(subject)));
        write_json(&path, &subject_backup).await?;
        written_subjects.push(subject.clone());
    }

    if config.include_id_mappings && !id_mappings.is_empty() {
        tokio::fs::create_dir_all(backup_dir.join("schemas-by-id")).await?;

        let mappings: Vec<_> = id_mappings.values().cloned().collect();
        write_json(&backup_dir.join("id-mappings.json"), &mappings).await?;

        for id in id_mappings.keys() {
            if let Ok(schema) = client.get_schema_by_id(*id).await {
                let by_id = manifest::SchemaById {
                    id: *id,
                    schema_type: schema.schema_type,
                    schema: schema.schema.to_string(),
                };
                let path = backup_dir.join("schemas-by-id").join(format!("{id}.json"));
                write_json(&path, &by_id).await?;
            }
        }
    }

    if config.include_global_config {
        if let Ok(global_config) = client.get_configuration().await {
            let backup = GlobalConfig {
                compatibility_level: global_config.compatibility_level,
            };
            write_json(&backup_dir.join("global-config.json"), &backup).await?;
        }
    }

    if config.include_global_mode {
        if let Ok(mode) = client.get_global_resource_mode().await {
            write_json(&backup_dir.join("global-mode.json"), &GlobalMode { mode }).await?;
        }
    }

    if config.include_tags {
        if let Ok(definitions) = client.list_tags().await {
            let mut assignments = Vec::new();
            for subject in &subjects {
                if let Ok(subject_tags) = client.list_subject_tags(subject).await {
                    assignments.extend(subject_tags);
                }
            }

            write_json(
                &backup_dir.join("tags.json"),
                &TagsBackup {
                    definitions,
                    assignments,
                },
            )
            .await?;
        }
    }

    let manifest = Manifest {
        format_version: manifest::MANIFEST_FORMAT_VERSION,
        created_at: timestamp.to_string(),
        source_url: String::new(),
        by_id: config.by_id,
        stats: ReplicationStats::default().snapshot(),
        subjects: written_subjects,
    };
    write_json(&backup_dir.join("manifest.json"), &manifest).await?;

    info!(dir = %backup_dir.display(), "backup complete");
    Ok(backup_dir)
}

#[derive(Debug, Clone, Copy, Default)]
pub struct RestoreConfig {
    pub preserve_ids: bool,
}

pub async fn restore<A>(
    client: &A,
    backup_dir: &Path,
    config: RestoreConfig,
) -> Result<(), ReplicatorError>
where
    A: SchemaRegistryAPI + ?Sized,
{
    let manifest: Manifest = read_json(&backup_dir.join("manifest.json")).await?;

    if config.preserve_ids && !manifest.by_id {
        warn!("restore requested ID preservation but backup was not created with --by-id; ids will be reassigned");
    }
    let preserve_ids = config.preserve_ids && manifest.by_id;

    let mut subjects = BTreeMap::new();
    for subject in &manifest.subjects {
        let path = backup_dir
            .join("subjects")
            .join(format!("{}.json", encode_subject(subject)));
        let backup: SubjectBackup = read_json(&path).await?;
        subjects.insert(subject.clone(), backup);
    }

    let order = topo_sort(&subjects)?;

    if preserve_ids {
        client.update_global_resource_mode(Mode::Import, true).await?;
    }

    for subject in &order {
        let Some(backup) = subjects.get(subject) else {
            continue;
        };

        if let Some(compatibility) = backup.compatibility {
            let update = crate::types::SubjectConfig::new().compatibility_level(compatibility);
            if let Err(error) = client.update_subject_configuration(subject, &update).await {
                warn!(%subject, %error, "failed to restore subject compatibility");
            }
        }

        if preserve_ids {
            client
                .update_subject_resource_mode(subject, Mode::Import, true)
                .await
                .ok();
        }

        for version in &backup.versions {
            let mut schema = UnregisteredSchema::schema(version.schema.clone())
                .schema_type(version.schema_type)
                .references(version.references.clone());

            if preserve_ids {
                schema = schema.id(version.id);
            }

            match client.register_schema(subject, &schema).await {
                Ok(_) => {}
                Err(error) if error.is_idempotent() => {
                    info!(%subject, version = version.version, "already present, skipping");
                }
                Err(error) => {
                    warn!(%subject, version = version.version, %error, "failed to restore version");
                }
            }
        }

        if preserve_ids {
            client
                .update_subject_resource_mode(subject, Mode::ReadWrite, true)
                .await
                .ok();
        }
    }

    if preserve_ids {
        if let Err(error) = client.update_global_resource_mode(Mode::ReadWrite, true).await {
            warn!(%error, "failed to restore global READWRITE mode after restore");
        }
    }

    let tags_path = backup_dir.join("tags.json");
    if tags_path.exists() {
        let tags: TagsBackup = read_json(&tags_path).await?;

        for tag in &tags.definitions {
            if let Err(error) = client.create_tag(tag).await {
                if !error.is_idempotent() {
                    warn!(tag = %tag.name, %error, "failed to restore tag definition");
                }
            }
        }

        for assignment in &tags.assignments {
            if let Err(error) = client.assign_tag(assignment).await {
                if !error.is_idempotent() {
                    warn!(%error, "failed to restore tag assignment");
                }
            }
        }
    }

    Ok(())
}

/// Kahn's algorithm over the subject reference graph, stable-sorted queue
/// so ties resolve in manifest order.
fn topo_sort(subjects: &BTreeMap<String, SubjectBackup>) -> Result<Vec<String>, ReplicatorError> {
    let mut in_degree: HashMap<&str, usize> = subjects.keys().map(|s| (s.as_str(), 0)).collect();
    let mut dependents: HashMap<&str, Vec<&str>> = HashMap::new();

    for (subject, backup) in subjects {
        let mut seen: HashSet<&str> = HashSet::new();
        for referenced in backup.references() {
            if referenced == subject || !subjects.contains_key(referenced) {
                continue;
            }
            if !seen.insert(referenced) {
                continue;
            }

            *in_degree.get_mut(subject.as_str()).unwrap() += 1;
            dependents.entry(referenced).or_default().push(subject.as_str());
        }
    }

    let mut queue: VecDeque<&str> = subjects
        .keys()
        .map(String::as_str)
        .filter(|s| in_degree[s] == 0)
        .collect();

    let mut order = Vec::with_capacity(subjects.len());
    while let Some(subject) = queue.pop_front() {
        order.push(subject.to_string());

        if let Some(children) = dependents.get(subject) {
            for child in children {
                let degree = in_degree.get_mut(child).unwrap();
                *degree -= 1;
                if *degree == 0 {
                    queue.push_back(child);
                }
            }
        }
    }

    if order.len() != subjects.len() {
        for subject in subjects.keys() {
            if !order.contains(subject) {
                order.push(subject.clone());
            }
        }
    }

    Ok(order)
}

async fn write_json<T: serde::Serialize>(path: &Path, value: &T) -> Result<(), ReplicatorError> {
    let body = serde_json::to_vec_pretty(value).map_err(ParseError::from)?;
    tokio::fs::write(path, body).await?;
    Ok(())
}

async fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T, ReplicatorError> {
    let body = tokio::fs::read(path).await?;
    serde_json::from_slice(&body).map_err(|error| ReplicatorError::Parse(ParseError::Manifest {
        message: format!("{}: {error}", path.display()),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Reference;

    fn subject(name: &str, refs: Vec<&str>) -> SubjectBackup {
        SubjectBackup {
            subject: name.to_string(),
            compatibility: None,
            versions: vec![VersionBackup {
                version: 1,
                id: 1,
                schema_type: crate::types::SchemaType::Avro,
                schema: "{}".to_string(),
                references: refs
                    .into_iter()
                    .map(|r| Reference::new("ref", r))
                    .collect(),
            }],
        }
    }

    #[test]
    fn orders_dependencies_before_dependents() {
        let mut subjects = BTreeMap::new();
        subjects.insert("parent".to_string(), subject("parent", vec!["child"]));
        subjects.insert("child".to_string(), subject("child", vec![]));

        let order = topo_sort(&subjects).unwrap();
        let child_index = order.iter().position(|s| s == "child").unwrap();
        let parent_index = order.iter().position(|s| s == "parent").unwrap();
        assert!(child_index < parent_index);
    }

    #[test]
    fn percent_encodes_special_characters() {
        assert_eq!(
            encode_subject(":.ctx:orders-value"),
            "%3A%2Ectx%3Aorders%2Dvalue"
        );
    }
}

use crate::error::SchemaRegistryError;
use crate::types::{
    ClusterConfig, Mode, Schema, StringSchema, Subject, SubjectConfig, SubjectVersion, Tag,
    TagAssignment, UnregisteredSchema, Version,
};

/// The Schema Registry API surface the replication core programs against.
///
/// This trait conforms with the [Confluent Schema Registry API documentation](https://docs.confluent.io/platform/current/schema-registry/develop/api.html),
/// narrowed to the operations the replication core needs plus the context
/// and tag extensions it requires.
#[cfg_attr(feature = "testing", mockall::automock)]
#[async_trait::async_trait]
pub trait SchemaRegistryAPI: Send + Sync {
    /// Checks if a schema is compatible with the provided subject version.
    async fn is_compatible(
        &self,
        subject: &str,
        version: Version,
        schema: &UnregisteredSchema,
    ) -> Result<bool, SchemaRegistryError>;

    /// Get the global configuration for the cluster.
    async fn get_configuration(&self) -> Result<ClusterConfig, SchemaRegistryError>;

    /// Update the global configuration for the cluster.
    async fn update_configuration(
        &self,
        configuration: &ClusterConfig,
    ) -> Result<ClusterConfig, SchemaRegistryError>;

    /// Get the configuration for a specific subject.
    async fn get_subject_configuration(
        &self,
        subject: &str,
    ) -> Result<SubjectConfig, SchemaRegistryError>;

    /// Update the configuration for a specific subject.
    async fn update_subject_configuration(
        &self,
        subject: &str,
        configuration: &SubjectConfig,
    ) -> Result<SubjectConfig, SchemaRegistryError>;

    /// Delete the subject-level compatibility override, reverting the
    /// subject to the cluster's global compatibility level.
    async fn delete_subject_configuration(&self, subject: &str) -> Result<(), SchemaRegistryError>;

    /// Gets a list of contexts. The list will always include the default
    /// context, and any custom contexts that were created in the registry.
    async fn get_contexts(&self) -> Result<Vec<String>, SchemaRegistryError>;

    /// Get the global resource mode of the schema registry.
    async fn get_global_resource_mode(&self) -> Result<Mode, SchemaRegistryError>;

    /// Set the global resource mode of the schema registry.
    async fn update_global_resource_mode(
        &self,
        mode: Mode,
        force: bool,
    ) -> Result<Mode, SchemaRegistryError>;

    /// Get subject resource mode.
    async fn get_subject_resource_mode(&self, subject: &str) -> Result<Mode, SchemaRegistryError>;

    /// Set subject resource mode.
    async fn update_subject_resource_mode(
        &self,
        subject: &str,
        mode: Mode,
        force: bool,
    ) -> Result<Mode, SchemaRegistryError>;

    /// Delete the subject-level mode override, reverting the subject to the
    /// cluster's global mode.
    async fn delete_subject_resource_mode(&self, subject: &str) -> Result<(), SchemaRegistryError>;

    /// Get the schema identified by the provided id.
    async fn get_schema_by_id(&self, id: u32) -> Result<Schema, SchemaRegistryError>;

    /// Get the subject-version pairs for the provided schema id.
    async fn get_schema_subject_versions(
        &self,
        id: u32,
    ) -> Result<Vec<SubjectVersion>, SchemaRegistryError>;

    /// Get all subjects currently registered in the schema registry.
    async fn get_subjects(&self, deleted: bool) -> Result<Vec<String>, SchemaRegistryError>;

    /// Get every version number of the provided subject.
    async fn get_subject_versions(
        &self,
        subject: &str,
        deleted: bool,
    ) -> Result<Vec<u32>, SchemaRegistryError>;

    /// Delete a subject, its versions, and its compatibility override.
    async fn delete_subject(
        &self,
        subject: &str,
        permanent: bool,
    ) -> Result<Vec<u32>, SchemaRegistryError>;

    /// Get a specific version of the subject.
    async fn get_subject_version(
        &self,
        subject: &str,
        version: Version,
    ) -> Result<Subject, SchemaRegistryError>;

    /// Get the raw schema for a specific version of the subject.
    async fn get_subject_version_raw(
        &self,
        subject: &str,
        version: Version,
    ) -> Result<StringSchema, SchemaRegistryError>;

    /// Register a new schema under a subject. When `schema.id` is set, the
    /// target subject (and the global resource) must be in IMPORT mode.
    async fn register_schema(
        &self,
        subject: &str,
        schema: &UnregisteredSchema,
    ) -> Result<u32, SchemaRegistryError>;

    /// Lookup if a schema is already registered under a subject.
    async fn lookup_subject_schema(
        &self,
        subject: &str,
        schema: &UnregisteredSchema,
    ) -> Result<Subject, SchemaRegistryError>;

    /// Delete a specific version of the subject.
    async fn delete_subject_version(
        &self,
        subject: &str,
        version: Version,
        permanent: bool,
    ) -> Result<u32, SchemaRegistryError>;

    /// Get the ids of schemas that reference the provided subject version.
    async fn get_schema_referenced_by(
        &self,
        subject: &str,
        version: Version,
    ) -> Result<Vec<u32>, SchemaRegistryError>;

    /// List every tag definition known to the registry.
    async fn list_tags(&self) -> Result<Vec<Tag>, SchemaRegistryError>;

    /// Create a tag definition. Idempotent: creating a tag that already
    /// exists is not an error.
    async fn create_tag(&self, tag: &Tag) -> Result<Tag, SchemaRegistryError>;

    /// Bind a tag to a subject, subject-version, or topic.
    async fn assign_tag(&self, assignment: &TagAssignment) -> Result<(), SchemaRegistryError>;

    /// List tag assignments bound to a whole subject.
    async fn list_subject_tags(&self, subject: &str) -> Result<Vec<TagAssignment>, SchemaRegistryError>;

    /// List tag assignments bound to one subject version.
    async fn list_version_tags(
        &self,
        subject: &str,
        version: Version,
    ) -> Result<Vec<TagAssignment>, SchemaRegistryError>;
}

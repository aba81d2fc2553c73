//! On-disk shapes for a backup directory (spec §4.10).

use serde::{Deserialize, Serialize};

use crate::types::{CompatibilityLevel, Mode, Reference, SchemaType, StatsSnapshot, TagAssignment};

/// Bumped when the on-disk shape of this module's files changes.
pub const MANIFEST_FORMAT_VERSION: u32 = 1;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Manifest {
    #[serde(default = "default_format_version")]
    pub format_version: u32,
    pub created_at: String,
    pub source_url: String,
    pub by_id: bool,
    pub stats: StatsSnapshot,
    pub subjects: Vec<String>,
}

fn default_format_version() -> u32 {
    MANIFEST_FORMAT_VERSION
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VersionBackup {
    pub version: u32,
    pub id: u32,
    pub schema_type: SchemaType,
    pub schema: String,
    #[serde(default)]
    pub references: Vec<Reference>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubjectBackup {
    pub subject: String,
    #[serde(default)]
    pub compatibility: Option<CompatibilityLevel>,
    pub versions: Vec<VersionBackup>,
}

impl SubjectBackup {
    /// Every subject named by a cross-subject reference in any version.
    pub fn references(&self) -> impl Iterator<Item = &str> {
        self.versions
            .iter()
            .flat_map(|v| v.references.iter())
            .map(|r| r.subject.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct GlobalConfig {
    #[serde(default)]
    pub compatibility_level: Option<CompatibilityLevel>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GlobalMode {
    pub mode: Mode,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct IdMapping {
    pub id: u32,
    pub locations: Vec<SubjectVersionRef>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubjectVersionRef {
    pub subject: String,
    pub version: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchemaById {
    pub id: u32,
    pub schema_type: SchemaType,
    pub schema: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct TagsBackup {
    #[serde(default)]
    pub definitions: Vec<crate::types::Tag>,
    #[serde(default)]
    pub assignments: Vec<TagAssignment>,
}

use serde::{Deserialize, Serialize};

/// Why a reference could not be resolved against the active subject set.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DanglingReason {
    SubjectSoftDeleted,
    VersionSoftDeleted,
    VersionNeverExisted,
    SubjectNeverExisted,
}

/// One dangling cross-subject reference found by the scanner.
#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DanglingReference {
    pub parent_subject: String,
    pub parent_version: u32,
    pub referenced_subject: String,
    pub referenced_version: u32,
    pub reason: DanglingReason,
}

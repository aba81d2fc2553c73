use serde::{Deserialize, Serialize};

/// Discriminator carried by the `_schemas` change-log key.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ChangeKeyType {
    Schema,
    DeleteSubject,
    ClearSubject,
    Config,
    Mode,
    Noop,
}

/// The change-log key, decoded from the raw bus record.
#[derive(Debug, Clone, Eq, PartialEq, Deserialize)]
pub struct ChangeKey {
    pub keytype: ChangeKeyType,
    #[serde(default)]
    pub subject: Option<String>,
    #[serde(default)]
    pub version: Option<u32>,
    #[serde(default)]
    pub magic: Option<i32>,
}

/// One decoded record from the change-log, offset-stamped by the bus.
#[derive(Debug, Clone, PartialEq)]
pub enum ChangeEvent {
    Schema {
        subject: String,
        version: u32,
        /// `None` when the value was a tombstone (version delete).
        value: Option<serde_json::Value>,
        offset: i64,
    },
    DeleteSubject {
        subject: String,
        offset: i64,
    },
    ClearSubject {
        subject: String,
        offset: i64,
    },
    Config {
        subject: Option<String>,
        value: Option<serde_json::Value>,
        offset: i64,
    },
    Mode {
        subject: Option<String>,
        value: Option<serde_json::Value>,
        offset: i64,
    },
    Noop {
        offset: i64,
    },
}

impl ChangeEvent {
    pub fn offset(&self) -> i64 {
        match self {
            ChangeEvent::Schema { offset, .. }
            | ChangeEvent::DeleteSubject { offset, .. }
            | ChangeEvent::ClearSubject { offset, .. }
            | ChangeEvent::Config { offset, .. }
            | ChangeEvent::Mode { offset, .. }
            | ChangeEvent::Noop { offset } => *offset,
        }
    }

    pub fn subject(&self) -> Option<&str> {
        match self {
            ChangeEvent::Schema { subject, .. }
            | ChangeEvent::DeleteSubject { subject, .. }
            | ChangeEvent::ClearSubject { subject, .. } => Some(subject.as_str()),
            ChangeEvent::Config { subject, .. } | ChangeEvent::Mode { subject, .. } => {
                subject.as_deref()
            }
            ChangeEvent::Noop { .. } => None,
        }
    }
}

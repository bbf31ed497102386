// src/models/document.rs

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Lifecycle state of an uploaded document.
///
/// `uploaded` is the initial state, `processing` marks a generation run in
/// flight, `ready` means at least one quiz exists, `error` records a failed
/// run and is retryable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentStatus {
    Uploaded,
    Processing,
    Ready,
    Error,
}

impl DocumentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            DocumentStatus::Uploaded => "uploaded",
            DocumentStatus::Processing => "processing",
            DocumentStatus::Ready => "ready",
            DocumentStatus::Error => "error",
        }
    }
}

impl FromStr for DocumentStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "uploaded" => Ok(DocumentStatus::Uploaded),
            "processing" => Ok(DocumentStatus::Processing),
            "ready" => Ok(DocumentStatus::Ready),
            "error" => Ok(DocumentStatus::Error),
            other => Err(format!("unknown document status '{}'", other)),
        }
    }
}

impl fmt::Display for DocumentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One uploaded source file and its processing state.
///
/// `file_path` points into the object store and is immutable once set.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    pub id: Uuid,
    pub user_id: Uuid,
    pub title: String,
    pub file_path: String,
    pub status: DocumentStatus,
    pub size_bytes: i64,
    pub page_count: Option<i32>,
    pub error_message: Option<String>,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

/// Input for creating a document row.
///
/// The id is generated by the upload flow before the blob is written, since
/// the storage path and cache key are derived from it.
#[derive(Debug, Clone)]
pub struct NewDocument {
    pub id: Uuid,
    pub user_id: Uuid,
    pub title: String,
    pub file_path: String,
    pub size_bytes: i64,
    pub page_count: Option<i32>,
}

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub type SourceId = u64;
pub type JobId = u64;
pub type UnitId = u64;
pub type RecordId = u64;

/// How a source exposes its documents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SourceKind {
    /// A CSW catalog service.
    Catalog,
    /// One GEMINI document at a fixed URL.
    SingleDocument,
    /// A WAF style index page linking to documents in the same directory.
    IndexPage,
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceKind::Catalog => write!(f, "catalog"),
            SourceKind::SingleDocument => write!(f, "single-document"),
            SourceKind::IndexPage => write!(f, "index-page"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewSource {
    pub url: String,
    pub kind: SourceKind,
    pub publisher_id: Option<String>,
    pub user_id: Option<String>,
}

/// The claimant of every GUID harvested through it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Source {
    pub id: SourceId,
    pub url: String,
    pub kind: SourceKind,
    pub publisher_id: Option<String>,
    pub user_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Job {
    pub id: JobId,
    pub source: Source,
    #[serde(default)]
    pub gather_errors: Vec<String>,
}

/// Pipeline stage an error was raised in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Stage {
    Gather,
    Fetch,
    Import,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stage::Gather => write!(f, "gather"),
            Stage::Fetch => write!(f, "fetch"),
            Stage::Import => write!(f, "import"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitError {
    pub stage: Stage,
    pub message: String,
}

/// Values needed to create a harvest unit; the store assigns id and timestamp.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewUnit {
    pub guid: String,
    pub job_id: JobId,
    pub source_id: SourceId,
    pub content: Option<String>,
}

/// One harvested document instance for a job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Unit {
    pub id: UnitId,
    pub guid: String,
    pub job_id: JobId,
    pub source_id: SourceId,
    pub content: Option<String>,
    pub record_id: Option<RecordId>,
    pub created: DateTime<Utc>,
    #[serde(default)]
    pub errors: Vec<UnitError>,
}

impl Unit {
    /// Content that is present and not just whitespace.
    pub fn usable_content(&self) -> Option<&str> {
        self.content
            .as_deref()
            .filter(|content| !content.trim().is_empty())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resource {
    pub url: String,
    pub description: String,
    pub format: String,
}

/// The persisted dataset entity bound to the current state of a GUID.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    pub id: RecordId,
    pub name: String,
    pub title: String,
    pub notes: String,
    pub tags: Vec<String>,
    pub extras: BTreeMap<String, String>,
    pub resources: Vec<Resource>,
}

impl Record {
    pub fn extra(&self, key: &str) -> Option<&str> {
        self.extras.get(key).map(String::as_str)
    }
}

/// Numeric bounding box stored for a record by the extent computer.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Extent {
    pub west: f64,
    pub east: f64,
    pub south: f64,
    pub north: f64,
}

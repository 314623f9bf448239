use std::fmt;

use thiserror::Error;

use crate::model::{RecordId, UnitId};
use crate::naming::NameAllocationError;

/// Unit-scoped failure. Recorded on the unit; other units carry on.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ObjectError {
    #[error("empty content for object {unit_id}")]
    EmptyContent { unit_id: UnitId },
    #[error("unit {unit_id} not found")]
    MissingUnit { unit_id: UnitId },
    #[error("error contacting the catalog: {message}")]
    Fetch { message: String },
    #[error("empty record for id {identifier}")]
    EmptyRecord { identifier: String },
    #[error("parse error: {message}")]
    Parse { message: String },
    #[error("content is not a valid GEMINI document: {}", messages.join("; "))]
    Invalid { messages: Vec<String> },
    #[error("unit was gathered as GUID {gathered} but the document says {document}")]
    GuidMismatch { gathered: String, document: String },
    #[error(
        "another source {source_url} (publisher {publisher}, user {user}) is using metadata GUID {guid}"
    )]
    GuidConflict {
        guid: String,
        source_url: String,
        publisher: String,
        user: String,
    },
    #[error("could not generate a unique name from the title or the GUID, choose a more unique title: {0}")]
    NameAllocation(NameAllocationError),
    #[error("store error: {message}")]
    Store { message: String },
    #[error("error saving the record extent: {message}")]
    Extent { message: String },
}

/// What importing one unit did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImportOutcome {
    Created(RecordId),
    Updated(RecordId),
    Skipped,
    Failed(ObjectError),
}

impl ImportOutcome {
    pub fn record_id(&self) -> Option<RecordId> {
        match self {
            ImportOutcome::Created(id) | ImportOutcome::Updated(id) => Some(*id),
            ImportOutcome::Skipped | ImportOutcome::Failed(_) => None,
        }
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, ImportOutcome::Failed(_))
    }
}

impl fmt::Display for ImportOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ImportOutcome::Created(id) => write!(f, "created record {id}"),
            ImportOutcome::Updated(id) => write!(f, "updated record {id}"),
            ImportOutcome::Skipped => write!(f, "skipped"),
            ImportOutcome::Failed(err) => write!(f, "failed: {err}"),
        }
    }
}

/// A reconciliation bug: the record's newest bound unit is not the unit that
/// was just imported. Never folded into an [`ImportOutcome`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error(
    "record {record_id} is bound to GUID {bound_guid:?} after importing unit {unit_id} with GUID {expected_guid}"
)]
pub struct InvariantViolation {
    pub unit_id: UnitId,
    pub record_id: RecordId,
    pub expected_guid: String,
    pub bound_guid: Option<String>,
}

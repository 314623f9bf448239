//! Persistence seam for sources, jobs, units, records and extents.

mod file;
mod memory;

pub use file::{JsonFileStore, SnapshotMode};
pub use memory::InMemoryStore;

use gemini_core::{
    Extent, Job, JobId, NameLookup, NewSource, NewUnit, Record, RecordId, RecordWrite, Source,
    SourceId, Unit, UnitError, UnitId,
};
use thiserror::Error;

use crate::persist::PersistError;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: u64 },
    #[error("record name {0:?} is already taken")]
    NameTaken(String),
    #[error("a new record needs a name")]
    MissingName,
    #[error("could not persist store snapshot: {0}")]
    Persist(#[from] PersistError),
    #[error("store snapshot unreadable: {0}")]
    Snapshot(String),
}

/// Everything the harvester reads from and writes to.
///
/// Each method is one transaction: it either applies completely or leaves the
/// store untouched.
pub trait RecordStore: NameLookup + Send {
    fn insert_source(&mut self, source: NewSource) -> Result<Source, StoreError>;
    fn source(&self, id: SourceId) -> Result<Source, StoreError>;

    fn insert_job(&mut self, source_id: SourceId) -> Result<Job, StoreError>;
    fn job(&self, id: JobId) -> Result<Job, StoreError>;
    fn record_gather_error(&mut self, job_id: JobId, message: &str) -> Result<(), StoreError>;

    fn insert_unit(&mut self, unit: NewUnit) -> Result<Unit, StoreError>;
    fn unit(&self, id: UnitId) -> Result<Unit, StoreError>;
    fn units_for_job(&self, job_id: JobId) -> Vec<Unit>;
    fn set_unit_content(&mut self, unit_id: UnitId, content: String) -> Result<(), StoreError>;
    fn record_unit_error(&mut self, unit_id: UnitId, error: UnitError) -> Result<(), StoreError>;
    fn bind_unit(&mut self, unit_id: UnitId, record_id: RecordId) -> Result<(), StoreError>;

    /// Newest unit carrying `guid` that is bound to a record. Ties on the
    /// creation time go to the higher unit id.
    fn latest_bound_unit(&self, guid: &str) -> Option<Unit>;
    /// Newest unit bound to `record_id`, same ordering as above.
    fn latest_unit_for_record(&self, record_id: RecordId) -> Option<Unit>;

    fn record(&self, id: RecordId) -> Result<Record, StoreError>;
    fn records(&self) -> Vec<Record>;

    /// Create (`target` is `None`) or update a record.
    ///
    /// Tags and resources are replaced, extras are upserted key by key. A
    /// `None` name on update keeps the current one.
    fn write_record(
        &mut self,
        target: Option<RecordId>,
        write: RecordWrite,
    ) -> Result<Record, StoreError>;

    fn save_extent(&mut self, record_id: RecordId, extent: Extent) -> Result<(), StoreError>;
    fn extent(&self, record_id: RecordId) -> Option<Extent>;

    /// Make pending mutations durable. Called by the engine after each stage.
    fn checkpoint(&mut self) -> Result<(), StoreError> {
        Ok(())
    }
}

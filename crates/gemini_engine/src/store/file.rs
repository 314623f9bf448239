use std::fs;
use std::path::{Path, PathBuf};

use engine_logging::{engine_debug, engine_info};
use gemini_core::{
    Extent, Job, JobId, NameLookup, NewSource, NewUnit, Record, RecordId, RecordWrite, Source,
    SourceId, Unit, UnitError, UnitId,
};

use super::{InMemoryStore, RecordStore, StoreError};
use crate::persist::{AtomicFileWriter, PersistError};

/// When [`JsonFileStore`] writes its snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SnapshotMode {
    /// Every mutation is on disk before it returns. Each one clones and
    /// rewrites the whole state, unit documents included, so a job of N
    /// units writes O(N²) bytes.
    #[default]
    EveryMutation,
    /// Mutations stay in memory until [`RecordStore::checkpoint`]. A crash
    /// loses whatever was applied since the last checkpoint.
    Checkpoint,
}

/// In-memory state mirrored to a JSON file.
///
/// With [`SnapshotMode::EveryMutation`] a mutation is applied to a copy of
/// the state, and the copy replaces the live state only once the snapshot is
/// on disk.
#[derive(Debug)]
pub struct JsonFileStore {
    writer: AtomicFileWriter,
    state: InMemoryStore,
    mode: SnapshotMode,
    dirty: bool,
}

impl JsonFileStore {
    /// Load the snapshot at `path`, or start empty when it does not exist yet.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        Self::open_with_mode(path, SnapshotMode::EveryMutation)
    }

    pub fn open_with_mode(
        path: impl Into<PathBuf>,
        mode: SnapshotMode,
    ) -> Result<Self, StoreError> {
        let path = path.into();
        let state = if path.exists() {
            let text = fs::read_to_string(&path).map_err(PersistError::from)?;
            let state: InMemoryStore =
                serde_json::from_str(&text).map_err(|err| StoreError::Snapshot(err.to_string()))?;
            engine_info!("Loaded store snapshot {}", path.display());
            state
        } else {
            InMemoryStore::new()
        };
        Ok(Self {
            writer: AtomicFileWriter::new(path),
            state,
            mode,
            dirty: false,
        })
    }

    pub fn path(&self) -> &Path {
        self.writer.target()
    }

    pub fn mode(&self) -> SnapshotMode {
        self.mode
    }

    /// True when mutations have been applied that are not on disk yet.
    pub fn has_pending_changes(&self) -> bool {
        self.dirty
    }

    fn persist(&self, state: &InMemoryStore) -> Result<(), StoreError> {
        let snapshot =
            serde_json::to_vec_pretty(state).map_err(|err| StoreError::Snapshot(err.to_string()))?;
        self.writer.write(&snapshot)?;
        Ok(())
    }

    fn mutate<T>(
        &mut self,
        apply: impl FnOnce(&mut InMemoryStore) -> Result<T, StoreError>,
    ) -> Result<T, StoreError> {
        match self.mode {
            SnapshotMode::EveryMutation => {
                let mut next = self.state.clone();
                let value = apply(&mut next)?;
                self.persist(&next)?;
                self.state = next;
                Ok(value)
            }
            SnapshotMode::Checkpoint => {
                // In-memory mutations check before they write, so a failed
                // one leaves the state as it was.
                let value = apply(&mut self.state)?;
                self.dirty = true;
                Ok(value)
            }
        }
    }
}

impl NameLookup for JsonFileStore {
    fn name_exists(&self, name: &str) -> bool {
        self.state.name_exists(name)
    }

    fn names_with_prefix(&self, prefix: &str, limit: usize) -> Vec<String> {
        self.state.names_with_prefix(prefix, limit)
    }
}

impl RecordStore for JsonFileStore {
    fn insert_source(&mut self, source: NewSource) -> Result<Source, StoreError> {
        self.mutate(|state| state.insert_source(source))
    }

    fn source(&self, id: SourceId) -> Result<Source, StoreError> {
        self.state.source(id)
    }

    fn insert_job(&mut self, source_id: SourceId) -> Result<Job, StoreError> {
        self.mutate(|state| state.insert_job(source_id))
    }

    fn job(&self, id: JobId) -> Result<Job, StoreError> {
        self.state.job(id)
    }

    fn record_gather_error(&mut self, job_id: JobId, message: &str) -> Result<(), StoreError> {
        self.mutate(|state| state.record_gather_error(job_id, message))
    }

    fn insert_unit(&mut self, unit: NewUnit) -> Result<Unit, StoreError> {
        self.mutate(|state| state.insert_unit(unit))
    }

    fn unit(&self, id: UnitId) -> Result<Unit, StoreError> {
        self.state.unit(id)
    }

    fn units_for_job(&self, job_id: JobId) -> Vec<Unit> {
        self.state.units_for_job(job_id)
    }

    fn set_unit_content(&mut self, unit_id: UnitId, content: String) -> Result<(), StoreError> {
        self.mutate(|state| state.set_unit_content(unit_id, content))
    }

    fn record_unit_error(&mut self, unit_id: UnitId, error: UnitError) -> Result<(), StoreError> {
        self.mutate(|state| state.record_unit_error(unit_id, error))
    }

    fn bind_unit(&mut self, unit_id: UnitId, record_id: RecordId) -> Result<(), StoreError> {
        self.mutate(|state| state.bind_unit(unit_id, record_id))
    }

    fn latest_bound_unit(&self, guid: &str) -> Option<Unit> {
        self.state.latest_bound_unit(guid)
    }

    fn latest_unit_for_record(&self, record_id: RecordId) -> Option<Unit> {
        self.state.latest_unit_for_record(record_id)
    }

    fn record(&self, id: RecordId) -> Result<Record, StoreError> {
        self.state.record(id)
    }

    fn records(&self) -> Vec<Record> {
        self.state.records()
    }

    fn write_record(
        &mut self,
        target: Option<RecordId>,
        write: RecordWrite,
    ) -> Result<Record, StoreError> {
        self.mutate(|state| state.write_record(target, write))
    }

    fn save_extent(&mut self, record_id: RecordId, extent: Extent) -> Result<(), StoreError> {
        self.mutate(|state| state.save_extent(record_id, extent))
    }

    fn extent(&self, record_id: RecordId) -> Option<Extent> {
        self.state.extent(record_id)
    }

    fn checkpoint(&mut self) -> Result<(), StoreError> {
        if !self.dirty {
            return Ok(());
        }
        self.persist(&self.state)?;
        self.dirty = false;
        engine_debug!("Checkpointed store snapshot {}", self.path().display());
        Ok(())
    }
}

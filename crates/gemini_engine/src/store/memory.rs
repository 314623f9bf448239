use std::collections::BTreeMap;

use chrono::Utc;
use gemini_core::{
    Extent, Job, JobId, NameLookup, NewSource, NewUnit, Record, RecordId, RecordWrite, Source,
    SourceId, Unit, UnitError, UnitId,
};
use serde::{Deserialize, Serialize};

use super::{RecordStore, StoreError};

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
struct LastIds {
    source: SourceId,
    job: JobId,
    unit: UnitId,
    record: RecordId,
}

/// Store kept entirely in memory. Also the snapshot format of
/// [`JsonFileStore`](super::JsonFileStore).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InMemoryStore {
    last_ids: LastIds,
    sources: BTreeMap<SourceId, Source>,
    jobs: BTreeMap<JobId, Job>,
    units: BTreeMap<UnitId, Unit>,
    records: BTreeMap<RecordId, Record>,
    extents: BTreeMap<RecordId, Extent>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn unit_mut(&mut self, id: UnitId) -> Result<&mut Unit, StoreError> {
        self.units
            .get_mut(&id)
            .ok_or(StoreError::NotFound { entity: "unit", id })
    }

    fn name_owner(&self, name: &str) -> Option<RecordId> {
        self.records
            .values()
            .find(|record| record.name == name)
            .map(|record| record.id)
    }

    fn latest_unit_where(&self, predicate: impl Fn(&Unit) -> bool) -> Option<Unit> {
        self.units
            .values()
            .filter(|unit| unit.record_id.is_some() && predicate(unit))
            .max_by_key(|unit| (unit.created, unit.id))
            .cloned()
    }
}

impl NameLookup for InMemoryStore {
    fn name_exists(&self, name: &str) -> bool {
        self.name_owner(name).is_some()
    }

    fn names_with_prefix(&self, prefix: &str, limit: usize) -> Vec<String> {
        let mut names: Vec<String> = self
            .records
            .values()
            .filter(|record| record.name.starts_with(prefix))
            .map(|record| record.name.clone())
            .collect();
        names.sort();
        names.truncate(limit);
        names
    }
}

impl RecordStore for InMemoryStore {
    fn insert_source(&mut self, source: NewSource) -> Result<Source, StoreError> {
        self.last_ids.source += 1;
        let source = Source {
            id: self.last_ids.source,
            url: source.url,
            kind: source.kind,
            publisher_id: source.publisher_id,
            user_id: source.user_id,
        };
        self.sources.insert(source.id, source.clone());
        Ok(source)
    }

    fn source(&self, id: SourceId) -> Result<Source, StoreError> {
        self.sources
            .get(&id)
            .cloned()
            .ok_or(StoreError::NotFound { entity: "source", id })
    }

    fn insert_job(&mut self, source_id: SourceId) -> Result<Job, StoreError> {
        let source = self.source(source_id)?;
        self.last_ids.job += 1;
        let job = Job {
            id: self.last_ids.job,
            source,
            gather_errors: Vec::new(),
        };
        self.jobs.insert(job.id, job.clone());
        Ok(job)
    }

    fn job(&self, id: JobId) -> Result<Job, StoreError> {
        self.jobs
            .get(&id)
            .cloned()
            .ok_or(StoreError::NotFound { entity: "job", id })
    }

    fn record_gather_error(&mut self, job_id: JobId, message: &str) -> Result<(), StoreError> {
        let job = self.jobs.get_mut(&job_id).ok_or(StoreError::NotFound {
            entity: "job",
            id: job_id,
        })?;
        job.gather_errors.push(message.to_string());
        Ok(())
    }

    fn insert_unit(&mut self, unit: NewUnit) -> Result<Unit, StoreError> {
        if !self.jobs.contains_key(&unit.job_id) {
            return Err(StoreError::NotFound {
                entity: "job",
                id: unit.job_id,
            });
        }
        self.last_ids.unit += 1;
        let unit = Unit {
            id: self.last_ids.unit,
            guid: unit.guid,
            job_id: unit.job_id,
            source_id: unit.source_id,
            content: unit.content,
            record_id: None,
            created: Utc::now(),
            errors: Vec::new(),
        };
        self.units.insert(unit.id, unit.clone());
        Ok(unit)
    }

    fn unit(&self, id: UnitId) -> Result<Unit, StoreError> {
        self.units
            .get(&id)
            .cloned()
            .ok_or(StoreError::NotFound { entity: "unit", id })
    }

    fn units_for_job(&self, job_id: JobId) -> Vec<Unit> {
        self.units
            .values()
            .filter(|unit| unit.job_id == job_id)
            .cloned()
            .collect()
    }

    fn set_unit_content(&mut self, unit_id: UnitId, content: String) -> Result<(), StoreError> {
        self.unit_mut(unit_id)?.content = Some(content);
        Ok(())
    }

    fn record_unit_error(&mut self, unit_id: UnitId, error: UnitError) -> Result<(), StoreError> {
        self.unit_mut(unit_id)?.errors.push(error);
        Ok(())
    }

    fn bind_unit(&mut self, unit_id: UnitId, record_id: RecordId) -> Result<(), StoreError> {
        if !self.records.contains_key(&record_id) {
            return Err(StoreError::NotFound {
                entity: "record",
                id: record_id,
            });
        }
        self.unit_mut(unit_id)?.record_id = Some(record_id);
        Ok(())
    }

    fn latest_bound_unit(&self, guid: &str) -> Option<Unit> {
        self.latest_unit_where(|unit| unit.guid == guid)
    }

    fn latest_unit_for_record(&self, record_id: RecordId) -> Option<Unit> {
        self.latest_unit_where(|unit| unit.record_id == Some(record_id))
    }

    fn record(&self, id: RecordId) -> Result<Record, StoreError> {
        self.records
            .get(&id)
            .cloned()
            .ok_or(StoreError::NotFound { entity: "record", id })
    }

    fn records(&self) -> Vec<Record> {
        self.records.values().cloned().collect()
    }

    fn write_record(
        &mut self,
        target: Option<RecordId>,
        write: RecordWrite,
    ) -> Result<Record, StoreError> {
        if let Some(name) = &write.name {
            if let Some(owner) = self.name_owner(name) {
                if Some(owner) != target {
                    return Err(StoreError::NameTaken(name.clone()));
                }
            }
        }

        let mut record = match target {
            Some(id) => self.record(id)?,
            None => {
                let name = write.name.clone().ok_or(StoreError::MissingName)?;
                Record {
                    id: self.last_ids.record + 1,
                    name,
                    title: String::new(),
                    notes: String::new(),
                    tags: Vec::new(),
                    extras: BTreeMap::new(),
                    resources: Vec::new(),
                }
            }
        };

        if let Some(name) = write.name {
            record.name = name;
        }
        record.title = write.title;
        record.notes = write.notes;
        record.tags.clear();
        for tag in write.tags {
            if !record.tags.contains(&tag) {
                record.tags.push(tag);
            }
        }
        record.resources = write.resources;
        record.extras.extend(write.extras);

        if target.is_none() {
            self.last_ids.record = record.id;
        }
        self.records.insert(record.id, record.clone());
        Ok(record)
    }

    fn save_extent(&mut self, record_id: RecordId, extent: Extent) -> Result<(), StoreError> {
        if !self.records.contains_key(&record_id) {
            return Err(StoreError::NotFound {
                entity: "record",
                id: record_id,
            });
        }
        self.extents.insert(record_id, extent);
        Ok(())
    }

    fn extent(&self, record_id: RecordId) -> Option<Extent> {
        self.extents.get(&record_id).copied()
    }
}

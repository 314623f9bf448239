//! The import stage: turn one fetched unit into a record mutation.

use std::sync::Arc;

use engine_logging::{engine_error, engine_info, engine_warn};
use gemini_core::{
    allocate_name, reconcile, vocabulary, ImportOutcome, InvariantViolation, NameAllocationError,
    NamePlan, ObjectError, PriorClaim, Reconciliation, RecordDraft, RecordId, SourceId, Stage,
    Unit, UnitError, UnitId,
};

use crate::config::{ImportConfig, ValidationPolicy};
use crate::extent::{BboxExtentComputer, SpatialExtentComputer};
use crate::parser::DocumentParser;
use crate::store::{RecordStore, StoreError};
use crate::validate::{ProfileValidator, Validator};

pub struct Reconciler {
    config: ImportConfig,
    parser: Arc<dyn DocumentParser>,
    validator: Option<Arc<dyn Validator>>,
    extents: Option<Arc<dyn SpatialExtentComputer>>,
}

impl Reconciler {
    /// A reconciler with the profile validator and the bbox extent computer.
    pub fn new(config: ImportConfig, parser: Arc<dyn DocumentParser>) -> Self {
        Self {
            config,
            parser,
            validator: Some(Arc::new(ProfileValidator::new())),
            extents: Some(Arc::new(BboxExtentComputer::new())),
        }
    }

    pub fn with_validator(mut self, validator: Option<Arc<dyn Validator>>) -> Self {
        self.validator = validator;
        self
    }

    pub fn with_extent_computer(
        mut self,
        extents: Option<Arc<dyn SpatialExtentComputer>>,
    ) -> Self {
        self.extents = extents;
        self
    }

    pub fn config(&self) -> &ImportConfig {
        &self.config
    }

    /// Create, update or skip the record for `unit_id`.
    ///
    /// Unit-level failures come back as [`ImportOutcome::Failed`] and are also
    /// written to the unit's error log. `Err` means the store ended up in a
    /// state the reconciliation rules forbid.
    pub fn import(
        &self,
        store: &mut dyn RecordStore,
        unit_id: UnitId,
    ) -> Result<ImportOutcome, InvariantViolation> {
        let outcome = match store.unit(unit_id) {
            Ok(unit) => self.import_unit(store, &unit)?,
            Err(_) => ImportOutcome::Failed(ObjectError::MissingUnit { unit_id }),
        };

        match &outcome {
            ImportOutcome::Failed(err) => {
                engine_warn!("Import of unit {} failed: {}", unit_id, err);
                let error = UnitError {
                    stage: Stage::Import,
                    message: err.to_string(),
                };
                if let Err(store_err) = store.record_unit_error(unit_id, error) {
                    engine_error!(
                        "Could not record import error on unit {}: {}",
                        unit_id,
                        store_err
                    );
                }
            }
            other => engine_info!("Import of unit {}: {}", unit_id, other),
        }
        Ok(outcome)
    }

    fn import_unit(
        &self,
        store: &mut dyn RecordStore,
        unit: &Unit,
    ) -> Result<ImportOutcome, InvariantViolation> {
        let Some(content) = unit.usable_content() else {
            return Ok(ImportOutcome::Failed(ObjectError::EmptyContent { unit_id: unit.id }));
        };
        let metadata = match self.parser.parse(content) {
            Ok(metadata) => metadata,
            Err(err) => {
                return Ok(ImportOutcome::Failed(ObjectError::Parse {
                    message: err.to_string(),
                }))
            }
        };
        if let Some(err) = self.check_validity(content) {
            return Ok(ImportOutcome::Failed(err));
        }
        // Claims and the binding check are keyed on the gathered GUID.
        if metadata.guid != unit.guid {
            return Ok(ImportOutcome::Failed(ObjectError::GuidMismatch {
                gathered: unit.guid.clone(),
                document: metadata.guid,
            }));
        }

        let source = match store.source(unit.source_id) {
            Ok(source) => source,
            Err(err) => return Ok(ImportOutcome::Failed(store_error(err))),
        };
        let prior = match self.prior_claim(&*store, &unit.guid, unit.source_id) {
            Ok(prior) => prior,
            Err(err) => return Ok(ImportOutcome::Failed(err)),
        };

        let existing = match reconcile(&metadata, unit.source_id, prior) {
            Reconciliation::New => {
                engine_info!("No record with GEMINI GUID {} found, creating one", unit.guid);
                None
            }
            Reconciliation::Conflict { owner } => {
                return Ok(ImportOutcome::Failed(ObjectError::GuidConflict {
                    guid: unit.guid.clone(),
                    source_url: owner.url,
                    publisher: owner.publisher_id.unwrap_or_else(|| "none".to_string()),
                    user: owner.user_id.unwrap_or_else(|| "none".to_string()),
                }))
            }
            Reconciliation::Unchanged { .. } => {
                engine_info!("Document with GUID {} unchanged, skipping...", unit.guid);
                return Ok(ImportOutcome::Skipped);
            }
            Reconciliation::Changed { record } => {
                engine_info!("Record {} for GUID {} needs updating", record.id, unit.guid);
                Some(record)
            }
        };

        let draft = RecordDraft::new(&metadata, &source, existing.as_ref());
        let name = match draft.name {
            NamePlan::Keep => None,
            NamePlan::Allocate => {
                match allocate_record_name(&*store, &metadata.title, &unit.guid) {
                    Ok(name) => Some(name),
                    Err(err) => {
                        return Ok(ImportOutcome::Failed(ObjectError::NameAllocation(err)))
                    }
                }
            }
        };

        let target = existing.as_ref().map(|record| record.id);
        let record = match store.write_record(target, draft.into_write(name)) {
            Ok(record) => record,
            Err(err) => return Ok(ImportOutcome::Failed(store_error(err))),
        };
        if let Err(err) = store.bind_unit(unit.id, record.id) {
            return Ok(ImportOutcome::Failed(store_error(err)));
        }

        let mut outcome = match target {
            Some(_) => ImportOutcome::Updated(record.id),
            None => ImportOutcome::Created(record.id),
        };

        let has_bbox = record
            .extra(vocabulary::BBOX_EAST_LONG)
            .is_some_and(|value| !value.trim().is_empty());
        if has_bbox && self.config.compute_extents {
            if let Some(extents) = &self.extents {
                if let Err(err) = extents.compute(store, &record) {
                    engine_error!(
                        "There was an error saving the extent of record {}: {}",
                        record.id,
                        err
                    );
                    outcome = ImportOutcome::Failed(ObjectError::Extent {
                        message: err.to_string(),
                    });
                }
            }
        }

        check_binding(&*store, unit, record.id)?;
        Ok(outcome)
    }

    fn check_validity(&self, content: &str) -> Option<ObjectError> {
        let validator = self.validator.as_ref()?;
        if self.config.validator_profiles.is_empty() {
            return None;
        }
        let report = validator.validate(content, &self.config.validator_profiles);
        if report.valid {
            return None;
        }
        match self.config.validation_policy {
            ValidationPolicy::Warn => {
                engine_warn!(
                    "Content is not a valid GEMINI document: {}",
                    report.messages.join("; ")
                );
                None
            }
            ValidationPolicy::Reject => Some(ObjectError::Invalid {
                messages: report.messages,
            }),
        }
    }

    /// The most recent binding of `guid`, with the previous document parsed
    /// when it came from the same source.
    fn prior_claim(
        &self,
        store: &dyn RecordStore,
        guid: &str,
        source_id: SourceId,
    ) -> Result<Option<PriorClaim>, ObjectError> {
        let Some(previous) = store.latest_bound_unit(guid) else {
            return Ok(None);
        };
        let Some(record_id) = previous.record_id else {
            return Ok(None);
        };
        let source = store.source(previous.source_id).map_err(store_error)?;
        let record = store.record(record_id).map_err(store_error)?;

        let metadata = if source.id == source_id {
            match previous.usable_content().map(|content| self.parser.parse(content)) {
                Some(Ok(metadata)) => Some(metadata),
                Some(Err(err)) => {
                    engine_warn!(
                        "Previous document for GUID {} no longer parses ({}), treating as changed",
                        guid,
                        err
                    );
                    None
                }
                None => {
                    engine_warn!("Previous unit {} for GUID {} has no content", previous.id, guid);
                    None
                }
            }
        } else {
            None
        };

        Ok(Some(PriorClaim {
            source,
            record,
            metadata,
        }))
    }
}

/// A name from the title, or failing that from the GUID.
fn allocate_record_name(
    store: &dyn RecordStore,
    title: &str,
    guid: &str,
) -> Result<String, NameAllocationError> {
    allocate_name(title, store).or_else(|err| {
        engine_warn!("No free name for title {:?} ({}), trying the GUID", title, err);
        allocate_name(guid, store)
    })
}

fn check_binding(
    store: &dyn RecordStore,
    unit: &Unit,
    record_id: RecordId,
) -> Result<(), InvariantViolation> {
    let bound_guid = store
        .latest_unit_for_record(record_id)
        .map(|bound| bound.guid);
    if bound_guid.as_deref() == Some(unit.guid.as_str()) {
        return Ok(());
    }
    Err(InvariantViolation {
        unit_id: unit.id,
        record_id,
        expected_guid: unit.guid.clone(),
        bound_guid,
    })
}

fn store_error(err: StoreError) -> ObjectError {
    ObjectError::Store {
        message: err.to_string(),
    }
}

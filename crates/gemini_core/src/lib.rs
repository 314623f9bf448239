//! Harvester core: GEMINI domain model and pure reconciliation rules.
mod extras;
mod metadata;
mod model;
mod naming;
mod outcome;
mod reconcile;

pub mod vocabulary {
    //! Extras keys written on every harvested record.
    pub use crate::extras::{
        BBOX_EAST_LONG, BBOX_NORTH_LAT, BBOX_SOUTH_LAT, BBOX_WEST_LONG, CONSTRAINT,
        DATASET_REFERENCE_DATE, GUID, INSPIRE, METADATA_DATE, METADATA_LANGUAGE, PUBLISHED_BY,
        RESOURCE_TYPE, SPATIAL_REFERENCE_SYSTEM, TEMPORAL_COVERAGE_FROM, TEMPORAL_COVERAGE_TO,
    };
}

pub use extras::GeminiExtras;
pub use metadata::{BoundingBox, MetadataRecord, ReferenceDate, ResourceLocator};
pub use model::{
    Extent, Job, JobId, NewSource, NewUnit, Record, RecordId, Resource, Source, SourceId,
    SourceKind, Stage, Unit, UnitError, UnitId,
};
pub use naming::{
    allocate_name, slugify, NameAllocationError, NameLookup, MAX_NAME_LENGTH, MAX_SUFFIX,
    PREFIX_LOOKUP_LIMIT,
};
pub use outcome::{ImportOutcome, InvariantViolation, ObjectError};
pub use reconcile::{
    is_unchanged, reconcile, resources_for, NamePlan, PriorClaim, Reconciliation, RecordDraft,
    RecordWrite, RESOURCE_DESCRIPTION, SERVICE_FORMAT, UNVERIFIED_FORMAT,
};

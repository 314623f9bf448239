//! The fixed extras vocabulary written on every harvested record.

use crate::metadata::{MetadataRecord, ReferenceDate};
use crate::model::Source;

pub const BBOX_EAST_LONG: &str = "bbox-east-long";
pub const BBOX_NORTH_LAT: &str = "bbox-north-lat";
pub const BBOX_SOUTH_LAT: &str = "bbox-south-lat";
pub const BBOX_WEST_LONG: &str = "bbox-west-long";
pub const SPATIAL_REFERENCE_SYSTEM: &str = "spatial-reference-system";
pub const GUID: &str = "guid";
pub const DATASET_REFERENCE_DATE: &str = "dataset-reference-date";
pub const RESOURCE_TYPE: &str = "resource-type";
pub const METADATA_LANGUAGE: &str = "metadata-language";
pub const METADATA_DATE: &str = "metadata-date";
pub const PUBLISHED_BY: &str = "published_by";
pub const INSPIRE: &str = "INSPIRE";
pub const CONSTRAINT: &str = "constraint";
pub const TEMPORAL_COVERAGE_FROM: &str = "temporal_coverage-from";
pub const TEMPORAL_COVERAGE_TO: &str = "temporal_coverage-to";

/// Structured form of the record extras derived from one document.
///
/// Fields that the document lacks render as empty strings, except the two
/// temporal coverage keys which are omitted entirely.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct GeminiExtras {
    pub bbox_east_long: String,
    pub bbox_north_lat: String,
    pub bbox_south_lat: String,
    pub bbox_west_long: String,
    pub spatial_reference_system: String,
    pub guid: String,
    pub dataset_reference_date: Vec<ReferenceDate>,
    pub resource_type: String,
    pub metadata_language: String,
    pub metadata_date: String,
    pub published_by: String,
    pub constraint: String,
    pub temporal_coverage_from: Option<String>,
    pub temporal_coverage_to: Option<String>,
}

impl GeminiExtras {
    pub fn from_metadata(metadata: &MetadataRecord, source: &Source) -> Self {
        let bbox = metadata.bbox.clone().unwrap_or_default();
        let constraint = metadata
            .use_constraints
            .iter()
            .chain(metadata.limitations_on_public_access.iter())
            .map(String::as_str)
            .collect::<Vec<_>>()
            .join("; ");

        Self {
            bbox_east_long: bbox.east,
            bbox_north_lat: bbox.north,
            bbox_south_lat: bbox.south,
            bbox_west_long: bbox.west,
            spatial_reference_system: metadata.spatial_reference_system.clone().unwrap_or_default(),
            guid: metadata.guid.clone(),
            dataset_reference_date: metadata.reference_dates.clone(),
            resource_type: metadata.resource_type.clone().unwrap_or_default(),
            metadata_language: metadata.metadata_language.clone().unwrap_or_default(),
            metadata_date: metadata.metadata_date.clone().unwrap_or_default(),
            published_by: published_by(source.publisher_id.as_deref()),
            constraint,
            temporal_coverage_from: metadata.temporal_extent_begin.clone(),
            temporal_coverage_to: metadata.temporal_extent_end.clone(),
        }
    }

    /// Key/value pairs in vocabulary order, ready to be upserted one by one.
    pub fn to_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = vec![
            (BBOX_EAST_LONG, self.bbox_east_long.clone()),
            (BBOX_NORTH_LAT, self.bbox_north_lat.clone()),
            (BBOX_SOUTH_LAT, self.bbox_south_lat.clone()),
            (BBOX_WEST_LONG, self.bbox_west_long.clone()),
            (SPATIAL_REFERENCE_SYSTEM, self.spatial_reference_system.clone()),
            (GUID, self.guid.clone()),
            (
                DATASET_REFERENCE_DATE,
                render_reference_dates(&self.dataset_reference_date),
            ),
            (RESOURCE_TYPE, self.resource_type.clone()),
            (METADATA_LANGUAGE, self.metadata_language.clone()),
            (METADATA_DATE, self.metadata_date.clone()),
            (PUBLISHED_BY, self.published_by.clone()),
            (INSPIRE, "True".to_string()),
            (CONSTRAINT, self.constraint.clone()),
        ];
        if let Some(from) = &self.temporal_coverage_from {
            pairs.push((TEMPORAL_COVERAGE_FROM, from.clone()));
        }
        if let Some(to) = &self.temporal_coverage_to {
            pairs.push((TEMPORAL_COVERAGE_TO, to.clone()));
        }
        pairs
    }

    pub fn has_bbox(&self) -> bool {
        !self.bbox_east_long.trim().is_empty()
    }
}

/// Publisher ids are numeric; a missing or non-numeric id publishes as `0`.
fn published_by(publisher_id: Option<&str>) -> String {
    publisher_id
        .and_then(|id| id.trim().parse::<i64>().ok())
        .unwrap_or(0)
        .to_string()
}

fn render_reference_dates(dates: &[ReferenceDate]) -> String {
    // Serializing a Vec of plain string structs cannot fail.
    serde_json::to_string(dates).unwrap_or_else(|_| "[]".to_string())
}

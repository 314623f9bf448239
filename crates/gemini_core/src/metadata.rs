use serde::{Deserialize, Serialize};

/// Geographic bounding box as written in the document.
///
/// Coordinates stay as the literal decimal strings so that they can be copied
/// into record extras verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct BoundingBox {
    pub west: String,
    pub east: String,
    pub south: String,
    pub north: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReferenceDate {
    #[serde(rename = "type")]
    pub kind: String,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceLocator {
    pub url: String,
    #[serde(rename = "type")]
    pub kind: Option<String>,
}

/// Parsed form of one GEMINI document. Derived from raw content, never stored.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct MetadataRecord {
    pub guid: String,
    pub title: String,
    pub abstract_text: String,
    pub bbox: Option<BoundingBox>,
    pub spatial_reference_system: Option<String>,
    pub temporal_extent_begin: Option<String>,
    pub temporal_extent_end: Option<String>,
    pub reference_dates: Vec<ReferenceDate>,
    pub metadata_date: Option<String>,
    pub metadata_language: Option<String>,
    pub resource_type: Option<String>,
    pub use_constraints: Vec<String>,
    pub limitations_on_public_access: Vec<String>,
    pub resource_locators: Vec<ResourceLocator>,
    pub tags: Vec<String>,
}

impl MetadataRecord {
    /// Reference date of type `creation`.
    pub fn date_created(&self) -> Option<&str> {
        self.reference_date("creation")
    }

    /// Reference date of type `publication`.
    pub fn date_released(&self) -> Option<&str> {
        self.reference_date("publication")
    }

    /// Reference date of type `revision`.
    pub fn date_updated(&self) -> Option<&str> {
        self.reference_date("revision")
    }

    /// The `(updated, released, created)` tuple used as the change signal.
    pub fn change_signature(&self) -> (Option<&str>, Option<&str>, Option<&str>) {
        (self.date_updated(), self.date_released(), self.date_created())
    }

    fn reference_date(&self, kind: &str) -> Option<&str> {
        self.reference_dates
            .iter()
            .find(|date| date.kind == kind)
            .map(|date| date.value.as_str())
    }
}

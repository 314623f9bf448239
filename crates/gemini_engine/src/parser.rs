//! GEMINI 2 / ISO 19139 document reading.
//!
//! Lookups go by local element name, so documents using other prefixes for
//! the GMD / GCO / GML namespaces parse the same way.

use gemini_core::{BoundingBox, MetadataRecord, ReferenceDate, ResourceLocator};
use thiserror::Error;

use crate::xml::{parse_xml, standalone_fragment, XmlElement, XmlError};

pub const METADATA_ELEMENT: &str = "MD_Metadata";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("malformed document: {0}")]
    Malformed(#[from] XmlError),
    #[error("no MD_Metadata element in document")]
    NoMetadataElement,
    #[error("document has no {0}")]
    MissingField(&'static str),
}

/// A GEMINI document cut out of whatever container it arrived in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedDocument {
    pub guid: String,
    /// The `MD_Metadata` element as a standalone document.
    pub xml: String,
}

pub trait DocumentParser: Send + Sync {
    /// Read every GEMINI field the harvester uses.
    fn parse(&self, text: &str) -> Result<MetadataRecord, ParseError>;

    /// Check well-formedness and pull out the GUID and the metadata element,
    /// without reading the rest of the document.
    fn extract(&self, text: &str) -> Result<ExtractedDocument, ParseError>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct GeminiParser;

impl GeminiParser {
    pub fn new() -> Self {
        Self
    }
}

impl DocumentParser for GeminiParser {
    fn parse(&self, text: &str) -> Result<MetadataRecord, ParseError> {
        let root = parse_xml(text)?;
        let metadata = root
            .descendant(METADATA_ELEMENT)
            .ok_or(ParseError::NoMetadataElement)?;
        read_metadata(metadata)
    }

    fn extract(&self, text: &str) -> Result<ExtractedDocument, ParseError> {
        let root = parse_xml(text)?;
        let (metadata, ancestors) = root
            .descendant_with_ancestors(METADATA_ELEMENT)
            .ok_or(ParseError::NoMetadataElement)?;
        let guid = file_identifier(metadata).ok_or(ParseError::MissingField("file identifier"))?;
        Ok(ExtractedDocument {
            guid,
            xml: standalone_fragment(text, metadata, &ancestors),
        })
    }
}

fn file_identifier(metadata: &XmlElement) -> Option<String> {
    metadata.text_at(&["fileIdentifier"])
}

fn read_metadata(md: &XmlElement) -> Result<MetadataRecord, ParseError> {
    let guid = file_identifier(md).ok_or(ParseError::MissingField("file identifier"))?;
    let identification = md.find(&["identificationInfo", "*"]);
    let title = identification
        .and_then(|info| info.text_at(&["citation", "CI_Citation", "title"]))
        .ok_or(ParseError::MissingField("title"))?;

    let mut record = MetadataRecord {
        guid,
        title,
        metadata_language: code_list_value(md, &["language", "LanguageCode"])
            .or_else(|| md.text_at(&["language"])),
        resource_type: code_list_value(md, &["hierarchyLevel", "MD_ScopeCode"]),
        metadata_date: md.text_at(&["dateStamp"]),
        spatial_reference_system: md.text_at(&[
            "referenceSystemInfo",
            "MD_ReferenceSystem",
            "referenceSystemIdentifier",
            "RS_Identifier",
            "code",
        ]),
        resource_locators: resource_locators(md),
        ..MetadataRecord::default()
    };

    if let Some(info) = identification {
        read_identification(info, &mut record);
    }
    Ok(record)
}

fn read_identification(info: &XmlElement, record: &mut MetadataRecord) {
    record.abstract_text = info.text_at(&["abstract"]).unwrap_or_default();

    record.reference_dates = info
        .find_all(&["citation", "CI_Citation", "date", "CI_Date"])
        .into_iter()
        .filter_map(|date| {
            let value = date.text_at(&["date"])?;
            let kind = code_list_value(date, &["dateType", "CI_DateTypeCode"])?;
            Some(ReferenceDate { kind, value })
        })
        .collect();

    record.tags = info
        .find_all(&["descriptiveKeywords", "MD_Keywords", "keyword"])
        .into_iter()
        .filter_map(XmlElement::text_content)
        .collect();

    record.use_constraints = info
        .find_all(&["resourceConstraints", "*", "useLimitation"])
        .into_iter()
        .filter_map(XmlElement::text_content)
        .collect();
    record.limitations_on_public_access = info
        .find_all(&["resourceConstraints", "MD_LegalConstraints", "otherConstraints"])
        .into_iter()
        .filter_map(XmlElement::text_content)
        .collect();

    let extents = info.find_all(&["extent", "EX_Extent"]);
    record.bbox = extents
        .iter()
        .flat_map(|extent| extent.find_all(&["geographicElement", "EX_GeographicBoundingBox"]))
        .find_map(bounding_box);

    let period = extents
        .iter()
        .flat_map(|extent| extent.find_all(&["temporalElement", "*", "extent", "TimePeriod"]))
        .next();
    if let Some(period) = period {
        record.temporal_extent_begin = period
            .text_at(&["beginPosition"])
            .or_else(|| period.text_at(&["begin", "TimeInstant", "timePosition"]));
        record.temporal_extent_end = period
            .text_at(&["endPosition"])
            .or_else(|| period.text_at(&["end", "TimeInstant", "timePosition"]));
    }
}

fn bounding_box(element: &XmlElement) -> Option<BoundingBox> {
    Some(BoundingBox {
        west: element.text_at(&["westBoundLongitude"])?,
        east: element.text_at(&["eastBoundLongitude"])?,
        south: element.text_at(&["southBoundLatitude"])?,
        north: element.text_at(&["northBoundLatitude"])?,
    })
}

fn resource_locators(md: &XmlElement) -> Vec<ResourceLocator> {
    md.find_all(&[
        "distributionInfo",
        "MD_Distribution",
        "transferOptions",
        "MD_DigitalTransferOptions",
        "onLine",
        "CI_OnlineResource",
    ])
    .into_iter()
    .filter_map(|online| {
        Some(ResourceLocator {
            url: online.text_at(&["linkage", "URL"])?,
            kind: code_list_value(online, &["function", "CI_OnLineFunctionCode"]),
        })
    })
    .collect()
}

/// `codeListValue` attribute of the element at `path`, falling back to its text.
fn code_list_value(element: &XmlElement, path: &[&str]) -> Option<String> {
    let code = element.find(path)?;
    code.attr("codeListValue")
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
        .or_else(|| code.text_content())
}

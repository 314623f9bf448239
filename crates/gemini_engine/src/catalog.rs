//! OGC CSW 2.0.2 client over plain KVP GET requests.

use std::sync::Arc;

use engine_logging::engine_debug;
use thiserror::Error;
use url::Url;

use crate::decode::{decode_output, DecodeError};
use crate::fetch::{ContentFetcher, FetchError};
use crate::parser::METADATA_ELEMENT;
use crate::validate::GMD_NAMESPACE;
use crate::xml::{parse_xml, standalone_fragment, XmlElement, XmlError};

pub const CSW_VERSION: &str = "2.0.2";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CatalogError {
    #[error("invalid catalog url {url}: {message}")]
    InvalidUrl { url: String, message: String },
    #[error(transparent)]
    Fetch(#[from] FetchError),
    #[error(transparent)]
    Decode(#[from] DecodeError),
    #[error("unreadable catalog response: {0}")]
    Xml(#[from] XmlError),
    #[error("catalog exception: {0}")]
    Exception(String),
    #[error("unexpected catalog response: <{0}>")]
    UnexpectedResponse(String),
}

/// One page of a `GetRecords` listing.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct IdentifierPage {
    /// `None` for records that came back without an identifier.
    pub identifiers: Vec<Option<String>>,
    /// Start position of the following page, when there is one.
    pub next_start: Option<u32>,
}

#[async_trait::async_trait]
pub trait CatalogClient: Send + Sync {
    async fn list_identifiers(
        &self,
        url: &str,
        start_position: u32,
        page_size: u32,
    ) -> Result<IdentifierPage, CatalogError>;

    /// The full metadata document for `id`, or `None` when the catalog has no
    /// such record.
    async fn fetch_by_id(&self, url: &str, id: &str) -> Result<Option<String>, CatalogError>;
}

pub struct CswClient {
    fetcher: Arc<dyn ContentFetcher>,
}

impl CswClient {
    pub fn new(fetcher: Arc<dyn ContentFetcher>) -> Self {
        Self { fetcher }
    }

    async fn request_text(&self, url: Url) -> Result<String, CatalogError> {
        engine_debug!("CSW request {}", url);
        let output = self.fetcher.fetch(url.as_str()).await?;
        Ok(decode_output(&output)?.text)
    }
}

#[async_trait::async_trait]
impl CatalogClient for CswClient {
    async fn list_identifiers(
        &self,
        url: &str,
        start_position: u32,
        page_size: u32,
    ) -> Result<IdentifierPage, CatalogError> {
        let request = get_records_url(url, start_position, page_size)?;
        let text = self.request_text(request).await?;
        let root = parse_response(&text)?;
        let results = root
            .descendant("SearchResults")
            .ok_or_else(|| CatalogError::UnexpectedResponse(root.name.clone()))?;
        Ok(read_search_results(results))
    }

    async fn fetch_by_id(&self, url: &str, id: &str) -> Result<Option<String>, CatalogError> {
        let request = get_record_by_id_url(url, id)?;
        let text = self.request_text(request).await?;
        let root = parse_response(&text)?;
        Ok(root
            .descendant_with_ancestors(METADATA_ELEMENT)
            .map(|(metadata, ancestors)| standalone_fragment(&text, metadata, &ancestors)))
    }
}

/// Parse a response body, turning an OWS exception report into an error.
fn parse_response(text: &str) -> Result<XmlElement, CatalogError> {
    let root = parse_xml(text)?;
    if root.name == "ExceptionReport" {
        let message = root
            .descendant("ExceptionText")
            .and_then(XmlElement::text_content)
            .or_else(|| {
                root.descendant("Exception")
                    .and_then(|exception| exception.attr("exceptionCode"))
                    .map(str::to_string)
            })
            .unwrap_or_else(|| "unspecified".to_string());
        return Err(CatalogError::Exception(message));
    }
    Ok(root)
}

fn read_search_results(results: &XmlElement) -> IdentifierPage {
    let identifiers: Vec<Option<String>> = results
        .children
        .iter()
        .map(|record| {
            record
                .text_at(&["fileIdentifier"])
                .or_else(|| record.text_at(&["identifier"]))
        })
        .collect();

    let returned = results
        .attr("numberOfRecordsReturned")
        .and_then(|value| value.trim().parse::<u32>().ok())
        .unwrap_or(identifiers.len() as u32);
    let next_start = results
        .attr("nextRecord")
        .and_then(|value| value.trim().parse::<u32>().ok())
        .filter(|next| *next > 0 && returned > 0);

    IdentifierPage {
        identifiers,
        next_start,
    }
}

fn base_url(url: &str) -> Result<Url, CatalogError> {
    Url::parse(url).map_err(|err| CatalogError::InvalidUrl {
        url: url.to_string(),
        message: err.to_string(),
    })
}

pub(crate) fn get_records_url(
    url: &str,
    start_position: u32,
    page_size: u32,
) -> Result<Url, CatalogError> {
    let mut request = base_url(url)?;
    request
        .query_pairs_mut()
        .append_pair("service", "CSW")
        .append_pair("version", CSW_VERSION)
        .append_pair("request", "GetRecords")
        .append_pair("typeNames", "gmd:MD_Metadata")
        .append_pair("namespace", &format!("xmlns(gmd={GMD_NAMESPACE})"))
        .append_pair("resultType", "results")
        .append_pair("elementSetName", "brief")
        .append_pair("outputSchema", GMD_NAMESPACE)
        .append_pair("startPosition", &start_position.to_string())
        .append_pair("maxRecords", &page_size.to_string());
    Ok(request)
}

pub(crate) fn get_record_by_id_url(url: &str, id: &str) -> Result<Url, CatalogError> {
    let mut request = base_url(url)?;
    request
        .query_pairs_mut()
        .append_pair("service", "CSW")
        .append_pair("version", CSW_VERSION)
        .append_pair("request", "GetRecordById")
        .append_pair("id", id)
        .append_pair("outputSchema", GMD_NAMESPACE)
        .append_pair("elementSetName", "full");
    Ok(request)
}

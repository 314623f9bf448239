//! Gather and fetch stages for the three kinds of source.

use std::collections::HashSet;
use std::sync::Arc;

use engine_logging::{engine_debug, engine_error, engine_info, engine_warn};
use gemini_core::{Job, NewUnit, ObjectError, Stage, UnitError, UnitId};
use thiserror::Error;

use crate::catalog::{CatalogClient, CatalogError};
use crate::decode::{decode_output, DecodeError, DecodedText};
use crate::fetch::{ContentFetcher, FetchError};
use crate::links::{LinkError, LinkExtractor};
use crate::parser::{DocumentParser, ExtractedDocument, ParseError};
use crate::store::{RecordStore, StoreError};

/// Job-scoped failure. Ends the gather stage of this job only.
#[derive(Debug, Error)]
pub enum GatherError {
    #[error("error contacting the CSW server: {0}")]
    Unreachable(CatalogError),
    #[error("unable to get content for url {url}: {error}")]
    Fetch { url: String, error: FetchError },
    #[error("unable to decode content of {url}: {error}")]
    Decode { url: String, error: DecodeError },
    #[error("{0}")]
    MalformedIndex(LinkError),
    #[error("could not get the GUID for {url}: {error}")]
    Document { url: String, error: ParseError },
    #[error("couldn't find any links to metadata files")]
    NoDocuments,
    #[error("store error during gather: {0}")]
    Store(#[from] StoreError),
}

/// Units created by a gather, plus the non-fatal problems met on the way.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct GatherReport {
    pub units: Vec<UnitId>,
    pub errors: Vec<String>,
}

pub enum Harvester {
    Catalog(CatalogHarvester),
    SingleDocument(DocumentHarvester),
    IndexPage(IndexHarvester),
}

impl Harvester {
    /// Enumerate the documents of `job.source` and create one unit per
    /// document. A failure is also recorded on the job.
    pub async fn gather(
        &self,
        store: &mut dyn RecordStore,
        job: &Job,
    ) -> Result<GatherReport, GatherError> {
        engine_info!("Gathering {} source {}", job.source.kind, job.source.url);
        let result = match self {
            Harvester::Catalog(harvester) => harvester.gather(store, job).await,
            Harvester::SingleDocument(harvester) => harvester.gather(store, job).await,
            Harvester::IndexPage(harvester) => harvester.gather(store, job).await,
        };
        match &result {
            Ok(report) => engine_info!(
                "Gathered {} units for job {} ({} link errors)",
                report.units.len(),
                job.id,
                report.errors.len()
            ),
            Err(err) => {
                engine_error!("Gather failed for job {}: {}", job.id, err);
                if let Err(store_err) = store.record_gather_error(job.id, &err.to_string()) {
                    engine_error!("Could not record gather error on job {}: {}", job.id, store_err);
                }
            }
        }
        result
    }

    /// Make sure the unit carries its content. A failure is also recorded on
    /// the unit.
    pub async fn fetch(
        &self,
        store: &mut dyn RecordStore,
        unit_id: UnitId,
    ) -> Result<(), ObjectError> {
        let result = match self {
            Harvester::Catalog(harvester) => harvester.fetch(store, unit_id).await,
            // Content was attached during gather.
            Harvester::SingleDocument(_) | Harvester::IndexPage(_) => Ok(()),
        };
        if let Err(err) = &result {
            engine_warn!("Fetch failed for unit {}: {}", unit_id, err);
            let error = UnitError {
                stage: Stage::Fetch,
                message: err.to_string(),
            };
            if let Err(store_err) = store.record_unit_error(unit_id, error) {
                engine_error!("Could not record fetch error on unit {}: {}", unit_id, store_err);
            }
        }
        result
    }
}

pub struct CatalogHarvester {
    client: Arc<dyn CatalogClient>,
    page_size: u32,
}

impl CatalogHarvester {
    pub fn new(client: Arc<dyn CatalogClient>, page_size: u32) -> Self {
        Self {
            client,
            page_size: page_size.max(1),
        }
    }

    async fn gather(
        &self,
        store: &mut dyn RecordStore,
        job: &Job,
    ) -> Result<GatherReport, GatherError> {
        let url = job.source.url.as_str();
        let mut report = GatherReport::default();
        let mut used: HashSet<String> = HashSet::new();
        let mut start = 1;
        let mut first_page = true;

        loop {
            let page = match self.client.list_identifiers(url, start, self.page_size).await {
                Ok(page) => page,
                Err(err) if first_page => return Err(GatherError::Unreachable(err)),
                Err(err) => {
                    let message =
                        format!("error listing CSW identifiers from position {start}: {err}");
                    engine_error!("{}", message);
                    store.record_gather_error(job.id, &message)?;
                    report.errors.push(message);
                    break;
                }
            };
            first_page = false;

            for identifier in page.identifiers {
                let identifier = identifier.map(|id| id.trim().to_string());
                let Some(identifier) = identifier.filter(|id| !id.is_empty()) else {
                    engine_error!("CSW returned an empty identifier, skipping...");
                    continue;
                };
                if used.contains(&identifier) {
                    engine_error!("CSW identifier {:?} already used, skipping...", identifier);
                    continue;
                }
                engine_debug!("Got identifier {} from the CSW", identifier);
                let unit = store.insert_unit(NewUnit {
                    guid: identifier.clone(),
                    job_id: job.id,
                    source_id: job.source.id,
                    content: None,
                })?;
                report.units.push(unit.id);
                used.insert(identifier);
            }

            match page.next_start {
                Some(next) if next > start => start = next,
                _ => break,
            }
        }
        Ok(report)
    }

    async fn fetch(&self, store: &mut dyn RecordStore, unit_id: UnitId) -> Result<(), ObjectError> {
        let unit = store
            .unit(unit_id)
            .map_err(|_| ObjectError::MissingUnit { unit_id })?;
        let source = store.source(unit.source_id).map_err(store_error)?;

        let record = self
            .client
            .fetch_by_id(&source.url, &unit.guid)
            .await
            .map_err(|err| ObjectError::Fetch {
                message: err.to_string(),
            })?;
        let Some(content) = record else {
            return Err(ObjectError::EmptyRecord {
                identifier: unit.guid,
            });
        };
        engine_debug!("XML content saved for unit {} (len {})", unit_id, content.len());
        store.set_unit_content(unit_id, content).map_err(store_error)
    }
}

pub struct DocumentHarvester {
    fetcher: Arc<dyn ContentFetcher>,
    parser: Arc<dyn DocumentParser>,
}

impl DocumentHarvester {
    pub fn new(fetcher: Arc<dyn ContentFetcher>, parser: Arc<dyn DocumentParser>) -> Self {
        Self { fetcher, parser }
    }

    async fn gather(
        &self,
        store: &mut dyn RecordStore,
        job: &Job,
    ) -> Result<GatherReport, GatherError> {
        let document = fetch_document(&*self.fetcher, &*self.parser, &job.source.url).await?;
        engine_info!("Got GUID {}", document.guid);
        let unit = store.insert_unit(NewUnit {
            guid: document.guid,
            job_id: job.id,
            source_id: job.source.id,
            content: Some(document.xml),
        })?;
        Ok(GatherReport {
            units: vec![unit.id],
            errors: Vec::new(),
        })
    }
}

pub struct IndexHarvester {
    fetcher: Arc<dyn ContentFetcher>,
    parser: Arc<dyn DocumentParser>,
    links: LinkExtractor,
}

impl IndexHarvester {
    pub fn new(fetcher: Arc<dyn ContentFetcher>, parser: Arc<dyn DocumentParser>) -> Self {
        Self {
            fetcher,
            parser,
            links: LinkExtractor::new(),
        }
    }

    async fn gather(
        &self,
        store: &mut dyn RecordStore,
        job: &Job,
    ) -> Result<GatherReport, GatherError> {
        let url = job.source.url.as_str();
        let page = fetch_text(&*self.fetcher, url).await?;
        let links = self
            .links
            .extract(&page.text, url)
            .map_err(GatherError::MalformedIndex)?;
        engine_debug!("Index page {} lists {} candidate documents", url, links.len());

        let mut report = GatherReport::default();
        for link in links {
            match fetch_document(&*self.fetcher, &*self.parser, &link).await {
                Ok(document) => {
                    engine_debug!("Got GUID {} from {}", document.guid, link);
                    let unit = store.insert_unit(NewUnit {
                        guid: document.guid,
                        job_id: job.id,
                        source_id: job.source.id,
                        content: Some(document.xml),
                    })?;
                    report.units.push(unit.id);
                }
                Err(err) => {
                    let message = format!("couldn't harvest index link {link}: {err}");
                    engine_warn!("{}", message);
                    store.record_gather_error(job.id, &message)?;
                    report.errors.push(message);
                }
            }
        }

        if report.units.is_empty() {
            return Err(GatherError::NoDocuments);
        }
        Ok(report)
    }
}

async fn fetch_text(fetcher: &dyn ContentFetcher, url: &str) -> Result<DecodedText, GatherError> {
    let output = fetcher.fetch(url).await.map_err(|error| GatherError::Fetch {
        url: url.to_string(),
        error,
    })?;
    decode_output(&output).map_err(|error| GatherError::Decode {
        url: url.to_string(),
        error,
    })
}

async fn fetch_document(
    fetcher: &dyn ContentFetcher,
    parser: &dyn DocumentParser,
    url: &str,
) -> Result<ExtractedDocument, GatherError> {
    let text = fetch_text(fetcher, url).await?;
    parser
        .extract(&text.text)
        .map_err(|error| GatherError::Document {
            url: url.to_string(),
            error,
        })
}

fn store_error(err: StoreError) -> ObjectError {
    ObjectError::Store {
        message: err.to_string(),
    }
}

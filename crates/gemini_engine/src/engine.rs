use std::sync::Arc;

use engine_logging::{engine_info, engine_warn};
use gemini_core::{ImportOutcome, InvariantViolation, JobId, SourceKind};
use thiserror::Error;

use crate::catalog::{CatalogClient, CswClient};
use crate::config::HarvestConfig;
use crate::fetch::{ContentFetcher, ReqwestFetcher};
use crate::harvester::{CatalogHarvester, DocumentHarvester, Harvester, IndexHarvester};
use crate::import::Reconciler;
use crate::parser::{DocumentParser, GeminiParser};
use crate::store::{RecordStore, StoreError};

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("job {0} not found")]
    UnknownJob(JobId),
    #[error(transparent)]
    Invariant(#[from] InvariantViolation),
    #[error("could not checkpoint the store: {0}")]
    Store(#[from] StoreError),
    #[error("could not start the async runtime: {0}")]
    Runtime(std::io::Error),
}

/// Per-job summary of a harvest run.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct JobReport {
    pub job_id: JobId,
    pub gathered: usize,
    pub fetched: usize,
    pub created: usize,
    pub updated: usize,
    pub skipped: usize,
    pub failed: usize,
    /// Set when gather failed as a whole; nothing else ran.
    pub gather_error: Option<String>,
    /// Non-fatal gather problems followed by per-unit failures.
    pub errors: Vec<String>,
}

/// Drives a job through gather, fetch and import, one unit at a time.
pub struct HarvestEngine {
    fetcher: Arc<dyn ContentFetcher>,
    catalog: Arc<dyn CatalogClient>,
    parser: Arc<dyn DocumentParser>,
    reconciler: Reconciler,
    page_size: u32,
}

impl HarvestEngine {
    pub fn from_config(config: &HarvestConfig) -> Self {
        let fetcher: Arc<dyn ContentFetcher> =
            Arc::new(ReqwestFetcher::new(config.fetch.to_settings()));
        let parser: Arc<dyn DocumentParser> = Arc::new(GeminiParser::new());
        Self {
            catalog: Arc::new(CswClient::new(fetcher.clone())),
            reconciler: Reconciler::new(config.import.clone(), parser.clone()),
            fetcher,
            parser,
            page_size: config.catalog.page_size,
        }
    }

    pub fn with_components(
        fetcher: Arc<dyn ContentFetcher>,
        catalog: Arc<dyn CatalogClient>,
        parser: Arc<dyn DocumentParser>,
        reconciler: Reconciler,
        page_size: u32,
    ) -> Self {
        Self {
            fetcher,
            catalog,
            parser,
            reconciler,
            page_size,
        }
    }

    pub fn reconciler(&self) -> &Reconciler {
        &self.reconciler
    }

    pub fn harvester_for(&self, kind: SourceKind) -> Harvester {
        match kind {
            SourceKind::Catalog => {
                Harvester::Catalog(CatalogHarvester::new(self.catalog.clone(), self.page_size))
            }
            SourceKind::SingleDocument => Harvester::SingleDocument(DocumentHarvester::new(
                self.fetcher.clone(),
                self.parser.clone(),
            )),
            SourceKind::IndexPage => Harvester::IndexPage(IndexHarvester::new(
                self.fetcher.clone(),
                self.parser.clone(),
            )),
        }
    }

    pub async fn run_job(
        &self,
        store: &mut dyn RecordStore,
        job_id: JobId,
    ) -> Result<JobReport, EngineError> {
        let job = store.job(job_id).map_err(|_| EngineError::UnknownJob(job_id))?;
        let harvester = self.harvester_for(job.source.kind);
        let mut report = JobReport {
            job_id,
            ..JobReport::default()
        };

        let gathered = harvester.gather(store, &job).await;
        store.checkpoint()?;
        let gathered = match gathered {
            Ok(gathered) => gathered,
            Err(err) => {
                report.gather_error = Some(err.to_string());
                return Ok(report);
            }
        };
        report.gathered = gathered.units.len();
        report.errors.extend(gathered.errors);

        let mut fetched = Vec::with_capacity(gathered.units.len());
        for unit_id in gathered.units {
            match harvester.fetch(store, unit_id).await {
                Ok(()) => fetched.push(unit_id),
                Err(err) => {
                    report.failed += 1;
                    report.errors.push(format!("unit {unit_id}: {err}"));
                }
            }
        }
        report.fetched = fetched.len();
        store.checkpoint()?;

        for unit_id in fetched {
            match self.reconciler.import(store, unit_id)? {
                ImportOutcome::Created(_) => report.created += 1,
                ImportOutcome::Updated(_) => report.updated += 1,
                ImportOutcome::Skipped => report.skipped += 1,
                ImportOutcome::Failed(err) => {
                    report.failed += 1;
                    report.errors.push(format!("unit {unit_id}: {err}"));
                }
            }
        }
        store.checkpoint()?;

        if report.failed > 0 {
            engine_warn!("Job {} finished with {} failed units", job_id, report.failed);
        }
        engine_info!(
            "Job {} done: {} gathered, {} created, {} updated, {} skipped, {} failed",
            job_id,
            report.gathered,
            report.created,
            report.updated,
            report.skipped,
            report.failed
        );
        Ok(report)
    }

    /// [`run_job`](Self::run_job) on a private current-thread runtime, for
    /// schedulers that are not async themselves.
    pub fn run_job_blocking(
        &self,
        store: &mut dyn RecordStore,
        job_id: JobId,
    ) -> Result<JobReport, EngineError> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(EngineError::Runtime)?;
        runtime.block_on(self.run_job(store, job_id))
    }
}

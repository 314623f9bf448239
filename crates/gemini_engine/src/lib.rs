//! Harvester engine: fetching, parsing, stores and the gather/fetch/import
//! pipeline.
mod catalog;
mod config;
mod decode;
mod engine;
mod extent;
mod fetch;
mod harvester;
mod import;
mod links;
mod parser;
mod persist;
mod store;
mod validate;
mod xml;

pub use catalog::{CatalogClient, CatalogError, CswClient, IdentifierPage, CSW_VERSION};
pub use config::{
    load_config, parse_config, save_config, CatalogConfig, ConfigError, FetchConfig,
    HarvestConfig, ImportConfig, ValidationPolicy,
};
pub use decode::{decode_output, decode_text, DecodeError, DecodedText};
pub use engine::{EngineError, HarvestEngine, JobReport};
pub use extent::{BboxExtentComputer, ExtentError, SpatialExtentComputer};
pub use fetch::{
    ContentFetcher, FailureKind, FetchError, FetchMetadata, FetchOutput, FetchSettings,
    ReqwestFetcher,
};
pub use harvester::{
    CatalogHarvester, DocumentHarvester, GatherError, GatherReport, Harvester, IndexHarvester,
};
pub use import::Reconciler;
pub use links::{LinkError, LinkExtractor};
pub use parser::{DocumentParser, ExtractedDocument, GeminiParser, ParseError, METADATA_ELEMENT};
pub use persist::{ensure_output_dir, AtomicFileWriter, PersistError};
pub use store::{InMemoryStore, JsonFileStore, RecordStore, SnapshotMode, StoreError};
pub use validate::{
    ProfileValidator, ValidationReport, Validator, GEMINI2_PROFILE, GMD_NAMESPACE,
    ISO19139_PROFILE,
};
pub use xml::XmlError;

//! Pure reconciliation rules: who may claim a GUID, when a document counts as
//! changed, and what record fields a document produces.

use crate::extras::GeminiExtras;
use crate::metadata::MetadataRecord;
use crate::model::{Record, Resource, Source, SourceId};

pub const RESOURCE_DESCRIPTION: &str = "Resource locator";
pub const SERVICE_FORMAT: &str = "WMS";
pub const UNVERIFIED_FORMAT: &str = "Unverified";

/// The most recent binding of a GUID, as found in the store.
#[derive(Debug, Clone)]
pub struct PriorClaim {
    pub source: Source,
    pub record: Record,
    /// `None` when the stored content of the prior unit no longer parses.
    pub metadata: Option<MetadataRecord>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Reconciliation {
    /// Nobody has bound this GUID yet.
    New,
    /// Another source bound this GUID most recently.
    Conflict { owner: Source },
    /// Same source, and the reference dates did not move.
    Unchanged { record: Record },
    /// Same source with a changed (or unreadable) prior document.
    Changed { record: Record },
}

/// Decide how an incoming document relates to what is already stored.
pub fn reconcile(
    incoming: &MetadataRecord,
    source_id: SourceId,
    prior: Option<PriorClaim>,
) -> Reconciliation {
    let Some(prior) = prior else {
        return Reconciliation::New;
    };
    if prior.source.id != source_id {
        return Reconciliation::Conflict {
            owner: prior.source,
        };
    }
    match prior.metadata {
        Some(previous) if is_unchanged(&previous, incoming) => Reconciliation::Unchanged {
            record: prior.record,
        },
        _ => Reconciliation::Changed {
            record: prior.record,
        },
    }
}

/// Reference dates are the only change signal; other fields are ignored.
pub fn is_unchanged(previous: &MetadataRecord, incoming: &MetadataRecord) -> bool {
    previous.change_signature() == incoming.change_signature()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NamePlan {
    Keep,
    Allocate,
}

/// Record fields produced by one document, before a name is chosen.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordDraft {
    pub title: String,
    pub notes: String,
    pub tags: Vec<String>,
    pub extras: GeminiExtras,
    pub resources: Vec<Resource>,
    pub name: NamePlan,
}

impl RecordDraft {
    pub fn new(metadata: &MetadataRecord, source: &Source, existing: Option<&Record>) -> Self {
        let name = match existing {
            Some(record) if record.title == metadata.title => NamePlan::Keep,
            _ => NamePlan::Allocate,
        };
        Self {
            title: metadata.title.clone(),
            notes: metadata.abstract_text.clone(),
            tags: metadata.tags.clone(),
            extras: GeminiExtras::from_metadata(metadata, source),
            resources: resources_for(metadata),
            name,
        }
    }

    /// Finish the draft into a store write. `name` is `None` to keep the
    /// current one.
    pub fn into_write(self, name: Option<String>) -> RecordWrite {
        RecordWrite {
            name,
            title: self.title,
            notes: self.notes,
            tags: self.tags,
            extras: self
                .extras
                .to_pairs()
                .into_iter()
                .map(|(key, value)| (key.to_string(), value))
                .collect(),
            resources: self.resources,
        }
    }
}

/// One transactional write against a record.
///
/// Tags and resources replace the stored lists; extras are upserted key by key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordWrite {
    pub name: Option<String>,
    pub title: String,
    pub notes: String,
    pub tags: Vec<String>,
    pub extras: Vec<(String, String)>,
    pub resources: Vec<Resource>,
}

/// At most one resource: the first locator, typed by the resource type.
pub fn resources_for(metadata: &MetadataRecord) -> Vec<Resource> {
    let Some(locator) = metadata
        .resource_locators
        .first()
        .filter(|locator| !locator.url.trim().is_empty())
    else {
        return Vec::new();
    };
    let format = if metadata.resource_type.as_deref() == Some("service") {
        SERVICE_FORMAT
    } else {
        UNVERIFIED_FORMAT
    };
    vec![Resource {
        url: locator.url.clone(),
        description: RESOURCE_DESCRIPTION.to_string(),
        format: format.to_string(),
    }]
}

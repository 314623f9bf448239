mod common;

use common::{init_logging, new_job, Doc};
use gemini_core::{SourceKind, Stage};
use gemini_engine::{CatalogConfig, HarvestConfig, HarvestEngine, InMemoryStore, RecordStore};
use pretty_assertions::assert_eq;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn engine(page_size: u32) -> HarvestEngine {
    HarvestEngine::from_config(&HarvestConfig {
        catalog: CatalogConfig { page_size },
        ..HarvestConfig::default()
    })
}

fn get_records(ids: &[&str], next: u32) -> String {
    let records: String = ids
        .iter()
        .map(|id| {
            format!(
                "<gmd:MD_Metadata><gmd:fileIdentifier><gco:CharacterString>{id}</gco:CharacterString></gmd:fileIdentifier></gmd:MD_Metadata>"
            )
        })
        .collect();
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<csw:GetRecordsResponse xmlns:csw="http://www.opengis.net/cat/csw/2.0.2" xmlns:gmd="http://www.isotc211.org/2005/gmd" xmlns:gco="http://www.isotc211.org/2005/gco">
  <csw:SearchStatus timestamp="2010-11-01T12:00:00"/>
  <csw:SearchResults numberOfRecordsMatched="5" numberOfRecordsReturned="{count}" nextRecord="{next}" elementSet="brief">{records}</csw:SearchResults>
</csw:GetRecordsResponse>"#,
        count = ids.len(),
    )
}

async fn mount_page(server: &MockServer, start: &str, body: String) {
    Mock::given(method("GET"))
        .and(path("/csw"))
        .and(query_param("request", "GetRecords"))
        .and(query_param("startPosition", start))
        .respond_with(ResponseTemplate::new(200).set_body_raw(body, "application/xml"))
        .mount(server)
        .await;
}

async fn mount_record(server: &MockServer, id: &str, body: String) {
    Mock::given(method("GET"))
        .and(path("/csw"))
        .and(query_param("request", "GetRecordById"))
        .and(query_param("id", id))
        .respond_with(ResponseTemplate::new(200).set_body_raw(body, "application/xml"))
        .mount(server)
        .await;
}

#[tokio::test]
async fn catalog_job_pages_and_enqueues_each_identifier_once() {
    init_logging();
    let server = MockServer::start().await;
    mount_page(&server, "1", get_records(&["a", "b"], 3)).await;
    mount_page(&server, "3", get_records(&["b", "", "c"], 0)).await;
    for id in ["a", "b", "c"] {
        let doc = Doc::new(id, &format!("Dataset {id}"));
        mount_record(&server, id, doc.csw_response()).await;
    }

    let mut store = InMemoryStore::new();
    let job = new_job(&mut store, &format!("{}/csw", server.uri()), SourceKind::Catalog);
    let report = engine(2).run_job(&mut store, job.id).await.unwrap();

    assert_eq!(report.gather_error, None);
    assert_eq!(report.gathered, 3);
    assert_eq!(report.fetched, 3);
    assert_eq!(report.created, 3);
    assert_eq!(report.failed, 0);

    let guids: Vec<String> = store
        .units_for_job(job.id)
        .into_iter()
        .map(|unit| unit.guid)
        .collect();
    assert_eq!(guids, vec!["a", "b", "c"]);
    let names: Vec<String> = store.records().into_iter().map(|r| r.name).collect();
    assert_eq!(names, vec!["dataset-a", "dataset-b", "dataset-c"]);
}

#[tokio::test]
async fn catalog_failure_after_first_page_keeps_gathered_units() {
    init_logging();
    let server = MockServer::start().await;
    mount_page(&server, "1", get_records(&["a", "b"], 3)).await;
    Mock::given(method("GET"))
        .and(path("/csw"))
        .and(query_param("startPosition", "3"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;
    for id in ["a", "b"] {
        mount_record(&server, id, Doc::new(id, &format!("Dataset {id}")).csw_response()).await;
    }

    let mut store = InMemoryStore::new();
    let job = new_job(&mut store, &format!("{}/csw", server.uri()), SourceKind::Catalog);
    let report = engine(2).run_job(&mut store, job.id).await.unwrap();

    assert_eq!(report.gather_error, None);
    assert_eq!(report.gathered, 2);
    assert_eq!(report.created, 2);
    assert_eq!(report.errors.len(), 1);
    let job = store.job(job.id).unwrap();
    assert_eq!(job.gather_errors.len(), 1);
    assert!(job.gather_errors[0].contains("position 3"));
}

#[tokio::test]
async fn unreachable_catalog_fails_the_gather() {
    init_logging();
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let mut store = InMemoryStore::new();
    let job = new_job(&mut store, &format!("{}/csw", server.uri()), SourceKind::Catalog);
    let report = engine(10).run_job(&mut store, job.id).await.unwrap();

    let message = report.gather_error.expect("gather error");
    assert!(message.starts_with("error contacting the CSW server"));
    assert_eq!(store.job(job.id).unwrap().gather_errors, vec![message]);
    assert!(store.units_for_job(job.id).is_empty());
}

#[tokio::test]
async fn empty_catalog_record_fails_the_unit_only() {
    init_logging();
    let server = MockServer::start().await;
    mount_page(&server, "1", get_records(&["a", "gone"], 0)).await;
    mount_record(&server, "a", Doc::new("a", "Dataset a").csw_response()).await;
    mount_record(
        &server,
        "gone",
        r#"<csw:GetRecordByIdResponse xmlns:csw="http://www.opengis.net/cat/csw/2.0.2"/>"#
            .to_string(),
    )
    .await;

    let mut store = InMemoryStore::new();
    let job = new_job(&mut store, &format!("{}/csw", server.uri()), SourceKind::Catalog);
    let report = engine(10).run_job(&mut store, job.id).await.unwrap();

    assert_eq!(report.created, 1);
    assert_eq!(report.failed, 1);
    let gone = store
        .units_for_job(job.id)
        .into_iter()
        .find(|unit| unit.guid == "gone")
        .unwrap();
    assert_eq!(gone.content, None);
    assert_eq!(gone.errors.len(), 1);
    assert_eq!(gone.errors[0].stage, Stage::Fetch);
    assert_eq!(gone.errors[0].message, "empty record for id gone");
}

#[tokio::test]
async fn single_document_is_gathered_with_its_content() {
    init_logging();
    let server = MockServer::start().await;
    let doc = Doc::new("doc-1", "Council Owned Litter Bins");
    Mock::given(method("GET"))
        .and(path("/gemini/doc.xml"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(doc.csw_response(), "text/xml"))
        .mount(&server)
        .await;

    let mut store = InMemoryStore::new();
    let url = format!("{}/gemini/doc.xml", server.uri());
    let job = new_job(&mut store, &url, SourceKind::SingleDocument);
    let engine = engine(10);
    let report = engine.run_job(&mut store, job.id).await.unwrap();

    assert_eq!(report.gathered, 1);
    assert_eq!(report.created, 1);
    let unit = store.units_for_job(job.id).remove(0);
    assert_eq!(unit.guid, "doc-1");
    assert!(unit.content.unwrap().starts_with("<gmd:MD_Metadata"));
    let record = store.record(unit.record_id.unwrap()).unwrap();
    assert_eq!(record.name, "council-owned-litter-bins");

    // Same source, same document: nothing to do the second time round.
    let second = store.insert_job(job.source.id).unwrap();
    let report = engine.run_job(&mut store, second.id).await.unwrap();
    assert_eq!(report.skipped, 1);
    assert_eq!(store.records().len(), 1);
}

#[tokio::test]
async fn malformed_single_document_fails_the_gather() {
    init_logging();
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/doc.xml"))
        .respond_with(ResponseTemplate::new(200).set_body_raw("<gmd:MD_Metadata>", "text/xml"))
        .mount(&server)
        .await;

    let mut store = InMemoryStore::new();
    let url = format!("{}/doc.xml", server.uri());
    let job = new_job(&mut store, &url, SourceKind::SingleDocument);
    let report = engine(10).run_job(&mut store, job.id).await.unwrap();

    let message = report.gather_error.expect("gather error");
    assert!(message.starts_with(&format!("could not get the GUID for {url}")));
    assert_eq!(report.gathered, 0);
}

#[tokio::test]
async fn index_page_harvests_linked_documents_and_records_link_errors() {
    init_logging();
    let server = MockServer::start().await;
    let index = r#"<html><body><h1>Index of /waf</h1>
<a href="one.xml">one.xml</a>
<a href="missing.xml">missing.xml</a>
<a href="../elsewhere.xml">parent</a>
<a href="two.xml?download=1">query</a>
</body></html>"#;
    Mock::given(method("GET"))
        .and(path("/waf/index.html"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(index, "text/html"))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/waf/one.xml"))
        .respond_with(
            ResponseTemplate::new(200).set_body_raw(Doc::new("one", "One").xml(), "text/xml"),
        )
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/waf/missing.xml"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let mut store = InMemoryStore::new();
    let url = format!("{}/waf/index.html", server.uri());
    let job = new_job(&mut store, &url, SourceKind::IndexPage);
    let report = engine(10).run_job(&mut store, job.id).await.unwrap();

    assert_eq!(report.gather_error, None);
    assert_eq!(report.gathered, 1);
    assert_eq!(report.created, 1);
    assert_eq!(report.errors.len(), 1);
    assert!(report.errors[0].contains("/waf/missing.xml"));
    assert_eq!(store.job(job.id).unwrap().gather_errors, report.errors);
}

#[tokio::test]
async fn index_page_without_documents_fails_the_gather() {
    init_logging();
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/waf/"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(
            r#"<html><body><a href="sub/">sub</a><a href="?C=M;O=A">sort</a></body></html>"#,
            "text/html",
        ))
        .mount(&server)
        .await;

    let mut store = InMemoryStore::new();
    let job = new_job(&mut store, &format!("{}/waf/", server.uri()), SourceKind::IndexPage);
    let report = engine(10).run_job(&mut store, job.id).await.unwrap();

    assert_eq!(
        report.gather_error.as_deref(),
        Some("couldn't find any links to metadata files")
    );
    assert_eq!(
        store.job(job.id).unwrap().gather_errors,
        vec!["couldn't find any links to metadata files".to_string()]
    );
}

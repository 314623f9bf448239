#![allow(dead_code)]

use std::sync::Once;

use gemini_core::{Job, NewSource, Source, SourceKind};
use gemini_engine::{InMemoryStore, RecordStore};

pub const GUID: &str = "00a743bf-cca4-4c19-a8e5-e64f7edbcadd";

pub fn init_logging() {
    static INIT: Once = Once::new();
    INIT.call_once(engine_logging::initialize_for_tests);
}

/// Knobs for the generated GEMINI document.
#[derive(Debug, Clone)]
pub struct Doc {
    pub guid: String,
    pub title: String,
    pub abstract_text: String,
    pub revision: String,
    pub resource_type: String,
    pub bbox: Option<[&'static str; 4]>,
    pub locator: Option<String>,
    pub keywords: Vec<String>,
}

impl Doc {
    pub fn new(guid: &str, title: &str) -> Self {
        Self {
            guid: guid.to_string(),
            title: title.to_string(),
            abstract_text: "Location of Council owned litter bins within Borough.".to_string(),
            revision: "2009-10-08".to_string(),
            resource_type: "dataset".to_string(),
            bbox: Some(["-3.32485", "-3.12442", "54.039634", "54.218407"]),
            locator: Some("http://www.barrowbc.gov.uk".to_string()),
            keywords: vec!["Utility and governmental services".to_string()],
        }
    }

    pub fn revision(mut self, revision: &str) -> Self {
        self.revision = revision.to_string();
        self
    }

    pub fn abstract_text(mut self, text: &str) -> Self {
        self.abstract_text = text.to_string();
        self
    }

    pub fn without_bbox(mut self) -> Self {
        self.bbox = None;
        self
    }

    pub fn bbox(mut self, bbox: [&'static str; 4]) -> Self {
        self.bbox = Some(bbox);
        self
    }

    pub fn keywords(mut self, keywords: &[&str]) -> Self {
        self.keywords = keywords.iter().map(|k| k.to_string()).collect();
        self
    }

    pub fn locator(mut self, locator: Option<&str>) -> Self {
        self.locator = locator.map(str::to_string);
        self
    }

    pub fn service(mut self) -> Self {
        self.resource_type = "service".to_string();
        self
    }

    /// The `MD_Metadata` element with its own namespace declarations.
    pub fn xml(&self) -> String {
        let keywords: String = self
            .keywords
            .iter()
            .map(|k| format!("<gmd:keyword><gco:CharacterString>{k}</gco:CharacterString></gmd:keyword>"))
            .collect();
        let bbox = self
            .bbox
            .map(|[west, east, south, north]| {
                format!(
                    r#"<gmd:geographicElement><gmd:EX_GeographicBoundingBox>
  <gmd:westBoundLongitude><gco:Decimal>{west}</gco:Decimal></gmd:westBoundLongitude>
  <gmd:eastBoundLongitude><gco:Decimal>{east}</gco:Decimal></gmd:eastBoundLongitude>
  <gmd:southBoundLatitude><gco:Decimal>{south}</gco:Decimal></gmd:southBoundLatitude>
  <gmd:northBoundLatitude><gco:Decimal>{north}</gco:Decimal></gmd:northBoundLatitude>
</gmd:EX_GeographicBoundingBox></gmd:geographicElement>"#
                )
            })
            .unwrap_or_default();
        let distribution = self
            .locator
            .as_ref()
            .map(|url| {
                format!(
                    r#"<gmd:distributionInfo><gmd:MD_Distribution><gmd:transferOptions><gmd:MD_DigitalTransferOptions><gmd:onLine><gmd:CI_OnlineResource>
  <gmd:linkage><gmd:URL>{url}</gmd:URL></gmd:linkage>
  <gmd:function><gmd:CI_OnLineFunctionCode codeList="http://standards.iso.org/ittf/PubliclyAvailableStandards/ISO_19139_Schemas/resources/Codelist/gmxCodelists.xml#CI_OnLineFunctionCode" codeListValue="information">information</gmd:CI_OnLineFunctionCode></gmd:function>
</gmd:CI_OnlineResource></gmd:onLine></gmd:MD_DigitalTransferOptions></gmd:transferOptions></gmd:MD_Distribution></gmd:distributionInfo>"#
                )
            })
            .unwrap_or_default();

        format!(
            r#"<gmd:MD_Metadata xmlns:gmd="http://www.isotc211.org/2005/gmd" xmlns:gco="http://www.isotc211.org/2005/gco" xmlns:gml="http://www.opengis.net/gml/3.2" xmlns:xlink="http://www.w3.org/1999/xlink">
  <gmd:fileIdentifier><gco:CharacterString>{guid}</gco:CharacterString></gmd:fileIdentifier>
  <gmd:language><gmd:LanguageCode codeList="http://www.loc.gov/standards/iso639-2/php/code_list.php" codeListValue="eng">eng</gmd:LanguageCode></gmd:language>
  <gmd:hierarchyLevel><gmd:MD_ScopeCode codeList="http://standards.iso.org/ittf/PubliclyAvailableStandards/ISO_19139_Schemas/resources/Codelist/gmxCodelists.xml#MD_ScopeCode" codeListValue="{resource_type}">{resource_type}</gmd:MD_ScopeCode></gmd:hierarchyLevel>
  <gmd:contact><gmd:CI_ResponsibleParty><gmd:organisationName><gco:CharacterString>Barrow Borough Council</gco:CharacterString></gmd:organisationName></gmd:CI_ResponsibleParty></gmd:contact>
  <gmd:dateStamp><gco:Date>2009-10-16</gco:Date></gmd:dateStamp>
  <gmd:referenceSystemInfo><gmd:MD_ReferenceSystem><gmd:referenceSystemIdentifier><gmd:RS_Identifier><gmd:code><gco:CharacterString>urn:ogc:def:crs:EPSG::27700</gco:CharacterString></gmd:code></gmd:RS_Identifier></gmd:referenceSystemIdentifier></gmd:MD_ReferenceSystem></gmd:referenceSystemInfo>
  <gmd:identificationInfo>
    <gmd:MD_DataIdentification>
      <gmd:citation><gmd:CI_Citation>
        <gmd:title><gco:CharacterString>{title}</gco:CharacterString></gmd:title>
        <gmd:date><gmd:CI_Date><gmd:date><gco:Date>2008-10-10</gco:Date></gmd:date><gmd:dateType><gmd:CI_DateTypeCode codeList="http://standards.iso.org/ittf/PubliclyAvailableStandards/ISO_19139_Schemas/resources/Codelist/gmxCodelists.xml#CI_DateTypeCode" codeListValue="creation">creation</gmd:CI_DateTypeCode></gmd:dateType></gmd:CI_Date></gmd:date>
        <gmd:date><gmd:CI_Date><gmd:date><gco:Date>{revision}</gco:Date></gmd:date><gmd:dateType><gmd:CI_DateTypeCode codeList="http://standards.iso.org/ittf/PubliclyAvailableStandards/ISO_19139_Schemas/resources/Codelist/gmxCodelists.xml#CI_DateTypeCode" codeListValue="revision">revision</gmd:CI_DateTypeCode></gmd:dateType></gmd:CI_Date></gmd:date>
      </gmd:CI_Citation></gmd:citation>
      <gmd:abstract><gco:CharacterString>{abstract_text}</gco:CharacterString></gmd:abstract>
      <gmd:descriptiveKeywords><gmd:MD_Keywords>{keywords}</gmd:MD_Keywords></gmd:descriptiveKeywords>
      <gmd:resourceConstraints><gmd:MD_Constraints><gmd:useLimitation><gco:CharacterString>conditions unknown</gco:CharacterString></gmd:useLimitation></gmd:MD_Constraints></gmd:resourceConstraints>
      <gmd:resourceConstraints><gmd:MD_LegalConstraints><gmd:accessConstraints><gmd:MD_RestrictionCode codeListValue="otherRestrictions">otherRestrictions</gmd:MD_RestrictionCode></gmd:accessConstraints><gmd:otherConstraints><gco:CharacterString>(e) intellectual property rights;</gco:CharacterString></gmd:otherConstraints></gmd:MD_LegalConstraints></gmd:resourceConstraints>
      <gmd:extent><gmd:EX_Extent>
        {bbox}
        <gmd:temporalElement><gmd:EX_TemporalExtent><gmd:extent><gml:TimePeriod gml:id="t1"><gml:beginPosition>1977-03-10T11:45:30</gml:beginPosition><gml:endPosition>2005-01-15T09:10:00</gml:endPosition></gml:TimePeriod></gmd:extent></gmd:EX_TemporalExtent></gmd:temporalElement>
      </gmd:EX_Extent></gmd:extent>
    </gmd:MD_DataIdentification>
  </gmd:identificationInfo>
  {distribution}
</gmd:MD_Metadata>"#,
            guid = self.guid,
            resource_type = self.resource_type,
            title = self.title,
            revision = self.revision,
            abstract_text = self.abstract_text,
        )
    }

    /// The same document inside a CSW `GetRecordById` response.
    pub fn csw_response(&self) -> String {
        let xml = self.xml().replace(
            r#"<gmd:MD_Metadata xmlns:gmd="http://www.isotc211.org/2005/gmd" "#,
            "<gmd:MD_Metadata ",
        );
        format!(
            r#"<?xml version="1.0" encoding="UTF-8"?>
<csw:GetRecordByIdResponse xmlns:csw="http://www.opengis.net/cat/csw/2.0.2" xmlns:gmd="http://www.isotc211.org/2005/gmd">
{xml}
</csw:GetRecordByIdResponse>"#
        )
    }
}

pub fn add_source(store: &mut dyn RecordStore, url: &str, kind: SourceKind) -> Source {
    store
        .insert_source(NewSource {
            url: url.to_string(),
            kind,
            publisher_id: Some("12".to_string()),
            user_id: Some("harvest-admin".to_string()),
        })
        .unwrap()
}

pub fn new_job(store: &mut InMemoryStore, url: &str, kind: SourceKind) -> Job {
    let source = add_source(store, url, kind);
    store.insert_job(source.id).unwrap()
}

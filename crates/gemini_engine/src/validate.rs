use crate::parser::METADATA_ELEMENT;
use crate::xml::{parse_xml, XmlElement};

pub const GMD_NAMESPACE: &str = "http://www.isotc211.org/2005/gmd";
pub const ISO19139_PROFILE: &str = "iso19139";
pub const GEMINI2_PROFILE: &str = "gemini2";

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ValidationReport {
    pub valid: bool,
    pub messages: Vec<String>,
}

impl ValidationReport {
    fn from_messages(messages: Vec<String>) -> Self {
        Self {
            valid: messages.is_empty(),
            messages,
        }
    }
}

pub trait Validator: Send + Sync {
    fn validate(&self, document: &str, profiles: &[String]) -> ValidationReport;
}

/// Structural checks for the `iso19139` and `gemini2` profiles.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProfileValidator;

impl ProfileValidator {
    pub fn new() -> Self {
        Self
    }
}

impl Validator for ProfileValidator {
    fn validate(&self, document: &str, profiles: &[String]) -> ValidationReport {
        let root = match parse_xml(document) {
            Ok(root) => root,
            Err(err) => return ValidationReport::from_messages(vec![err.to_string()]),
        };

        let mut messages = Vec::new();
        for profile in profiles {
            match profile.as_str() {
                ISO19139_PROFILE => check_iso19139(&root, &mut messages),
                GEMINI2_PROFILE => check_gemini2(&root, &mut messages),
                other => messages.push(format!("unknown validation profile {other:?}")),
            }
        }
        ValidationReport::from_messages(messages)
    }
}

fn check_iso19139(root: &XmlElement, messages: &mut Vec<String>) {
    if root.name != METADATA_ELEMENT {
        messages.push(format!(
            "{ISO19139_PROFILE}: root element is {}, expected {METADATA_ELEMENT}",
            root.name
        ));
    } else if root.namespace.as_deref() != Some(GMD_NAMESPACE) {
        messages.push(format!(
            "{ISO19139_PROFILE}: {METADATA_ELEMENT} is not in namespace {GMD_NAMESPACE}"
        ));
    }
}

/// GEMINI 2 mandatory elements, by path below `MD_Metadata`.
const GEMINI2_MANDATORY: &[(&str, &[&str])] = &[
    ("file identifier", &["fileIdentifier"]),
    ("metadata language", &["language"]),
    ("resource type", &["hierarchyLevel"]),
    ("metadata point of contact", &["contact"]),
    ("metadata date", &["dateStamp"]),
    ("title", &["identificationInfo", "*", "citation", "CI_Citation", "title"]),
    (
        "dataset reference date",
        &["identificationInfo", "*", "citation", "CI_Citation", "date"],
    ),
    ("abstract", &["identificationInfo", "*", "abstract"]),
    ("keyword", &["identificationInfo", "*", "descriptiveKeywords"]),
    ("constraints", &["identificationInfo", "*", "resourceConstraints"]),
    ("extent", &["identificationInfo", "*", "extent"]),
];

fn check_gemini2(root: &XmlElement, messages: &mut Vec<String>) {
    let Some(metadata) = root.descendant(METADATA_ELEMENT) else {
        messages.push(format!("{GEMINI2_PROFILE}: no {METADATA_ELEMENT} element"));
        return;
    };
    for (label, path) in GEMINI2_MANDATORY {
        if metadata.find(path).is_none() {
            messages.push(format!("{GEMINI2_PROFILE}: missing mandatory element {label}"));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn profiles(names: &[&str]) -> Vec<String> {
        names.iter().map(|name| name.to_string()).collect()
    }

    #[test]
    fn wrong_root_fails_iso19139() {
        let report = ProfileValidator.validate("<record/>", &profiles(&[ISO19139_PROFILE]));
        assert!(!report.valid);
        assert_eq!(report.messages.len(), 1);
    }

    #[test]
    fn wrong_namespace_fails_iso19139() {
        let report = ProfileValidator.validate(
            r#"<m:MD_Metadata xmlns:m="urn:other"/>"#,
            &profiles(&[ISO19139_PROFILE]),
        );
        assert!(report.messages[0].contains("namespace"));
    }

    #[test]
    fn unknown_profile_is_reported() {
        let report = ProfileValidator.validate(
            r#"<gmd:MD_Metadata xmlns:gmd="http://www.isotc211.org/2005/gmd"/>"#,
            &profiles(&[ISO19139_PROFILE, "fgdc"]),
        );
        assert_eq!(report.messages, vec!["unknown validation profile \"fgdc\"".to_string()]);
    }

    #[test]
    fn gemini2_lists_every_missing_element() {
        let report = ProfileValidator.validate(
            r#"<gmd:MD_Metadata xmlns:gmd="http://www.isotc211.org/2005/gmd"><gmd:fileIdentifier/></gmd:MD_Metadata>"#,
            &profiles(&[GEMINI2_PROFILE]),
        );
        assert_eq!(report.messages.len(), GEMINI2_MANDATORY.len() - 1);
    }
}

//! Small owned element tree over quick-xml.
//!
//! Element and attribute names are kept as local names; the resolved
//! namespace URI is kept alongside. Every element remembers the byte span it
//! occupies in the source text so that a sub-document can be cut out again.

use std::ops::Range;

use quick_xml::escape::escape;
use quick_xml::events::{BytesStart, Event};
use quick_xml::name::ResolveResult;
use quick_xml::NsReader;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum XmlError {
    #[error("malformed xml at byte {position}: {message}")]
    Malformed { position: usize, message: String },
    #[error("document is empty")]
    Empty,
    #[error("unclosed element <{0}>")]
    Unclosed(String),
    #[error("more than one root element")]
    MultipleRoots,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct XmlElement {
    pub name: String,
    pub namespace: Option<String>,
    pub attributes: Vec<(String, String)>,
    /// `xmlns` / `xmlns:prefix` declarations made on this element.
    pub namespace_declarations: Vec<(String, String)>,
    pub children: Vec<XmlElement>,
    pub text: String,
    pub span: Range<usize>,
}

impl XmlElement {
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    /// Elements reached by following `path` from this element; `*` matches any
    /// child.
    pub fn find_all(&self, path: &[&str]) -> Vec<&XmlElement> {
        let mut current = vec![self];
        for step in path {
            current = current
                .into_iter()
                .flat_map(|element| element.children.iter())
                .filter(|child| *step == "*" || child.name == *step)
                .collect();
        }
        current
    }

    pub fn find(&self, path: &[&str]) -> Option<&XmlElement> {
        self.find_all(path).into_iter().next()
    }

    /// All descendant text, whitespace-trimmed. `None` when blank.
    pub fn text_content(&self) -> Option<String> {
        let mut out = String::new();
        self.collect_text(&mut out);
        let trimmed = out.trim();
        (!trimmed.is_empty()).then(|| trimmed.to_string())
    }

    /// `text_content` of the element at `path`.
    pub fn text_at(&self, path: &[&str]) -> Option<String> {
        self.find(path).and_then(XmlElement::text_content)
    }

    /// Depth-first search including `self`, returning the match and its
    /// ancestors (outermost first).
    pub fn descendant_with_ancestors<'a>(
        &'a self,
        name: &str,
    ) -> Option<(&'a XmlElement, Vec<&'a XmlElement>)> {
        if self.name == name {
            return Some((self, Vec::new()));
        }
        for child in &self.children {
            if let Some((found, mut ancestors)) = child.descendant_with_ancestors(name) {
                ancestors.insert(0, self);
                return Some((found, ancestors));
            }
        }
        None
    }

    pub fn descendant(&self, name: &str) -> Option<&XmlElement> {
        self.descendant_with_ancestors(name).map(|(found, _)| found)
    }

    fn collect_text(&self, out: &mut String) {
        out.push_str(&self.text);
        for child in &self.children {
            child.collect_text(out);
        }
    }
}

/// Parse a complete document and return its root element.
pub fn parse_xml(source: &str) -> Result<XmlElement, XmlError> {
    let mut reader = NsReader::from_str(source);
    let mut stack: Vec<XmlElement> = Vec::new();
    let mut root: Option<XmlElement> = None;

    loop {
        let start = reader.buffer_position() as usize;
        let (namespace, event) = {
            let (resolved, event) = reader
                .read_resolved_event()
                .map_err(|err| malformed(start, err))?;
            (resolved_namespace(&resolved), event)
        };
        let end = reader.buffer_position() as usize;

        match event {
            Event::Start(tag) => {
                let tag_start = tag_start(source, start, end);
                let element = open_element(&tag, namespace, tag_start..tag_start, end)?;
                stack.push(element);
            }
            Event::Empty(tag) => {
                let tag_start = tag_start(source, start, end);
                let element = open_element(&tag, namespace, tag_start..end, end)?;
                attach(&mut stack, &mut root, element)?;
            }
            Event::End(_) => {
                if let Some(mut element) = stack.pop() {
                    element.span.end = end;
                    attach(&mut stack, &mut root, element)?;
                }
            }
            Event::Text(text) => {
                let text = text.unescape().map_err(|err| malformed(start, err))?;
                push_text(&mut stack, &text, start)?;
            }
            Event::CData(data) => {
                let bytes = data.into_inner();
                push_text(&mut stack, &String::from_utf8_lossy(&bytes), start)?;
            }
            Event::Eof => break,
            Event::Decl(_) | Event::PI(_) | Event::DocType(_) | Event::Comment(_) => {}
        }
    }

    if let Some(open) = stack.pop() {
        return Err(XmlError::Unclosed(open.name));
    }
    root.ok_or(XmlError::Empty)
}

/// Cut `element` out of `source` as a standalone document, copying namespace
/// declarations inherited from `ancestors` onto its start tag.
pub fn standalone_fragment(
    source: &str,
    element: &XmlElement,
    ancestors: &[&XmlElement],
) -> String {
    let fragment = &source[element.span.clone()];
    let mut inherited: Vec<(String, String)> = Vec::new();
    for ancestor in ancestors {
        for (key, value) in &ancestor.namespace_declarations {
            inherited.retain(|(existing, _)| existing != key);
            inherited.push((key.clone(), value.clone()));
        }
    }
    inherited.retain(|(key, _)| {
        !element
            .namespace_declarations
            .iter()
            .any(|(own, _)| own == key)
    });
    if inherited.is_empty() {
        return fragment.to_string();
    }

    let name_end = fragment
        .char_indices()
        .skip(1)
        .find(|(_, c)| c.is_whitespace() || *c == '>' || *c == '/')
        .map(|(index, _)| index)
        .unwrap_or(fragment.len());
    let mut out = String::with_capacity(fragment.len() + inherited.len() * 64);
    out.push_str(&fragment[..name_end]);
    for (key, value) in &inherited {
        out.push(' ');
        out.push_str(key);
        out.push_str("=\"");
        out.push_str(&escape(value.as_str()));
        out.push('"');
    }
    out.push_str(&fragment[name_end..]);
    out
}

/// Offset of the `<` opening the tag that ends just before `end`. Markup
/// cannot contain a raw `<`, so the last one before `end` is it.
fn tag_start(source: &str, fallback: usize, end: usize) -> usize {
    source
        .get(..end)
        .and_then(|head| head.rfind('<'))
        .unwrap_or(fallback)
}

fn open_element(
    tag: &BytesStart<'_>,
    namespace: Option<String>,
    span: Range<usize>,
    position: usize,
) -> Result<XmlElement, XmlError> {
    let mut element = XmlElement {
        name: String::from_utf8_lossy(tag.local_name().as_ref()).into_owned(),
        namespace,
        span,
        ..XmlElement::default()
    };
    for attr in tag.attributes() {
        let attr = attr.map_err(|err| malformed(position, err))?;
        let raw_key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
        let value = attr
            .unescape_value()
            .map_err(|err| malformed(position, err))?
            .into_owned();
        if raw_key == "xmlns" || raw_key.starts_with("xmlns:") {
            element.namespace_declarations.push((raw_key, value));
        } else {
            let local = String::from_utf8_lossy(attr.key.local_name().as_ref()).into_owned();
            element.attributes.push((local, value));
        }
    }
    Ok(element)
}

fn attach(
    stack: &mut [XmlElement],
    root: &mut Option<XmlElement>,
    element: XmlElement,
) -> Result<(), XmlError> {
    match stack.last_mut() {
        Some(parent) => parent.children.push(element),
        None if root.is_none() => *root = Some(element),
        None => return Err(XmlError::MultipleRoots),
    }
    Ok(())
}

fn push_text(stack: &mut [XmlElement], text: &str, position: usize) -> Result<(), XmlError> {
    match stack.last_mut() {
        Some(parent) => parent.text.push_str(text),
        None if text.trim().is_empty() => {}
        None => {
            return Err(XmlError::Malformed {
                position,
                message: "text outside the root element".to_string(),
            })
        }
    }
    Ok(())
}

fn resolved_namespace(resolved: &ResolveResult<'_>) -> Option<String> {
    match resolved {
        ResolveResult::Bound(namespace) => {
            Some(String::from_utf8_lossy(namespace.as_ref()).into_owned())
        }
        ResolveResult::Unbound | ResolveResult::Unknown(_) => None,
    }
}

fn malformed(position: usize, err: impl std::fmt::Display) -> XmlError {
    XmlError::Malformed {
        position,
        message: err.to_string(),
    }
}

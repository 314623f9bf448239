use scraper::{Html, Selector};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LinkError {
    #[error("index page could not be parsed: {0}")]
    Unparsable(String),
}

/// Finds the document links on a WAF style index page.
///
/// Only bare file names are kept: anything carrying a query string or a path
/// separator is ignored. Survivors are resolved against the directory of the
/// page, in document order and without de-duplication.
#[derive(Debug, Clone, Copy, Default)]
pub struct LinkExtractor;

impl LinkExtractor {
    pub fn new() -> Self {
        Self
    }

    pub fn extract(&self, html: &str, base_url: &str) -> Result<Vec<String>, LinkError> {
        if html.trim().is_empty() {
            return Err(LinkError::Unparsable("empty body".to_string()));
        }
        let selector =
            Selector::parse("a[href]").map_err(|err| LinkError::Unparsable(err.to_string()))?;
        let document = Html::parse_document(html);
        let directory = base_directory(base_url);

        let links = document
            .select(&selector)
            .filter_map(|anchor| anchor.value().attr("href"))
            .map(str::trim)
            .filter(|href| !href.is_empty() && !href.contains('?') && !href.contains('/'))
            .map(|href| format!("{directory}{href}"))
            .collect();
        Ok(links)
    }
}

/// `http://h/dir/index.html` and `http://h/dir/` both become `http://h/dir/`.
fn base_directory(base_url: &str) -> String {
    let mut parts: Vec<&str> = base_url.split('/').collect();
    if parts.last().is_some_and(|last| last.contains("index")) {
        parts.pop();
    }
    let joined = parts.join("/");
    format!("{}/", joined.trim_end_matches('/'))
}

//! Single-attempt HTTP retrieval for catalog requests and harvested documents.

use std::fmt;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use engine_logging::{engine_debug, engine_warn};
use futures_util::StreamExt;
use reqwest::header::{HeaderValue, ACCEPT, CONTENT_TYPE};
use reqwest::redirect::Policy;
use reqwest::{Client, Response, Url};
use thiserror::Error;

/// XML first; index pages come back as HTML.
const ACCEPT_DOCUMENTS: &str = "application/xml, text/xml;q=0.9, text/html;q=0.8, */*;q=0.5";
const USER_AGENT: &str = concat!("gemini-harvester/", env!("CARGO_PKG_VERSION"));

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchOutput {
    pub bytes: Vec<u8>,
    pub metadata: FetchMetadata,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchMetadata {
    pub requested_url: String,
    pub final_url: String,
    /// Every location the server redirected to, in order. The last one is
    /// `final_url`.
    pub redirects: Vec<String>,
    pub content_type: Option<String>,
    pub byte_len: u64,
}

impl FetchMetadata {
    /// Lowercased media type without parameters.
    pub fn media_type(&self) -> Option<String> {
        self.content_type.as_deref().map(media_type)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{kind}: {message}")]
pub struct FetchError {
    pub kind: FailureKind,
    pub message: String,
}

impl FetchError {
    fn new(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureKind {
    InvalidUrl,
    HttpStatus(u16),
    Timeout,
    TooManyRedirects,
    TooLarge { max_bytes: u64, actual: Option<u64> },
    UnsupportedContentType { content_type: String },
    Network,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureKind::InvalidUrl => write!(f, "invalid url"),
            FailureKind::HttpStatus(code) => write!(f, "http status {code}"),
            FailureKind::Timeout => write!(f, "timed out"),
            FailureKind::TooManyRedirects => write!(f, "too many redirects"),
            FailureKind::TooLarge { max_bytes, actual } => match actual {
                Some(actual) => write!(f, "body of {actual} bytes exceeds {max_bytes}"),
                None => write!(f, "body exceeds {max_bytes} bytes"),
            },
            FailureKind::UnsupportedContentType { content_type } => {
                write!(f, "unsupported content type {content_type}")
            }
            FailureKind::Network => write!(f, "network error"),
        }
    }
}

/// Transport limits. Defaults: connect 10s, request 30s, 5 redirects, 10 MiB.
#[derive(Debug, Clone)]
pub struct FetchSettings {
    pub connect_timeout: Duration,
    pub request_timeout: Duration,
    pub redirect_limit: usize,
    pub max_bytes: u64,
    /// Accepted media types; empty accepts anything.
    pub allowed_content_types: Vec<String>,
}

impl Default for FetchSettings {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(10),
            request_timeout: Duration::from_secs(30),
            redirect_limit: 5,
            max_bytes: 10 * 1024 * 1024,
            allowed_content_types: Vec::new(),
        }
    }
}

/// Retrieves raw bytes. One attempt per call: no retry, no backoff.
#[async_trait::async_trait]
pub trait ContentFetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<FetchOutput, FetchError>;
}

#[derive(Debug, Clone)]
pub struct ReqwestFetcher {
    settings: FetchSettings,
}

impl ReqwestFetcher {
    pub fn new(settings: FetchSettings) -> Self {
        Self { settings }
    }

    /// A client whose redirect policy appends each hop to `hops`.
    fn client(&self, hops: Arc<Mutex<Vec<String>>>) -> Result<Client, FetchError> {
        let limit = self.settings.redirect_limit;
        let policy = Policy::custom(move |attempt| {
            // `previous` holds the original request plus every hop so far.
            if attempt.previous().len() > limit {
                return attempt.error(format!("more than {limit} redirects"));
            }
            if let Ok(mut hops) = hops.lock() {
                hops.push(attempt.url().to_string());
            }
            attempt.follow()
        });

        Client::builder()
            .user_agent(USER_AGENT)
            .connect_timeout(self.settings.connect_timeout)
            .timeout(self.settings.request_timeout)
            .redirect(policy)
            .build()
            .map_err(|err| FetchError::new(FailureKind::Network, err.to_string()))
    }

    fn check_response(&self, response: &Response) -> Result<(), FetchError> {
        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::new(
                FailureKind::HttpStatus(status.as_u16()),
                status.to_string(),
            ));
        }
        if let Some(length) = response.content_length() {
            if length > self.settings.max_bytes {
                return Err(self.too_large(Some(length)));
            }
        }
        if let Some(content_type) = header_content_type(response) {
            if !self.accepts(&content_type) {
                return Err(FetchError::new(
                    FailureKind::UnsupportedContentType { content_type },
                    "content type not in the allowed list",
                ));
            }
        }
        Ok(())
    }

    fn accepts(&self, content_type: &str) -> bool {
        let allowed = &self.settings.allowed_content_types;
        if allowed.is_empty() {
            return true;
        }
        let media = media_type(content_type);
        allowed.iter().any(|entry| entry.eq_ignore_ascii_case(&media))
    }

    /// Collect the body, failing as soon as it grows past the byte cap.
    async fn read_body(&self, response: Response) -> Result<Vec<u8>, FetchError> {
        let max = self.settings.max_bytes;
        let hint = response.content_length().unwrap_or(0).min(max);
        let mut body = Vec::with_capacity(usize::try_from(hint).unwrap_or(0));
        let mut chunks = response.bytes_stream();
        while let Some(chunk) = chunks.next().await {
            let chunk = chunk.map_err(transport_error)?;
            if (body.len() + chunk.len()) as u64 > max {
                return Err(self.too_large(None));
            }
            body.extend_from_slice(&chunk);
        }
        Ok(body)
    }

    fn too_large(&self, actual: Option<u64>) -> FetchError {
        FetchError::new(
            FailureKind::TooLarge {
                max_bytes: self.settings.max_bytes,
                actual,
            },
            "response too large",
        )
    }
}

#[async_trait::async_trait]
impl ContentFetcher for ReqwestFetcher {
    async fn fetch(&self, url: &str) -> Result<FetchOutput, FetchError> {
        let target = Url::parse(url)
            .map_err(|err| FetchError::new(FailureKind::InvalidUrl, err.to_string()))?;
        let hops = Arc::new(Mutex::new(Vec::new()));
        let client = self.client(hops.clone())?;

        engine_debug!("GET {}", target);
        let response = client
            .get(target)
            .header(ACCEPT, HeaderValue::from_static(ACCEPT_DOCUMENTS))
            .send()
            .await
            .map_err(transport_error)?;
        if let Err(err) = self.check_response(&response) {
            engine_warn!("GET {} failed: {}", url, err);
            return Err(err);
        }

        let final_url = response.url().to_string();
        let content_type = header_content_type(&response);
        let bytes = self.read_body(response).await?;
        let redirects = hops.lock().map(|hops| hops.clone()).unwrap_or_default();
        if !redirects.is_empty() {
            engine_debug!("{} redirected {} times to {}", url, redirects.len(), final_url);
        }

        let metadata = FetchMetadata {
            requested_url: url.to_string(),
            final_url,
            redirects,
            content_type,
            byte_len: bytes.len() as u64,
        };
        engine_debug!("Fetched {} bytes from {}", metadata.byte_len, metadata.final_url);
        Ok(FetchOutput { bytes, metadata })
    }
}

fn header_content_type(response: &Response) -> Option<String> {
    response
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .map(str::to_string)
}

fn media_type(content_type: &str) -> String {
    content_type
        .split(';')
        .next()
        .unwrap_or(content_type)
        .trim()
        .to_ascii_lowercase()
}

fn transport_error(err: reqwest::Error) -> FetchError {
    let kind = if err.is_timeout() {
        FailureKind::Timeout
    } else if err.is_redirect() {
        FailureKind::TooManyRedirects
    } else {
        FailureKind::Network
    };
    FetchError::new(kind, err.to_string())
}

//! HTTP fetch seam
//!
//! Checks never talk to the network directly. They go through a `Fetcher`:
//! - `HttpFetcher`: blocking reqwest client for real runs
//! - `crate::mock::MockFetcher`: in-memory responses for tests

use std::io::Read;
use std::time::Duration;

use reqwest::blocking::{Client, Response};
use reqwest::StatusCode;
use url::Url;

use super::HeaderMap;

/// Fetch trait for gate network access
pub trait Fetcher: Send + Sync {
    /// HEAD request returning response headers
    fn head(&self, url: &Url, timeout: Duration) -> Result<HeaderMap, FetchError>;

    /// GET request returning the whole body
    fn get_bytes(&self, url: &Url, timeout: Duration) -> Result<Vec<u8>, FetchError>;

    /// GET request returning a body reader, for content that is hashed rather
    /// than buffered
    fn get_stream<'a>(
        &'a self,
        url: &Url,
        timeout: Duration,
    ) -> Result<Box<dyn Read + 'a>, FetchError>;
}

/// Fetch errors
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("{url} not found (HTTP 404)")]
    NotFound { url: String },

    #[error("{url} returned HTTP {status}")]
    Status { url: String, status: u16 },

    #[error("request to {url} timed out")]
    Timeout { url: String },

    #[error("request to {url} failed: {message}")]
    Request { url: String, message: String },

    #[error("{url} response has no usable {header} header")]
    MissingHeader { url: String, header: String },

    #[error("I/O error reading {url}: {source}")]
    Io {
        url: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Neither origin is resolvable: {}", .candidates.join(" nor "))]
    Unresolvable { candidates: Vec<String> },

    #[error("HTTP client setup failed: {0}")]
    Client(String),
}

/// Real fetcher backed by a blocking reqwest client
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    pub fn new() -> Result<Self, FetchError> {
        let client = Client::builder()
            .user_agent(concat!("release-gate/", env!("CARGO_PKG_VERSION")))
            .redirect(reqwest::redirect::Policy::limited(10))
            .build()
            .map_err(|e| FetchError::Client(e.to_string()))?;
        Ok(Self { client })
    }

    fn classify(url: &Url, err: reqwest::Error) -> FetchError {
        if err.is_timeout() {
            FetchError::Timeout {
                url: url.to_string(),
            }
        } else {
            FetchError::Request {
                url: url.to_string(),
                message: err.to_string(),
            }
        }
    }

    fn check_status(url: &Url, response: Response) -> Result<Response, FetchError> {
        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(FetchError::NotFound {
                url: url.to_string(),
            });
        }
        if !status.is_success() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }
        Ok(response)
    }

    fn headers_of(response: &Response) -> HeaderMap {
        let mut headers = HeaderMap::new();
        for (name, value) in response.headers() {
            headers.insert(name.as_str(), &String::from_utf8_lossy(value.as_bytes()));
        }
        headers
    }
}

impl Fetcher for HttpFetcher {
    fn head(&self, url: &Url, timeout: Duration) -> Result<HeaderMap, FetchError> {
        tracing::debug!("HEAD {}", url);
        let response = self
            .client
            .head(url.clone())
            .timeout(timeout)
            .send()
            .map_err(|e| Self::classify(url, e))?;
        let response = Self::check_status(url, response)?;
        Ok(Self::headers_of(&response))
    }

    fn get_bytes(&self, url: &Url, timeout: Duration) -> Result<Vec<u8>, FetchError> {
        tracing::debug!("GET {}", url);
        let response = self
            .client
            .get(url.clone())
            .timeout(timeout)
            .send()
            .map_err(|e| Self::classify(url, e))?;
        let response = Self::check_status(url, response)?;
        let bytes = response.bytes().map_err(|e| Self::classify(url, e))?;
        Ok(bytes.to_vec())
    }

    fn get_stream<'a>(
        &'a self,
        url: &Url,
        timeout: Duration,
    ) -> Result<Box<dyn Read + 'a>, FetchError> {
        tracing::debug!("GET (stream) {}", url);
        let response = self
            .client
            .get(url.clone())
            .timeout(timeout)
            .send()
            .map_err(|e| Self::classify(url, e))?;
        let response = Self::check_status(url, response)?;
        Ok(Box::new(response))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = FetchError::NotFound {
            url: "https://updates.example.com/stable/latest.yml".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "https://updates.example.com/stable/latest.yml not found (HTTP 404)"
        );

        let err = FetchError::Unresolvable {
            candidates: vec!["a.example.com".to_string(), "b.pages.dev".to_string()],
        };
        assert_eq!(
            err.to_string(),
            "Neither origin is resolvable: a.example.com nor b.pages.dev"
        );
    }

    #[test]
    fn test_http_fetcher_builds() {
        assert!(HttpFetcher::new().is_ok());
    }
}

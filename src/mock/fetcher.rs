//! In-memory fetcher

use std::collections::HashMap;
use std::io::{Cursor, Read};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use url::Url;

use super::failure::{FailureConfig, FailureInjector};
use crate::net::{FetchError, Fetcher, HeaderMap};

/// Request method as recorded by the mock
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    Head,
    Get,
}

/// A served resource
#[derive(Debug, Clone, Default)]
pub struct MockResource {
    pub body: Vec<u8>,
    pub headers: Vec<(String, String)>,
}

impl MockResource {
    pub fn new(body: impl Into<Vec<u8>>) -> Self {
        Self {
            body: body.into(),
            headers: Vec::new(),
        }
    }

    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        self.headers.push((name.to_string(), value.to_string()));
        self
    }

    /// Headers as served. `Content-Length` defaults to the body length.
    fn header_map(&self) -> HeaderMap {
        let mut headers: HeaderMap = self.headers.iter().cloned().collect();
        if !headers.contains("content-length") {
            headers.insert("content-length", &self.body.len().to_string());
        }
        headers
    }
}

/// Fetcher serving registered URLs from memory.
///
/// Unknown URLs answer 404. Every request is recorded.
#[derive(Debug, Default, Clone)]
pub struct MockFetcher {
    resources: Arc<Mutex<HashMap<String, MockResource>>>,
    failures: Arc<Mutex<FailureInjector>>,
    requests: Arc<Mutex<Vec<(Method, String)>>>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl MockFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Serve `resource` at `url`
    pub fn insert(&self, url: &str, resource: MockResource) {
        lock(&self.resources).insert(url.to_string(), resource);
    }

    pub fn with_resource(self, url: &str, resource: MockResource) -> Self {
        self.insert(url, resource);
        self
    }

    /// Stop serving `url`
    pub fn remove(&self, url: &str) {
        lock(&self.resources).remove(url);
    }

    /// Inject a failure for requests to `url`
    pub fn inject_failure(&self, url: &str, config: FailureConfig) {
        lock(&self.failures).inject(url, config);
    }

    pub fn clear_failures(&self) {
        lock(&self.failures).clear();
    }

    /// All requests made so far, in order
    pub fn requests(&self) -> Vec<(Method, String)> {
        lock(&self.requests).clone()
    }

    /// Number of requests made to `url` with `method`
    pub fn request_count(&self, method: Method, url: &str) -> usize {
        lock(&self.requests)
            .iter()
            .filter(|(m, u)| *m == method && u == url)
            .count()
    }

    fn serve(&self, method: Method, url: &Url) -> Result<MockResource, FetchError> {
        let key = url.as_str().to_string();
        lock(&self.requests).push((method, key.clone()));

        if let Some(failure) = lock(&self.failures).check(&key) {
            return Err(failure.to_error(&key));
        }

        lock(&self.resources)
            .get(&key)
            .cloned()
            .ok_or(FetchError::NotFound { url: key })
    }
}

impl Fetcher for MockFetcher {
    fn head(&self, url: &Url, _timeout: Duration) -> Result<HeaderMap, FetchError> {
        self.serve(Method::Head, url).map(|r| r.header_map())
    }

    fn get_bytes(&self, url: &Url, _timeout: Duration) -> Result<Vec<u8>, FetchError> {
        self.serve(Method::Get, url).map(|r| r.body)
    }

    fn get_stream<'a>(
        &'a self,
        url: &Url,
        _timeout: Duration,
    ) -> Result<Box<dyn Read + 'a>, FetchError> {
        let resource = self.serve(Method::Get, url)?;
        Ok(Box::new(Cursor::new(resource.body)))
    }
}

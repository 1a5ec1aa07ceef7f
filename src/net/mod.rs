//! Network access for the gate
//!
//! - `Fetcher`: HEAD/GET seam with a reqwest implementation
//! - `HeaderMap`: case-insensitive response headers
//! - `pick_origin`: DNS-based primary/fallback origin selection

mod fetch;
mod headers;
mod origin;

pub use fetch::{FetchError, Fetcher, HttpFetcher};
pub use headers::HeaderMap;
pub use origin::{pick_origin, Resolver, SystemResolver};

use url::Url;

/// Join path segments onto an origin.
///
/// Segments are appended verbatim, so an already percent-encoded filename
/// stays encoded exactly once.
pub fn join_url(origin: &Url, segments: &[&str]) -> Result<Url, url::ParseError> {
    let mut out = origin.as_str().trim_end_matches('/').to_string();
    for segment in segments {
        let segment = segment.trim_matches('/');
        if segment.is_empty() {
            continue;
        }
        out.push('/');
        out.push_str(segment);
    }
    Url::parse(&out)
}

//! Caching HTTP transport with ETag revalidation.
//!
//! [`CachingTransport`] wraps any [`HttpTransport`] and is the single network
//! chokepoint of the engine. Successful or not, every GET/HEAD response
//! other than a 304 is stored under its exact URL. The next request to that
//! URL carries the stored `ETag` in `If-None-Match`; a GET answered with
//! `304 Not Modified` is turned back into the stored response, keeping its
//! status code and body and refreshing its headers.
//!
//! Any other method invalidates the entry for its URL before going out.
//!
//! Entries are stored as raw bytes (status line, headers, body) behind the
//! [`ResponseCache`] trait so the storage can be swapped without touching the
//! revalidation logic.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use thiserror::Error;

use crate::http::{
    HttpError, HttpHeaders, HttpMethod, HttpRequest, HttpResponse, HttpTransport, header_set,
};

/// Header added to responses synthesized from a revalidated cache entry.
pub const FROM_CACHE_HEADER: &str = "X-From-Cache";

/// Headers of a 304 answer that must not overwrite the stored representation.
const NON_REFRESHABLE_HEADERS: &[&str] = &[
    "connection",
    "content-encoding",
    "content-length",
    "content-type",
    "transfer-encoding",
];

/// Storage for raw cached responses, keyed by request URL.
pub trait ResponseCache: Send + Sync {
    fn get(&self, key: &str) -> Option<Vec<u8>>;
    fn set(&self, key: &str, raw: Vec<u8>);
    fn delete(&self, key: &str);
}

/// Process-local response cache guarded by a reader/writer lock.
#[derive(Debug, Default)]
pub struct MemoryCache {
    items: RwLock<HashMap<String, Vec<u8>>>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.items
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn contains(&self, key: &str) -> bool {
        self.items
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .contains_key(key)
    }
}

impl ResponseCache for MemoryCache {
    fn get(&self, key: &str) -> Option<Vec<u8>> {
        self.items
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(key)
            .cloned()
    }

    fn set(&self, key: &str, raw: Vec<u8>) {
        self.items
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .insert(key.to_string(), raw);
    }

    fn delete(&self, key: &str) {
        self.items
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .remove(key);
    }
}

/// Statistics about cache usage.
///
/// Tracks how many requests were answered by revalidation (304 Not Modified)
/// versus downloaded in full.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Requests answered with 304 and served from the cache.
    pub cache_hits: u32,
    /// Cacheable requests that downloaded a full response.
    pub fetched: u32,
}

impl CacheStats {
    #[inline]
    pub fn new(cache_hits: u32, fetched: u32) -> Self {
        Self {
            cache_hits,
            fetched,
        }
    }

    /// Returns the cache hit ratio (0.0 to 1.0).
    ///
    /// Returns 0.0 if no requests were made.
    pub fn hit_ratio(&self) -> f64 {
        let total = self.cache_hits + self.fetched;
        if total == 0 {
            0.0
        } else {
            f64::from(self.cache_hits) / f64::from(total)
        }
    }
}

#[derive(Debug, Default)]
struct CacheCounters {
    hits: AtomicU32,
    fetched: AtomicU32,
}

/// Errors converting between [`HttpResponse`] and its stored byte form.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CacheCodecError {
    #[error("header {0:?} contains a line break")]
    InvalidHeader(String),

    #[error("malformed cached response: {0}")]
    Malformed(&'static str),
}

/// Transport decorator that serves and revalidates cached GET/HEAD responses.
pub struct CachingTransport<T> {
    inner: T,
    cache: Arc<dyn ResponseCache>,
    token: Option<String>,
    counters: CacheCounters,
}

impl<T: HttpTransport> CachingTransport<T> {
    pub fn new(inner: T, cache: Arc<dyn ResponseCache>) -> Self {
        Self {
            inner,
            cache,
            token: None,
            counters: CacheCounters::default(),
        }
    }

    /// Wrap `inner` with a fresh [`MemoryCache`].
    pub fn with_memory_cache(inner: T) -> Self {
        Self::new(inner, Arc::new(MemoryCache::new()))
    }

    /// Stamp every request with `Authorization: Bearer <token>`.
    ///
    /// Empty tokens are ignored so unauthenticated setups can pass through
    /// whatever the configuration produced.
    #[must_use]
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        let token = token.into();
        self.token = (!token.is_empty()).then_some(token);
        self
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats::new(
            self.counters.hits.load(Ordering::Relaxed),
            self.counters.fetched.load(Ordering::Relaxed),
        )
    }

    /// Return the counters accumulated so far and reset them to zero.
    pub fn take_stats(&self) -> CacheStats {
        CacheStats::new(
            self.counters.hits.swap(0, Ordering::Relaxed),
            self.counters.fetched.swap(0, Ordering::Relaxed),
        )
    }
}

/// Source of per-cycle cache counters.
pub trait CacheMetrics: Send + Sync {
    /// Counters since the previous call.
    fn take_stats(&self) -> CacheStats;
}

impl<T: HttpTransport> CacheMetrics for CachingTransport<T> {
    fn take_stats(&self) -> CacheStats {
        CachingTransport::take_stats(self)
    }
}

impl<T: HttpTransport> CachingTransport<T> {
    fn cached_response(&self, key: &str) -> Option<HttpResponse> {
        let raw = self.cache.get(key)?;
        match decode_response(&raw) {
            Ok(response) => Some(response),
            Err(e) => {
                tracing::debug!(url = key, error = %e, "Ignoring undecodable cache entry");
                None
            }
        }
    }

    /// Count a full download and store it. A 304 has no representation to
    /// keep, so it never replaces the entry.
    fn record_fetch(&self, key: &str, response: &HttpResponse) {
        if response.status == 304 {
            return;
        }
        self.counters.fetched.fetch_add(1, Ordering::Relaxed);
        self.store(key, response);
    }

    fn store(&self, key: &str, response: &HttpResponse) {
        match encode_response(response) {
            Ok(raw) => self.cache.set(key, raw),
            Err(e) => tracing::debug!(url = key, error = %e, "Skipping cache write"),
        }
    }
}

#[async_trait]
impl<T: HttpTransport> HttpTransport for CachingTransport<T> {
    async fn send(&self, mut request: HttpRequest) -> Result<HttpResponse, HttpError> {
        let key = cache_key(&request).to_string();
        let method = request.method;
        let cacheable = method.is_cacheable();

        let cached = if cacheable {
            self.cached_response(&key)
        } else {
            self.cache.delete(&key);
            None
        };

        if let Some(token) = &self.token {
            header_set(&mut request.headers, "Authorization", format!("Bearer {token}"));
        }

        if let Some(cached) = cached {
            if let Some(etag) = cached.header("etag")
                && request.header("if-none-match").is_none()
            {
                request
                    .headers
                    .push(("If-None-Match".to_string(), etag.to_string()));
            }

            let response = self.inner.send(request).await?;
            if method == HttpMethod::Get && response.status == 304 {
                self.counters.hits.fetch_add(1, Ordering::Relaxed);
                tracing::debug!(url = %key, "Revalidated cached response");

                // Status line and body stay as stored; only headers refresh.
                let mut revalidated = cached;
                refresh_headers(&mut revalidated.headers, &response.headers);
                self.store(&key, &revalidated);
                header_set(&mut revalidated.headers, FROM_CACHE_HEADER, "1");
                return Ok(revalidated);
            }

            self.record_fetch(&key, &response);
            return Ok(response);
        }

        let response = self.inner.send(request).await?;
        if cacheable {
            self.record_fetch(&key, &response);
        }
        Ok(response)
    }
}

/// Cache key for a request: the exact URL, query string included.
fn cache_key(request: &HttpRequest) -> &str {
    &request.url
}

fn refresh_headers(stored: &mut HttpHeaders, fresh: &HttpHeaders) {
    for (name, value) in fresh {
        if NON_REFRESHABLE_HEADERS
            .iter()
            .any(|h| h.eq_ignore_ascii_case(name))
        {
            continue;
        }
        header_set(stored, name, value.clone());
    }
}

/// Serialize a response as `HTTP/1.1 <status> <reason>`, header lines, blank line, body.
pub fn encode_response(response: &HttpResponse) -> Result<Vec<u8>, CacheCodecError> {
    let mut head = format!(
        "HTTP/1.1 {} {}\r\n",
        response.status,
        reason_phrase(response.status)
    );
    for (name, value) in &response.headers {
        if has_line_break(name) || has_line_break(value) || name.contains(':') {
            return Err(CacheCodecError::InvalidHeader(name.clone()));
        }
        head.push_str(name);
        head.push_str(": ");
        head.push_str(value);
        head.push_str("\r\n");
    }
    head.push_str("\r\n");

    let mut raw = head.into_bytes();
    raw.extend_from_slice(&response.body);
    Ok(raw)
}

/// Parse bytes produced by [`encode_response`].
pub fn decode_response(raw: &[u8]) -> Result<HttpResponse, CacheCodecError> {
    let head_end = raw
        .windows(4)
        .position(|w| w == b"\r\n\r\n")
        .ok_or(CacheCodecError::Malformed("missing header terminator"))?;
    let head = std::str::from_utf8(&raw[..head_end])
        .map_err(|_| CacheCodecError::Malformed("head is not UTF-8"))?;

    let mut lines = head.split("\r\n");
    let status_line = lines
        .next()
        .ok_or(CacheCodecError::Malformed("missing status line"))?;
    let mut parts = status_line.split_whitespace();
    if !parts.next().is_some_and(|v| v.starts_with("HTTP/")) {
        return Err(CacheCodecError::Malformed("bad protocol version"));
    }
    let status = parts
        .next()
        .and_then(|code| code.parse::<u16>().ok())
        .ok_or(CacheCodecError::Malformed("bad status code"))?;

    let mut headers = HttpHeaders::new();
    for line in lines {
        let (name, value) = line
            .split_once(':')
            .ok_or(CacheCodecError::Malformed("header without colon"))?;
        headers.push((name.to_string(), value.trim_start().to_string()));
    }

    Ok(HttpResponse {
        status,
        headers,
        body: raw[head_end + 4..].to_vec(),
    })
}

fn has_line_break(s: &str) -> bool {
    s.contains(['\r', '\n'])
}

fn reason_phrase(status: u16) -> &'static str {
    match status {
        200 => "OK",
        201 => "Created",
        204 => "No Content",
        301 => "Moved Permanently",
        302 => "Found",
        304 => "Not Modified",
        400 => "Bad Request",
        401 => "Unauthorized",
        403 => "Forbidden",
        404 => "Not Found",
        422 => "Unprocessable Entity",
        429 => "Too Many Requests",
        500 => "Internal Server Error",
        502 => "Bad Gateway",
        503 => "Service Unavailable",
        _ => "",
    }
}

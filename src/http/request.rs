//! Inbound request model
//!
//! The pipeline never touches hyper types directly: the connection layer
//! builds a [`Request`] from the head, reads the body into it once and
//! hands it over read-only.

use http_body_util::{BodyExt, Limited};
use hyper::body::{Body, Bytes};
use hyper::header::{HeaderMap, CONTENT_LENGTH};
use hyper::{Method, Version};

use crate::error::AppError;

/// Fully received HTTP request
#[derive(Debug, Clone)]
pub struct Request {
    method: Method,
    path: String,
    query: Option<String>,
    version: Version,
    headers: HeaderMap,
    body: Bytes,
}

impl Request {
    pub fn new(method: Method, target: &str, headers: HeaderMap, body: Bytes) -> Self {
        let (path, query) = match target.split_once('?') {
            Some((p, q)) => (p.to_string(), Some(q.to_string())),
            None => (target.to_string(), None),
        };
        Self {
            method,
            path,
            query,
            version: Version::HTTP_11,
            headers,
            body,
        }
    }

    /// Request head without a body yet
    pub fn from_parts(parts: hyper::http::request::Parts) -> Self {
        let target = parts
            .uri
            .path_and_query()
            .map_or_else(|| parts.uri.path(), |pq| pq.as_str());
        let mut request = Self::new(parts.method, target, parts.headers, Bytes::new());
        request.version = parts.version;
        request
    }

    /// Read the body, enforcing the size limit
    ///
    /// A declared `Content-Length` over the limit is rejected before reading;
    /// chunked bodies are cut off once they cross it. On error the head is
    /// still usable, e.g. for the access log.
    pub async fn read_body<B>(&mut self, body: B, max_body_size: u64) -> Result<(), AppError>
    where
        B: Body<Data = Bytes>,
        B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        let too_large = AppError::PayloadTooLarge {
            limit: max_body_size,
        };

        let declared = self
            .header(CONTENT_LENGTH.as_str())
            .and_then(|v| v.parse::<u64>().ok());
        if declared.is_some_and(|size| size > max_body_size) {
            return Err(too_large);
        }

        let limit = usize::try_from(max_body_size).unwrap_or(usize::MAX);
        self.body = match Limited::new(body, limit).collect().await {
            Ok(collected) => collected.to_bytes(),
            Err(e) if e.is::<http_body_util::LengthLimitError>() => return Err(too_large),
            Err(e) => {
                return Err(AppError::BadRequest(format!(
                    "Failed to read request body: {e}"
                )))
            }
        };
        Ok(())
    }

    pub const fn method(&self) -> &Method {
        &self.method
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    /// Query string without the leading `?`
    pub fn query(&self) -> Option<&str> {
        self.query.as_deref()
    }

    pub const fn version(&self) -> Version {
        self.version
    }

    /// Header value as text; names are case-insensitive
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    pub const fn body(&self) -> &Bytes {
        &self.body
    }
}

//! HTTP response model
//!
//! Built by endpoint handlers or by the error path, finished by the
//! writer and then either handed to hyper or encoded to raw bytes.

use http_body_util::Full;
use hyper::body::Bytes;
use hyper::header::{HeaderMap, HeaderName, HeaderValue, CONTENT_TYPE};
use hyper::StatusCode;
use serde::Serialize;

use crate::logger;

pub const APPLICATION_JSON: &str = "application/json";

/// Outbound HTTP response
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    status: StatusCode,
    headers: HeaderMap,
    body: Bytes,
}

impl Response {
    /// Response without a body
    pub fn empty(status: StatusCode) -> Self {
        Self {
            status,
            headers: HeaderMap::new(),
            body: Bytes::new(),
        }
    }

    /// JSON response
    ///
    /// Serialization failures degrade to a fixed 500 body so a response is
    /// always produced.
    pub fn json<T: Serialize + ?Sized>(status: StatusCode, body: &T) -> Self {
        let (status, body) = match serde_json::to_vec(body) {
            Ok(json) => (status, Bytes::from(json)),
            Err(e) => {
                logger::log_error(&format!("Failed to serialize response: {e}"));
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Bytes::from_static(
                        br#"{"status":"error","error_detail":{"code":500,"kind":"internal","message":"Internal server error"}}"#,
                    ),
                )
            }
        };

        Self::empty(status)
            .with_header(CONTENT_TYPE, HeaderValue::from_static(APPLICATION_JSON))
            .with_body(body)
    }

    #[must_use]
    pub fn with_header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    #[must_use]
    pub fn with_body(mut self, body: Bytes) -> Self {
        self.body = body;
        self
    }

    pub const fn status(&self) -> StatusCode {
        self.status
    }

    pub const fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn headers_mut(&mut self) -> &mut HeaderMap {
        &mut self.headers
    }

    pub const fn body(&self) -> &Bytes {
        &self.body
    }

    /// Hand the response over to hyper
    pub fn into_hyper(self) -> hyper::Response<Full<Bytes>> {
        let mut response = hyper::Response::new(Full::new(self.body));
        *response.status_mut() = self.status;
        *response.headers_mut() = self.headers;
        response
    }
}

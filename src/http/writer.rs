//! Response writer
//!
//! Last stage of the pipeline. Turns a handler result into a [`Response`]
//! with the right status, stamps the common headers and can encode the
//! result as raw HTTP/1.1 bytes for paths that bypass hyper.

use std::fmt::Write as _;

use hyper::body::Bytes;
use hyper::header::{
    HeaderValue, ACCESS_CONTROL_ALLOW_HEADERS, ACCESS_CONTROL_ALLOW_METHODS,
    ACCESS_CONTROL_ALLOW_ORIGIN, ACCESS_CONTROL_MAX_AGE, ALLOW, CONTENT_LENGTH, SERVER,
};
use hyper::{Method, StatusCode};

use super::response::Response;
use crate::config::HttpConfig;
use crate::error::AppError;
use crate::logger;

/// Finishes responses according to the HTTP configuration
#[derive(Debug, Clone, Copy)]
pub struct ResponseWriter<'a> {
    http: &'a HttpConfig,
}

impl<'a> ResponseWriter<'a> {
    pub const fn new(http: &'a HttpConfig) -> Self {
        Self { http }
    }

    /// Produce the final response for a handler outcome
    pub fn write(&self, result: Result<Response, AppError>) -> Response {
        let response = match result {
            Ok(response) => response,
            Err(err) => self.error_response(&err),
        };
        self.finish(response)
    }

    /// Map an error to its JSON response
    pub fn error_response(&self, err: &AppError) -> Response {
        if err.is_internal() {
            logger::log_error(&err.to_string());
        }

        let response = Response::json(err.status(), &err.body());
        match err {
            AppError::MethodNotAllowed { allowed, .. } => {
                response.with_header(ALLOW, allow_header(allowed))
            }
            _ => response,
        }
    }

    /// 204 answer to an `OPTIONS` request on a known path
    pub fn preflight(&self, allowed: &[Method]) -> Response {
        let allow = allow_header(allowed);
        let mut response =
            Response::empty(StatusCode::NO_CONTENT).with_header(ALLOW, allow.clone());
        if self.http.enable_cors {
            response = response
                .with_header(ACCESS_CONTROL_ALLOW_METHODS, allow)
                .with_header(
                    ACCESS_CONTROL_ALLOW_HEADERS,
                    HeaderValue::from_static("Content-Type"),
                )
                .with_header(ACCESS_CONTROL_MAX_AGE, HeaderValue::from_static("86400"));
        }
        self.finish(response)
    }

    /// Stamp headers every response carries
    fn finish(&self, mut response: Response) -> Response {
        let headers = response.headers_mut();
        match HeaderValue::from_str(&self.http.server_name) {
            Ok(server) => {
                headers.insert(SERVER, server);
            }
            Err(e) => logger::log_warning(&format!("Invalid server name header: {e}")),
        }
        if self.http.enable_cors {
            headers.insert(ACCESS_CONTROL_ALLOW_ORIGIN, HeaderValue::from_static("*"));
        }
        response
    }

    /// Encode a finished response as HTTP/1.1 bytes
    ///
    /// The connection is always marked `close`; this is used where no hyper
    /// connection exists, e.g. when rejecting over the connection limit.
    pub fn encode(response: &Response) -> Bytes {
        let status = response.status();
        let body = response.body();

        let mut head = String::with_capacity(128);
        // Writing into a String cannot fail
        let _ = write!(
            head,
            "HTTP/1.1 {} {}\r\n",
            status.as_u16(),
            status.canonical_reason().unwrap_or("Unknown")
        );
        for (name, value) in response.headers() {
            if name == CONTENT_LENGTH {
                continue;
            }
            if let Ok(value) = value.to_str() {
                let _ = write!(head, "{name}: {value}\r\n");
            }
        }
        let _ = write!(
            head,
            "Content-Length: {}\r\nConnection: close\r\n\r\n",
            body.len()
        );

        let mut wire = Vec::with_capacity(head.len() + body.len());
        wire.extend_from_slice(head.as_bytes());
        wire.extend_from_slice(body);
        Bytes::from(wire)
    }
}

fn allow_header(methods: &[Method]) -> HeaderValue {
    let joined = methods
        .iter()
        .map(Method::as_str)
        .collect::<Vec<_>>()
        .join(", ");
    HeaderValue::from_str(&joined).unwrap_or_else(|_| HeaderValue::from_static("GET"))
}

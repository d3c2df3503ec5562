//! Request handler module
//!
//! Entry point for HTTP request processing: receives the hyper request,
//! runs it through the pipeline and writes the access log.

mod endpoints;
pub mod pipeline;

use http_body_util::Full;
use hyper::body::{Body, Bytes};
use hyper::header::USER_AGENT;
use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use crate::config::AppState;
use crate::http::{Request, ResponseWriter};
use crate::logger::{self, AccessLogEntry};

/// Main entry point for HTTP request handling
///
/// Never fails: body and pipeline errors are rendered as responses.
pub async fn handle_request<B>(
    req: hyper::Request<B>,
    state: Arc<AppState>,
    peer_addr: SocketAddr,
) -> Result<hyper::Response<Full<Bytes>>, Infallible>
where
    B: Body<Data = Bytes>,
    B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
{
    let started = Instant::now();

    let (parts, body) = req.into_parts();
    let mut request = Request::from_parts(parts);
    let response = match request.read_body(body, state.config.http.max_body_size).await {
        Ok(()) => pipeline::process(&request, &state).await,
        Err(err) => ResponseWriter::new(&state.config.http).write(Err(err)),
    };

    let logging = &state.config.logging;
    if logging.access_log {
        let mut entry = access_entry(&request, peer_addr);
        entry.status = response.status().as_u16();
        entry.body_bytes = response.body().len();
        entry.request_time_us = u64::try_from(started.elapsed().as_micros()).unwrap_or(u64::MAX);
        logger::log_access(&entry, &logging.access_log_format);
    }

    Ok(response.into_hyper())
}

fn access_entry(request: &Request, peer_addr: SocketAddr) -> AccessLogEntry {
    let mut entry = AccessLogEntry::new(
        peer_addr.ip().to_string(),
        request.method().to_string(),
        request.path().to_string(),
    );
    entry.query = request.query().map(ToString::to_string);
    entry.http_version = version_label(request.version()).to_string();
    entry.user_agent = request.header(USER_AGENT.as_str()).map(ToString::to_string);
    entry
}

const fn version_label(version: hyper::Version) -> &'static str {
    match version {
        hyper::Version::HTTP_09 => "0.9",
        hyper::Version::HTTP_10 => "1.0",
        hyper::Version::HTTP_2 => "2",
        _ => "1.1",
    }
}

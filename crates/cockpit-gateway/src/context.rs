//! Per-call request context.
//!
//! A `RequestContext` is captured once when a call enters the pipeline and
//! is read by every gate, the response instrumentation and the audit
//! recorder. It is never shared across calls.

use std::net::SocketAddr;
use std::time::Instant;

use axum::extract::ConnectInfo;
use axum::http::{header, HeaderMap, HeaderName, HeaderValue, Method, Request};
use chrono::{DateTime, Utc};

use cockpit_core::RequestId;

/// Correlation id header, read from requests and stamped on responses.
pub const REQUEST_ID_HEADER: HeaderName = HeaderName::from_static("x-request-id");

const FORWARDED_FOR: HeaderName = HeaderName::from_static("x-forwarded-for");

/// Client key used when no address can be determined.
pub const UNKNOWN_CLIENT: &str = "unknown";

/// Immutable metadata about one inbound call.
#[derive(Debug, Clone)]
pub struct RequestContext {
    /// HTTP method.
    pub method: Method,
    /// Request path without the query string.
    pub path: String,
    /// Raw query string, if any.
    pub query: Option<String>,
    /// Client address used for rate limiting and audit.
    pub client: String,
    /// `User-Agent` header, if any.
    pub user_agent: Option<String>,
    /// Raw `Authorization` header, if any.
    pub authorization: Option<HeaderValue>,
    /// Correlation id for this call.
    pub request_id: RequestId,
    /// Caller-supplied correlation header, echoed back byte for byte. Absent
    /// when the caller sent none, an empty one, or one that is not ASCII.
    pub echoed_request_id: Option<HeaderValue>,
    /// Declared body length; `None` if absent or unparseable.
    pub content_length: Option<u64>,
    /// Wall-clock arrival time.
    pub received_at: DateTime<Utc>,
    /// Monotonic arrival time, used for latency.
    pub started: Instant,
}

impl RequestContext {
    /// Capture the context of an inbound request.
    #[must_use]
    pub fn from_request<B>(request: &Request<B>) -> Self {
        let headers = request.headers();
        let peer = request
            .extensions()
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| addr.ip().to_string());

        // Only a visible-ASCII id is echoed; the header, logs and audit
        // record must carry identical bytes.
        let supplied = headers.get(&REQUEST_ID_HEADER).and_then(|v| {
            let id = RequestId::parse(v.to_str().ok()?).ok()?;
            Some((v.clone(), id))
        });
        let (echoed_request_id, request_id) = match supplied {
            Some((value, id)) => (Some(value), id),
            None => (None, RequestId::generate()),
        };

        Self {
            method: request.method().clone(),
            path: request.uri().path().to_string(),
            query: request.uri().query().map(str::to_string),
            client: peer.unwrap_or_else(|| forwarded_client(headers)),
            user_agent: header_string(headers, &header::USER_AGENT),
            authorization: headers.get(header::AUTHORIZATION).cloned(),
            request_id,
            echoed_request_id,
            content_length: headers
                .get(header::CONTENT_LENGTH)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.trim().parse().ok()),
            received_at: Utc::now(),
            started: Instant::now(),
        }
    }

    /// Header value to stamp as the response correlation id.
    #[must_use]
    pub fn request_id_header(&self) -> Option<HeaderValue> {
        self.echoed_request_id
            .clone()
            .or_else(|| HeaderValue::from_str(self.request_id.as_str()).ok())
    }
}

/// First hop of `X-Forwarded-For`, or [`UNKNOWN_CLIENT`].
fn forwarded_client(headers: &HeaderMap) -> String {
    headers
        .get(&FORWARDED_FOR)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map_or_else(|| UNKNOWN_CLIENT.to_string(), str::to_string)
}

fn header_string(headers: &HeaderMap, name: &HeaderName) -> Option<String> {
    headers
        .get(name)
        .map(|v| String::from_utf8_lossy(v.as_bytes()).into_owned())
}

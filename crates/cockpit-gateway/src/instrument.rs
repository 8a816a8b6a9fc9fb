//! Response instrumentation: correlation id and processing time.

use axum::http::{HeaderName, HeaderValue};
use axum::response::Response;

use crate::context::{RequestContext, REQUEST_ID_HEADER};

/// Processing time header, in decimal seconds.
pub const PROCESS_TIME_HEADER: HeaderName = HeaderName::from_static("x-process-time");

/// Stamp `X-Request-ID` and `X-Process-Time` on `response` and log the
/// completed call.
pub fn stamp(ctx: &RequestContext, response: &mut Response) {
    let elapsed = ctx.started.elapsed().as_secs_f64();
    let headers = response.headers_mut();

    if let Some(value) = ctx.request_id_header() {
        headers.insert(REQUEST_ID_HEADER, value);
    }
    if let Ok(value) = HeaderValue::from_str(&format!("{elapsed:.6}")) {
        headers.insert(PROCESS_TIME_HEADER, value);
    }

    tracing::info!(
        method = %ctx.method,
        path = %ctx.path,
        status_code = response.status().as_u16(),
        process_time = elapsed,
        request_id = %ctx.request_id,
        "http_request"
    );
}

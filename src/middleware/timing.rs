use std::time::Instant;

use axum::{
    extract::Request,
    http::{HeaderName, HeaderValue},
    middleware::Next,
    response::Response,
};
use tracing::debug;

static RESPONSE_TIME: HeaderName = HeaderName::from_static("x-response-time-us");

/// Stamps the handler's wall time onto the response and logs the request.
pub async fn timing_middleware(req: Request, next: Next) -> Response {
    let started = Instant::now();
    let line = format!("{} {}", req.method(), req.uri().path());

    let mut response = next.run(req).await;
    let us = u64::try_from(started.elapsed().as_micros()).unwrap_or(u64::MAX);

    response
        .headers_mut()
        .insert(RESPONSE_TIME.clone(), HeaderValue::from(us));
    debug!(request = %line, status = response.status().as_u16(), us, "served");
    response
}

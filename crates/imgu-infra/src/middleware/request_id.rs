use axum::http::HeaderValue;
use axum::{extract::Request, middleware::Next, response::Response};
use rand::distr::{Alphanumeric, SampleString};
use tracing::Instrument;

pub const REQUEST_ID_HEADER: &str = "X-Request-ID";

/// Request id stored in the request extensions
#[derive(Clone, Debug)]
pub struct RequestId(pub String);

fn generate_request_id() -> String {
    Alphanumeric.sample_string(&mut rand::rng(), 16)
}

/// Reuse the caller's `X-Request-ID` or mint one, expose it to handlers
/// through the extensions and echo it on the response.
pub async fn request_id_middleware(mut request: Request, next: Next) -> Response {
    let request_id = request
        .headers()
        .get(REQUEST_ID_HEADER)
        .and_then(|h| h.to_str().ok())
        .filter(|id| !id.is_empty() && id.len() <= 128)
        .map(str::to_string)
        .unwrap_or_else(generate_request_id);

    request
        .extensions_mut()
        .insert(RequestId(request_id.clone()));

    let span = tracing::info_span!(
        "request",
        request_id = %request_id,
        method = %request.method(),
        uri = %request.uri(),
    );
    let mut response = next.run(request).instrument(span).await;

    if let Ok(value) = HeaderValue::from_str(&request_id) {
        response.headers_mut().insert(REQUEST_ID_HEADER, value);
    }
    response
}

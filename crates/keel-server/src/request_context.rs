use axum::extract::Request;
use axum::middleware::Next;
use axum::response::Response;
use keel_core::RequestContext;

/// Header a caller may set to carry its own correlation id
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Middleware that constructs a `RequestContext` from the incoming request
///
/// Reuses a client supplied `x-request-id`, otherwise mints one. The id is
/// echoed on the response.
pub async fn request_context_middleware(request: Request, next: Next) -> Response {
    let (parts, body) = request.into_parts();

    let request_id = parts
        .headers
        .get(REQUEST_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty())
        .map_or_else(|| uuid::Uuid::new_v4().to_string(), str::to_owned);

    let context = RequestContext {
        parts: parts.clone(),
        request_id: request_id.clone(),
    };

    let mut request = Request::from_parts(parts, body);
    request.extensions_mut().insert(context);

    let mut response = next.run(request).await;
    if let Ok(value) = http::HeaderValue::from_str(&request_id) {
        response.headers_mut().insert(REQUEST_ID_HEADER, value);
    }

    response
}

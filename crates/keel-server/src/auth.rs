use axum::extract::Request;
use axum::middleware::Next;
use axum::response::Response;
use keel_llm::LlmError;
use secrecy::{ExposeSecret, SecretString};
use subtle::ConstantTimeEq;

/// Require `Authorization: Bearer <api_key>` outside the public paths
///
/// Rejections use the same `OpenAI` error body as the chat endpoints.
pub async fn auth_middleware(
    api_key: SecretString,
    public_paths: Vec<String>,
    request: Request,
    next: Next,
) -> Response {
    let path = request.uri().path();

    if public_paths.iter().any(|p| path.starts_with(p.as_str())) {
        return next.run(request).await;
    }

    let verdict = bearer_token(request.headers())
        .map(|token| bool::from(token.as_bytes().ct_eq(api_key.expose_secret().as_bytes())));

    match verdict {
        Some(true) => next.run(request).await,
        Some(false) => {
            tracing::warn!(path = %request.uri().path(), "rejected request with invalid API key");
            keel_llm::error_response(&LlmError::Unauthorized)
        }
        None => {
            tracing::debug!(path = %request.uri().path(), "rejected request without bearer token");
            keel_llm::error_response(&LlmError::Unauthorized)
        }
    }
}

/// Token of a `Bearer` authorization header; the scheme is case-insensitive
fn bearer_token(headers: &http::HeaderMap) -> Option<&str> {
    let value = headers.get(http::header::AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.split_once(' ')?;

    scheme.eq_ignore_ascii_case("bearer").then(|| token.trim_start())
}

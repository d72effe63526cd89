/// Runtime context for a single gateway request
///
/// Built by the server middleware once authentication has passed and
/// handed down to the backend alongside the normalized request.
#[derive(Debug, Clone)]
pub struct RequestContext {
    /// HTTP request parts (method, URI, headers, extensions)
    pub parts: http::request::Parts,
    /// Identifier used to correlate log lines for this request
    pub request_id: String,
}

impl RequestContext {
    /// Create a minimal context for embedded (non-HTTP) use
    ///
    /// Contains empty headers and a fixed `embedded` request id
    pub fn empty() -> Self {
        let (parts, ()) = http::Request::builder()
            .method(http::Method::GET)
            .uri("/")
            .body(())
            .unwrap_or_default()
            .into_parts();

        Self {
            parts,
            request_id: "embedded".to_owned(),
        }
    }

    /// Access request headers
    pub fn headers(&self) -> &http::HeaderMap {
        &self.parts.headers
    }
}

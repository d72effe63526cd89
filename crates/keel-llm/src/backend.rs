//! The inference backend the gateway drives

use std::pin::Pin;

use async_trait::async_trait;
use futures_util::Stream;
use keel_core::RequestContext;

use crate::error::LlmError;
use crate::types::{CompletionRequest, CompletionResponse, StreamEvent};

/// Lazily produced completion chunks, in arrival order
///
/// Dropping the stream cancels the in-flight backend call.
pub type EventStream = Pin<Box<dyn Stream<Item = Result<StreamEvent, LlmError>> + Send>>;

/// Client for the model-invocation service
///
/// The gateway only decides which model to call and with what
/// conversation; transport, credentials and framing belong to the
/// implementation.
#[async_trait]
pub trait Backend: Send + Sync {
    /// Human-readable backend name
    fn name(&self) -> &str;

    /// Whether the backend can serve `model`
    ///
    /// An `Err` means validation could not be performed; the resolver treats
    /// it the same as `Ok(false)`.
    async fn supports_model(&self, model: &str) -> Result<bool, LlmError>;

    /// Identifiers of every model the backend can serve
    async fn list_models(&self) -> Result<Vec<String>, LlmError>;

    /// Send a non-streaming completion request
    async fn complete(
        &self,
        request: &CompletionRequest,
        context: &RequestContext,
    ) -> Result<CompletionResponse, LlmError>;

    /// Send a streaming completion request
    async fn complete_stream(
        &self,
        request: &CompletionRequest,
        context: &RequestContext,
    ) -> Result<EventStream, LlmError>;
}

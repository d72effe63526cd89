use std::sync::Arc;

use keel_core::RequestContext;
use tokio::runtime::Handle;

use super::{Strategy, StrategyInput, StrategyOutput};
use crate::backend::Backend;
use crate::error::StrategyError;
use crate::types::{CompletionRequest, Message};

/// Identity optimisation: one backend call with the flattened conversation
///
/// Useful as the default when no real strategy is installed, and as the
/// reference for how a strategy reaches the backend from the blocking pool.
pub struct DirectStrategy {
    backend: Arc<dyn Backend>,
    runtime: Handle,
}

impl DirectStrategy {
    pub const NAME: &'static str = "direct";

    pub fn new(backend: Arc<dyn Backend>, runtime: Handle) -> Self {
        Self { backend, runtime }
    }
}

impl Strategy for DirectStrategy {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn run(&self, input: &StrategyInput) -> Result<StrategyOutput, StrategyError> {
        let mut messages = Vec::with_capacity(2);
        if !input.system_prompt.is_empty() {
            messages.push(Message::system(input.system_prompt.clone()));
        }
        messages.push(Message::user(input.initial_query.clone()));

        let mut request = CompletionRequest::new(input.model.clone(), messages);
        request.temperature = input.temperature;

        let context = RequestContext::empty();
        let response = self.runtime.block_on(self.backend.complete(&request, &context))?;

        let content = response.text();
        if content.is_empty() {
            return Err(StrategyError::EmptyOutput);
        }

        Ok(StrategyOutput {
            content: content.to_owned(),
            metadata: serde_json::json!({
                "completion_tokens": response.usage.map_or(0, |u| u.completion_tokens),
            }),
        })
    }
}

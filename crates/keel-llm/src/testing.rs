//! In-memory backend for unit tests

use std::collections::HashSet;
use std::sync::Mutex;

use async_trait::async_trait;
use keel_core::RequestContext;

use crate::backend::{Backend, EventStream};
use crate::error::LlmError;
use crate::types::{
    Choice, ChoiceMessage, CompletionRequest, CompletionResponse, FinishReason, StreamDelta, StreamEvent, Usage,
};

/// Backend that serves a fixed set of models and answers with a canned reply
///
/// Records every validation and invocation so tests can assert on them.
pub struct MockBackend {
    supported: HashSet<String>,
    broken_catalog: bool,
    reply: String,
    validations: Mutex<Vec<String>>,
    calls: Mutex<Vec<CompletionRequest>>,
}

impl MockBackend {
    pub fn new(supported: &[&str]) -> Self {
        Self {
            supported: supported.iter().map(|s| (*s).to_owned()).collect(),
            broken_catalog: false,
            reply: "Hello from the backend".to_owned(),
            validations: Mutex::new(Vec::new()),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Every validation call fails with an error instead of answering
    pub fn with_broken_catalog(mut self) -> Self {
        self.broken_catalog = true;
        self
    }

    pub fn with_reply(mut self, reply: &str) -> Self {
        reply.clone_into(&mut self.reply);
        self
    }

    pub fn validations(&self) -> Vec<String> {
        self.validations.lock().unwrap().clone()
    }

    pub fn calls(&self) -> Vec<CompletionRequest> {
        self.calls.lock().unwrap().clone()
    }

    fn response(&self, model: &str) -> CompletionResponse {
        CompletionResponse {
            id: "chatcmpl-mock".to_owned(),
            object: "chat.completion".to_owned(),
            created: 0,
            model: model.to_owned(),
            choices: vec![Choice {
                index: 0,
                message: ChoiceMessage::text(self.reply.clone()),
                finish_reason: Some(FinishReason::Stop),
            }],
            usage: Some(Usage {
                prompt_tokens: 3,
                completion_tokens: 4,
                total_tokens: 7,
            }),
        }
    }
}

#[async_trait]
impl Backend for MockBackend {
    fn name(&self) -> &str {
        "mock"
    }

    async fn supports_model(&self, model: &str) -> Result<bool, LlmError> {
        self.validations.lock().unwrap().push(model.to_owned());

        if self.broken_catalog {
            return Err(LlmError::Upstream("catalog unavailable".to_owned()));
        }

        Ok(self.supported.contains(model))
    }

    async fn list_models(&self) -> Result<Vec<String>, LlmError> {
        let mut models: Vec<String> = self.supported.iter().cloned().collect();
        models.sort();
        Ok(models)
    }

    async fn complete(
        &self,
        request: &CompletionRequest,
        _context: &RequestContext,
    ) -> Result<CompletionResponse, LlmError> {
        self.calls.lock().unwrap().push(request.clone());
        Ok(self.response(&request.model))
    }

    async fn complete_stream(
        &self,
        request: &CompletionRequest,
        _context: &RequestContext,
    ) -> Result<EventStream, LlmError> {
        self.calls.lock().unwrap().push(request.clone());

        let mut events: Vec<Result<StreamEvent, LlmError>> = self
            .reply
            .split_inclusive(' ')
            .map(|piece| Ok(StreamEvent::Delta(StreamDelta::text(piece))))
            .collect();
        events.push(Ok(StreamEvent::Delta(StreamDelta::finish(FinishReason::Stop))));
        events.push(Ok(StreamEvent::Done));

        Ok(Box::pin(futures_util::stream::iter(events)))
    }
}

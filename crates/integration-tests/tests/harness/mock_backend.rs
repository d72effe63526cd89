//! In-process backend for integration tests
//!
//! Serves a fixed model set and answers with a canned reply, recording the
//! requests it receives.

use std::collections::BTreeSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use futures_util::StreamExt;
use keel_core::RequestContext;
use keel_llm::types::{Choice, ChoiceMessage, FinishReason, StreamDelta, Usage};
use keel_llm::{
    Backend, CompletionRequest, CompletionResponse, EventStream, LlmError, Strategy, StrategyError, StrategyInput,
    StrategyOutput, StreamEvent,
};

pub struct MockBackend {
    models: BTreeSet<String>,
    reply: String,
    /// Stream this many text pieces, then fail
    stream_failure_after: Option<usize>,
    /// Stream text forever instead of the reply
    endless_stream: bool,
    stream_dropped: Arc<AtomicBool>,
    calls: Mutex<Vec<CompletionRequest>>,
}

/// Sets the flag when the stream holding it is dropped
struct DropFlag(Arc<AtomicBool>);

impl Drop for DropFlag {
    fn drop(&mut self) {
        self.0.store(true, Ordering::SeqCst);
    }
}

impl MockBackend {
    pub fn new(models: &[&str]) -> Self {
        Self {
            models: models.iter().map(|m| (*m).to_owned()).collect(),
            reply: "The answer is four".to_owned(),
            stream_failure_after: None,
            endless_stream: false,
            stream_dropped: Arc::new(AtomicBool::new(false)),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn with_reply(mut self, reply: &str) -> Self {
        reply.clone_into(&mut self.reply);
        self
    }

    pub fn with_stream_failure_after(mut self, pieces: usize) -> Self {
        self.stream_failure_after = Some(pieces);
        self
    }

    /// Emit a text delta every few milliseconds until the stream is dropped
    pub fn with_endless_stream(mut self) -> Self {
        self.endless_stream = true;
        self
    }

    /// Whether the last stream handed out has been dropped
    pub fn stream_dropped(&self) -> bool {
        self.stream_dropped.load(Ordering::SeqCst)
    }

    /// Requests that reached `complete` or `complete_stream`
    pub fn calls(&self) -> Vec<CompletionRequest> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl Backend for MockBackend {
    fn name(&self) -> &str {
        "mock"
    }

    async fn supports_model(&self, model: &str) -> Result<bool, LlmError> {
        Ok(self.models.contains(model))
    }

    async fn list_models(&self) -> Result<Vec<String>, LlmError> {
        Ok(self.models.iter().cloned().collect())
    }

    async fn complete(
        &self,
        request: &CompletionRequest,
        _context: &RequestContext,
    ) -> Result<CompletionResponse, LlmError> {
        self.calls.lock().unwrap().push(request.clone());

        Ok(CompletionResponse {
            id: "chatcmpl-mock".to_owned(),
            object: "chat.completion".to_owned(),
            created: 1_700_000_000,
            // Deliberately not the requested model; the gateway overwrites it
            model: "mock-echo".to_owned(),
            choices: vec![Choice {
                index: 0,
                message: ChoiceMessage::text(self.reply.clone()),
                finish_reason: Some(FinishReason::Stop),
            }],
            usage: Some(Usage {
                prompt_tokens: 10,
                completion_tokens: 4,
                total_tokens: 14,
            }),
        })
    }

    async fn complete_stream(
        &self,
        request: &CompletionRequest,
        _context: &RequestContext,
    ) -> Result<EventStream, LlmError> {
        self.calls.lock().unwrap().push(request.clone());

        if self.endless_stream {
            self.stream_dropped.store(false, Ordering::SeqCst);
            let flag = DropFlag(Arc::clone(&self.stream_dropped));

            let ticks = futures_util::stream::unfold(0_u64, |n| async move {
                tokio::time::sleep(Duration::from_millis(10)).await;
                Some((Ok(StreamEvent::Delta(StreamDelta::text(format!("tick{n} ")))), n + 1))
            });

            return Ok(Box::pin(ticks.map(move |event| {
                let _held = &flag;
                event
            })));
        }

        let pieces: Vec<&str> = self.reply.split_inclusive(' ').collect();
        let mut events: Vec<Result<StreamEvent, LlmError>> = Vec::new();

        match self.stream_failure_after {
            Some(n) => {
                events.extend(
                    pieces
                        .iter()
                        .take(n)
                        .map(|p| Ok(StreamEvent::Delta(StreamDelta::text(*p)))),
                );
                events.push(Err(LlmError::Streaming("connection reset".to_owned())));
            }
            None => {
                events.extend(pieces.iter().map(|p| Ok(StreamEvent::Delta(StreamDelta::text(*p)))));
                events.push(Ok(StreamEvent::Delta(StreamDelta::finish(FinishReason::Stop))));
                events.push(Ok(StreamEvent::Done));
            }
        }

        Ok(Box::pin(futures_util::stream::iter(events)))
    }
}

/// Strategy that answers with the flattened conversation in upper case
pub struct Shout;

impl Strategy for Shout {
    fn name(&self) -> &str {
        "shout"
    }

    fn run(&self, input: &StrategyInput) -> Result<StrategyOutput, StrategyError> {
        Ok(StrategyOutput {
            content: format!("{} / {}", input.system_prompt.to_uppercase(), input.initial_query.to_uppercase()),
            metadata: serde_json::json!({ "model": input.model }),
        })
    }
}

/// Strategy that always fails
pub struct Broken;

impl Strategy for Broken {
    fn name(&self) -> &str {
        "broken"
    }

    fn run(&self, _input: &StrategyInput) -> Result<StrategyOutput, StrategyError> {
        Err(StrategyError::Failed("no candidates survived".to_owned()))
    }
}

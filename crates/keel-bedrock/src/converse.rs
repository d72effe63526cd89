//! Translation between gateway types and the Converse API

use aws_sdk_bedrockruntime::primitives::event_stream::EventReceiver;
use aws_sdk_bedrockruntime::types::error::ConverseStreamOutputError;
use aws_sdk_bedrockruntime::types::{
    ContentBlock, ContentBlockDelta, ConversationRole, ConverseOutput, ConverseStreamOutput, InferenceConfiguration,
    Message as BedrockMessage, StopReason, SystemContentBlock, TokenUsage,
};
use keel_llm::types::{CompletionRequest, FinishReason, Role, StreamDelta, StreamEvent, Usage};
use keel_llm::{EventStream, LlmError};

/// Converse requires the first turn to come from the user
pub(crate) const LEADING_USER_TURN: &str = "Continue.";

#[derive(Debug)]
pub(crate) struct ConverseInput {
    pub system: Vec<SystemContentBlock>,
    pub messages: Vec<BedrockMessage>,
}

/// Build the Converse system prompt and turns from a request
///
/// The first non-empty system message becomes the system prompt and later ones are
/// dropped. Empty turns are skipped, consecutive turns from the same role
/// are merged, and a placeholder user turn is inserted when the
/// conversation would otherwise open with the assistant.
pub(crate) fn build_input(request: &CompletionRequest) -> Result<ConverseInput, LlmError> {
    let mut system = Vec::new();
    let mut turns: Vec<(ConversationRole, Vec<ContentBlock>)> = Vec::new();

    for message in &request.messages {
        let role = match message.role {
            Role::System => {
                if system.is_empty() && !message.content.is_empty() {
                    system.push(SystemContentBlock::Text(message.content.clone()));
                }
                continue;
            }
            Role::User => ConversationRole::User,
            Role::Assistant => ConversationRole::Assistant,
        };

        if message.content.is_empty() {
            continue;
        }

        let block = ContentBlock::Text(message.content.clone());
        match turns.last_mut() {
            Some((last_role, blocks)) if *last_role == role => blocks.push(block),
            _ => turns.push((role, vec![block])),
        }
    }

    if turns.first().is_some_and(|(role, _)| *role == ConversationRole::Assistant) {
        turns.insert(
            0,
            (
                ConversationRole::User,
                vec![ContentBlock::Text(LEADING_USER_TURN.to_owned())],
            ),
        );
    }

    if turns.is_empty() {
        return Err(LlmError::InvalidRequest(
            "conversation has no user or assistant content".to_owned(),
        ));
    }

    let messages = turns
        .into_iter()
        .map(|(role, content)| {
            BedrockMessage::builder()
                .role(role)
                .set_content(Some(content))
                .build()
                .map_err(|e| LlmError::InvalidRequest(format!("invalid conversation turn: {e}")))
        })
        .collect::<Result<Vec<_>, _>>()?;

    Ok(ConverseInput { system, messages })
}

/// Sampling parameters: temperature always, `top_p`, `max_tokens` and
/// `stop` when the client passed them through
pub(crate) fn inference_config(request: &CompletionRequest) -> InferenceConfiguration {
    #[allow(clippy::cast_possible_truncation)]
    let mut config = InferenceConfiguration::builder().temperature(request.temperature as f32);

    if let Some(top_p) = request.passthrough_f64("top_p") {
        #[allow(clippy::cast_possible_truncation)]
        {
            config = config.top_p(top_p as f32);
        }
    }

    if let Some(max_tokens) = request
        .passthrough_u64("max_tokens")
        .and_then(|n| i32::try_from(n).ok())
    {
        config = config.max_tokens(max_tokens);
    }

    for stop in request.stop_sequences() {
        config = config.stop_sequences(stop);
    }

    config.build()
}

/// Concatenated text blocks of a Converse response
pub(crate) fn output_text(output: Option<&ConverseOutput>) -> String {
    let Some(ConverseOutput::Message(message)) = output else {
        return String::new();
    };

    message
        .content()
        .iter()
        .filter_map(|block| match block {
            ContentBlock::Text(text) => Some(text.as_str()),
            _ => None,
        })
        .collect()
}

pub(crate) fn finish_reason(reason: &StopReason) -> FinishReason {
    match reason {
        StopReason::MaxTokens => FinishReason::Length,
        StopReason::ContentFiltered | StopReason::GuardrailIntervened => FinishReason::ContentFilter,
        _ => FinishReason::Stop,
    }
}

pub(crate) fn usage(usage: &TokenUsage) -> Usage {
    let count = |n: i32| u32::try_from(n).unwrap_or(0);

    Usage {
        prompt_tokens: count(usage.input_tokens()),
        completion_tokens: count(usage.output_tokens()),
        total_tokens: count(usage.total_tokens()),
    }
}

/// Map one stream event, `None` for events the gateway does not forward
fn stream_event(output: ConverseStreamOutput) -> Option<StreamEvent> {
    match output {
        ConverseStreamOutput::ContentBlockDelta(delta) => match delta.delta() {
            Some(ContentBlockDelta::Text(text)) => Some(StreamEvent::Delta(StreamDelta::text(text.clone()))),
            _ => None,
        },
        ConverseStreamOutput::MessageStop(stop) => {
            Some(StreamEvent::Delta(StreamDelta::finish(finish_reason(stop.stop_reason()))))
        }
        ConverseStreamOutput::Metadata(metadata) => metadata.usage().map(|u| StreamEvent::Usage(usage(u))),
        _ => None,
    }
}

enum ReceiverState {
    Open(EventReceiver<ConverseStreamOutput, ConverseStreamOutputError>),
    Closed,
}

/// Adapt the SDK event receiver into the gateway's event stream
///
/// Ends with [`StreamEvent::Done`] on a clean finish, or right after the
/// first receive error.
pub(crate) fn event_stream(receiver: EventReceiver<ConverseStreamOutput, ConverseStreamOutputError>) -> EventStream {
    let stream = futures_util::stream::unfold(ReceiverState::Open(receiver), |state| async move {
        let ReceiverState::Open(mut receiver) = state else {
            return None;
        };

        loop {
            match receiver.recv().await {
                Ok(Some(output)) => {
                    if let Some(event) = stream_event(output) {
                        return Some((Ok(event), ReceiverState::Open(receiver)));
                    }
                }
                Ok(None) => return Some((Ok(StreamEvent::Done), ReceiverState::Closed)),
                Err(e) => {
                    tracing::error!(error = %e, "bedrock stream failed");
                    return Some((Err(LlmError::Streaming(e.to_string())), ReceiverState::Closed));
                }
            }
        }
    });

    Box::pin(stream)
}

pub(crate) fn unix_now() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

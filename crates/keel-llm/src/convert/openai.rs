//! Conversion between internal types and `OpenAI` wire format

use crate::error::LlmError;
use crate::protocol::openai::{
    OpenAiChoice, OpenAiChoiceMessage, OpenAiContent, OpenAiContentPart, OpenAiMessage, OpenAiRequest, OpenAiResponse,
    OpenAiStreamChoice, OpenAiStreamChunk, OpenAiStreamDelta, OpenAiUsage,
};
use crate::types::{
    Choice, CompletionRequest, CompletionResponse, DEFAULT_TEMPERATURE, Message, Role, StreamDelta, StreamEvent,
    TEMPERATURE_RANGE, Usage,
};

// -- Inbound: OpenAI wire format -> internal types --

impl TryFrom<OpenAiRequest> for CompletionRequest {
    type Error = LlmError;

    fn try_from(req: OpenAiRequest) -> Result<Self, Self::Error> {
        let temperature = req.temperature.unwrap_or(DEFAULT_TEMPERATURE);

        if !TEMPERATURE_RANGE.contains(&temperature) {
            return Err(LlmError::InvalidRequest(format!(
                "temperature must be between {} and {}, got {temperature}",
                TEMPERATURE_RANGE.start(),
                TEMPERATURE_RANGE.end()
            )));
        }

        let messages = req
            .messages
            .into_iter()
            .map(Message::try_from)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            model: req.model,
            messages,
            temperature,
            stream: req.stream.unwrap_or(false),
            passthrough: req.extra,
        })
    }
}

impl TryFrom<OpenAiMessage> for Message {
    type Error = LlmError;

    fn try_from(msg: OpenAiMessage) -> Result<Self, Self::Error> {
        let role: Role = msg.role.parse().map_err(LlmError::InvalidRequest)?;

        let content = match msg.content {
            Some(OpenAiContent::Text(text)) => text,
            Some(OpenAiContent::Parts(parts)) => parts
                .into_iter()
                .filter_map(|part| match part {
                    OpenAiContentPart::Text { text } => Some(text),
                    OpenAiContentPart::Unsupported => None,
                })
                .collect(),
            None => String::new(),
        };

        Ok(Self { role, content })
    }
}

// -- Outbound: internal types -> OpenAI wire format --

impl From<CompletionResponse> for OpenAiResponse {
    fn from(resp: CompletionResponse) -> Self {
        Self {
            id: resp.id,
            object: resp.object,
            created: resp.created,
            model: resp.model,
            choices: resp.choices.into_iter().map(Into::into).collect(),
            usage: resp.usage.map(Into::into),
        }
    }
}

impl From<Choice> for OpenAiChoice {
    fn from(choice: Choice) -> Self {
        Self {
            index: choice.index,
            message: OpenAiChoiceMessage {
                role: choice.message.role,
                content: choice.message.content,
            },
            finish_reason: choice.finish_reason.map(|fr| fr.as_str().to_owned()),
        }
    }
}

impl From<Usage> for OpenAiUsage {
    fn from(usage: Usage) -> Self {
        Self {
            prompt_tokens: usage.prompt_tokens,
            completion_tokens: usage.completion_tokens,
            total_tokens: usage.total_tokens,
        }
    }
}

// -- Stream conversion --

/// Turns internal stream events into `chat.completion.chunk` objects
///
/// Every chunk of one stream shares the id, model and creation time. The
/// assistant role is attached to the first content chunk only.
#[derive(Debug)]
pub struct ChunkEncoder {
    id: String,
    model: String,
    created: u64,
    role_sent: bool,
}

impl ChunkEncoder {
    pub fn new(id: String, model: String, created: u64) -> Self {
        Self {
            id,
            model,
            created,
            role_sent: false,
        }
    }

    /// Encode one event, `None` for [`StreamEvent::Done`]
    pub fn encode(&mut self, event: &StreamEvent) -> Option<OpenAiStreamChunk> {
        match event {
            StreamEvent::Delta(delta) => Some(self.delta_chunk(delta)),
            StreamEvent::Usage(usage) => Some(self.chunk(Vec::new(), Some((*usage).into()))),
            StreamEvent::Done => None,
        }
    }

    fn delta_chunk(&mut self, delta: &StreamDelta) -> OpenAiStreamChunk {
        let role = (!self.role_sent).then(|| Role::Assistant.as_str().to_owned());
        self.role_sent = true;

        let choice = OpenAiStreamChoice {
            index: delta.index,
            delta: OpenAiStreamDelta {
                role,
                content: delta.content.clone(),
            },
            finish_reason: delta.finish_reason.map(|fr| fr.as_str().to_owned()),
        };

        self.chunk(vec![choice], None)
    }

    fn chunk(&self, choices: Vec<OpenAiStreamChoice>, usage: Option<OpenAiUsage>) -> OpenAiStreamChunk {
        OpenAiStreamChunk {
            id: self.id.clone(),
            object: "chat.completion.chunk".to_owned(),
            created: self.created,
            model: self.model.clone(),
            choices,
            usage,
        }
    }
}

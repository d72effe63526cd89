use serde::{Deserialize, Serialize};

use super::response::{FinishReason, Usage};

/// One item of a streaming completion
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum StreamEvent {
    /// Incremental content delta
    Delta(StreamDelta),
    /// Final usage statistics
    Usage(Usage),
    /// Stream has completed
    Done,
}

/// Incremental update within a streaming response
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StreamDelta {
    /// Choice index this delta belongs to
    pub index: u32,
    /// Incremental text content
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    /// Present on the final delta
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finish_reason: Option<FinishReason>,
}

impl StreamDelta {
    /// Delta carrying only text
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            index: 0,
            content: Some(content.into()),
            finish_reason: None,
        }
    }

    /// Closing delta carrying only the finish reason
    pub const fn finish(reason: FinishReason) -> Self {
        Self {
            index: 0,
            content: None,
            finish_reason: Some(reason),
        }
    }
}

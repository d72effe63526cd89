use std::ops::RangeInclusive;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use super::message::Message;

/// Temperature applied when the client sends none
pub const DEFAULT_TEMPERATURE: f64 = 0.7;

/// Accepted sampling temperatures
pub const TEMPERATURE_RANGE: RangeInclusive<f64> = 0.0..=2.0;

/// Internal canonical completion request
///
/// Rewritten in place as the gateway substitutes models and replaces the
/// conversation with optimised output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompletionRequest {
    /// Model identifier
    pub model: String,
    /// Conversation messages, in order
    pub messages: Vec<Message>,
    /// Sampling temperature
    pub temperature: f64,
    /// Whether to stream the response
    #[serde(default)]
    pub stream: bool,
    /// Request fields the gateway does not interpret, in arrival order
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub passthrough: IndexMap<String, serde_json::Value>,
}

impl CompletionRequest {
    /// Build a request with default temperature and no passthrough fields
    pub fn new(model: impl Into<String>, messages: Vec<Message>) -> Self {
        Self {
            model: model.into(),
            messages,
            temperature: DEFAULT_TEMPERATURE,
            stream: false,
            passthrough: IndexMap::new(),
        }
    }

    /// Passthrough field as an unsigned integer, if present and numeric
    pub fn passthrough_u64(&self, key: &str) -> Option<u64> {
        self.passthrough.get(key).and_then(serde_json::Value::as_u64)
    }

    /// Passthrough field as a float, if present and numeric
    pub fn passthrough_f64(&self, key: &str) -> Option<f64> {
        self.passthrough.get(key).and_then(serde_json::Value::as_f64)
    }

    /// Stop sequences from the `stop` passthrough field
    ///
    /// Accepts either a single string or an array of strings.
    pub fn stop_sequences(&self) -> Vec<String> {
        match self.passthrough.get("stop") {
            Some(serde_json::Value::String(stop)) => vec![stop.clone()],
            Some(serde_json::Value::Array(values)) => values
                .iter()
                .filter_map(|v| v.as_str().map(ToOwned::to_owned))
                .collect(),
            _ => Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn stop_accepts_string_or_array() {
        let mut request = CompletionRequest::new("m", Vec::new());
        assert!(request.stop_sequences().is_empty());

        request.passthrough.insert("stop".to_owned(), json!("END"));
        assert_eq!(request.stop_sequences(), vec!["END"]);

        request.passthrough.insert("stop".to_owned(), json!(["a", 3, "b"]));
        assert_eq!(request.stop_sequences(), vec!["a", "b"]);
    }

    #[test]
    fn numeric_passthrough_fields() {
        let mut request = CompletionRequest::new("m", Vec::new());
        request.passthrough.insert("max_tokens".to_owned(), json!(256));
        request.passthrough.insert("top_p".to_owned(), json!(0.9));
        request.passthrough.insert("user".to_owned(), json!("alice"));

        assert_eq!(request.passthrough_u64("max_tokens"), Some(256));
        assert!(request.passthrough_f64("top_p").is_some_and(|p| (p - 0.9).abs() < f64::EPSILON));
        assert_eq!(request.passthrough_u64("user"), None);
    }
}

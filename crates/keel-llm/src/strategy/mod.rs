//! Optimisation strategies and their registry

mod direct;
mod registry;

pub use direct::DirectStrategy;
pub use registry::StrategyRegistry;

use crate::error::StrategyError;

/// What a strategy receives: the conversation flattened to text
#[derive(Debug, Clone, PartialEq)]
pub struct StrategyInput {
    /// Content of the first system message, or empty
    pub system_prompt: String,
    /// Remaining turns rendered as `Role: content`, one per line
    pub initial_query: String,
    /// Model the strategy should use for its own backend calls
    pub model: String,
    pub temperature: f64,
}

/// What a strategy returns
#[derive(Debug, Clone, PartialEq)]
pub struct StrategyOutput {
    /// Text that replaces the conversation
    pub content: String,
    /// Strategy-specific detail, logged and otherwise ignored
    pub metadata: serde_json::Value,
}

/// A named conversation rewriter
///
/// Strategies run on the blocking thread pool and may take as long as they
/// need. They must not keep per-request state between calls.
pub trait Strategy: Send + Sync {
    /// Name used to select the strategy from a model identifier
    fn name(&self) -> &str;

    /// Produce optimised content for the conversation
    fn run(&self, input: &StrategyInput) -> Result<StrategyOutput, StrategyError>;
}

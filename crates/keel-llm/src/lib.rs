//! Chat-completion gateway core for Keel
//!
//! Accepts OpenAI-shaped chat requests, picks an optional optimisation
//! strategy from the model identifier, resolves the model against the
//! backend with default and fallback substitution, and returns either a
//! complete response or a token stream. The inference service itself is
//! reached only through the [`Backend`] trait.

#![allow(clippy::must_use_candidate, clippy::missing_errors_doc)]

pub mod adapter;
pub mod backend;
pub mod convert;
pub mod error;
pub mod gateway;
#[cfg(feature = "http")]
pub mod handler;
pub mod protocol;
pub mod resolver;
pub mod strategy;
#[cfg(test)]
mod testing;
pub mod types;

pub use adapter::OptimisationAdapter;
pub use backend::{Backend, EventStream};
pub use error::{LlmError, StrategyError};
pub use gateway::GatewayState;
#[cfg(feature = "http")]
pub use handler::{error_response, llm_router};
pub use resolver::ModelResolver;
pub use strategy::{DirectStrategy, Strategy, StrategyInput, StrategyOutput, StrategyRegistry};
pub use types::{CompletionRequest, CompletionResponse, Message, Role, StreamEvent};

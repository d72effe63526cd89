//! Optimisation adapter: strategy selection and conversation rewriting

use std::sync::Arc;
use std::time::Instant;

use keel_config::OptimisationConfig;
use keel_telemetry::GatewayMetrics;

use crate::error::LlmError;
use crate::strategy::{StrategyInput, StrategyRegistry};
use crate::types::{CompletionRequest, Message, Role};

/// Strategy and model parsed out of a model identifier
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selection {
    pub strategy: String,
    pub model: String,
}

/// Runs optimisation strategies over chat requests
///
/// Holds no per-request state; the selected strategy travels with each
/// call.
#[derive(Debug, Clone)]
pub struct OptimisationAdapter {
    enabled: bool,
    default_strategy: String,
    registry: Arc<StrategyRegistry>,
    metrics: GatewayMetrics,
}

impl OptimisationAdapter {
    /// Build the adapter over a finished registry
    ///
    /// # Errors
    ///
    /// [`LlmError::Configuration`] when optimisation is enabled but no
    /// strategy is registered.
    pub fn new(config: &OptimisationConfig, registry: Arc<StrategyRegistry>) -> Result<Self, LlmError> {
        if config.enabled {
            if registry.is_empty() {
                return Err(LlmError::Configuration(
                    "optimisation is enabled but no strategies are registered".to_owned(),
                ));
            }

            if !registry.contains(&config.default_strategy) {
                tracing::warn!(
                    strategy = %config.default_strategy,
                    registered = ?registry.names(),
                    "default optimisation strategy is not registered, requests without a strategy prefix will fail"
                );
            }

            tracing::info!(
                default = %config.default_strategy,
                strategies = ?registry.names(),
                "optimisation enabled"
            );
        }

        Ok(Self {
            enabled: config.enabled,
            default_strategy: config.default_strategy.clone(),
            registry,
            metrics: GatewayMetrics::new(),
        })
    }

    pub const fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Split a strategy prefix off a model identifier
    ///
    /// `bon-anthropic.claude-x` selects `bon` with model `anthropic.claude-x`
    /// when `bon` is registered, and `bon-` selects `bon` with an empty
    /// model that resolves to the default. Anything else keeps the whole
    /// identifier as the model and selects the default strategy.
    pub fn select(&self, model: &str) -> Selection {
        if let Some((head, rest)) = model.split_once('-')
            && self.registry.contains(head)
        {
            return Selection {
                strategy: head.to_owned(),
                model: rest.to_owned(),
            };
        }

        Selection {
            strategy: self.default_strategy.clone(),
            model: model.to_owned(),
        }
    }

    /// Select a strategy from the request's model and apply it
    ///
    /// The identity when optimisation is disabled.
    pub async fn optimise(&self, mut request: CompletionRequest) -> Result<CompletionRequest, LlmError> {
        if !self.enabled {
            return Ok(request);
        }

        let selection = self.select(&request.model);
        request.model = selection.model;

        self.apply(request, &selection.strategy).await
    }

    /// Run `strategy` over the conversation and replace it with the output
    ///
    /// The strategy runs on the blocking pool. Its errors and panics come
    /// back as [`LlmError::OptimisationFailed`].
    pub async fn apply(&self, request: CompletionRequest, strategy: &str) -> Result<CompletionRequest, LlmError> {
        let Some(runner) = self.registry.lookup(strategy) else {
            return Err(LlmError::UnknownStrategy {
                name: strategy.to_owned(),
            });
        };

        let (system_prompt, initial_query) = partition(&request.messages);
        let input = StrategyInput {
            system_prompt,
            initial_query,
            model: request.model.clone(),
            temperature: request.temperature,
        };

        tracing::debug!(strategy = %strategy, model = %input.model, "running optimisation strategy");

        let start = Instant::now();
        let joined = tokio::task::spawn_blocking(move || runner.run(&input)).await;

        let output = match joined {
            Ok(Ok(output)) => output,
            Ok(Err(e)) => {
                self.metrics.record_strategy(strategy, false, start);
                tracing::error!(strategy = %strategy, error = %e, "optimisation strategy failed");
                return Err(e.into());
            }
            Err(e) => {
                self.metrics.record_strategy(strategy, false, start);
                tracing::error!(strategy = %strategy, error = %e, "optimisation strategy did not complete");
                let cause = if e.is_panic() { "strategy panicked" } else { "strategy was cancelled" };
                return Err(LlmError::OptimisationFailed {
                    cause: cause.to_owned(),
                });
            }
        };

        self.metrics.record_strategy(strategy, true, start);
        tracing::debug!(strategy = %strategy, details = %output.metadata, "optimisation finished");

        Ok(CompletionRequest {
            messages: vec![Message::assistant(output.content)],
            ..request
        })
    }
}

/// Flatten a conversation for a strategy
///
/// Returns the first non-empty system message's content (later ones are
/// dropped) and every other turn as `Role: content`, joined with newlines.
pub fn partition(messages: &[Message]) -> (String, String) {
    let mut system_prompt = None;
    let mut turns = Vec::with_capacity(messages.len());

    for message in messages {
        match message.role {
            Role::System => {
                if system_prompt.is_none() && !message.content.is_empty() {
                    system_prompt = Some(message.content.clone());
                }
            }
            role => turns.push(format!("{}: {}", role.label(), message.content)),
        }
    }

    (system_prompt.unwrap_or_default(), turns.join("\n"))
}

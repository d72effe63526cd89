//! Model selection with default and fallback substitution

use keel_config::LlmConfig;
use keel_telemetry::GatewayMetrics;
use keel_telemetry::metrics::Substitution;

use crate::backend::Backend;
use crate::error::LlmError;

/// Decides which model the backend is actually asked for
///
/// Recomputed for every request; nothing is cached between calls.
#[derive(Debug, Clone)]
pub struct ModelResolver {
    default_model: String,
    fallback_model: String,
    foreign_prefixes: Vec<String>,
    metrics: GatewayMetrics,
}

impl ModelResolver {
    pub fn new(default_model: String, fallback_model: String, foreign_prefixes: &[String]) -> Self {
        Self {
            default_model,
            fallback_model,
            foreign_prefixes: foreign_prefixes.iter().map(|p| p.to_lowercase()).collect(),
            metrics: GatewayMetrics::new(),
        }
    }

    pub fn from_config(config: &LlmConfig) -> Self {
        Self::new(
            config.default_model.clone(),
            config.fallback_model.clone(),
            &config.foreign_prefixes,
        )
    }

    pub fn default_model(&self) -> &str {
        &self.default_model
    }

    pub fn fallback_model(&self) -> &str {
        &self.fallback_model
    }

    /// Replace blank and foreign-vendor model ids with the default model
    pub fn normalize(&self, requested: &str) -> String {
        let trimmed = requested.trim();

        if trimmed.is_empty() {
            tracing::info!(default = %self.default_model, "no model requested, using default");
            self.metrics.record_substitution(Substitution::Default);
            return self.default_model.clone();
        }

        if self.is_foreign(trimmed) {
            tracing::info!(requested = %trimmed, default = %self.default_model, "foreign model requested, using default");
            self.metrics.record_substitution(Substitution::Default);
            return self.default_model.clone();
        }

        trimmed.to_owned()
    }

    /// Normalize, validate, and fall back if needed
    ///
    /// # Errors
    ///
    /// [`LlmError::Configuration`] when neither the normalized model nor the
    /// fallback model is supported. Backend errors during validation count
    /// as unsupported and never surface on their own.
    pub async fn resolve(&self, requested: &str, backend: &dyn Backend) -> Result<String, LlmError> {
        let candidate = self.normalize(requested);

        if self.validate(&candidate, backend).await {
            return Ok(candidate);
        }

        if candidate != self.fallback_model {
            tracing::warn!(requested = %candidate, fallback = %self.fallback_model, "model not supported, trying fallback");
            self.metrics.record_substitution(Substitution::Fallback);

            if self.validate(&self.fallback_model, backend).await {
                return Ok(self.fallback_model.clone());
            }
        }

        tracing::error!(requested = %candidate, fallback = %self.fallback_model, "no usable model");

        Err(LlmError::Configuration(format!(
            "both requested model `{candidate}` and fallback model `{}` are not supported by the `{}` backend",
            self.fallback_model,
            backend.name()
        )))
    }

    fn is_foreign(&self, model: &str) -> bool {
        let lowered = model.to_lowercase();
        self.foreign_prefixes.iter().any(|prefix| lowered.starts_with(prefix))
    }

    async fn validate(&self, model: &str, backend: &dyn Backend) -> bool {
        match backend.supports_model(model).await {
            Ok(supported) => supported,
            Err(e) => {
                tracing::warn!(model = %model, error = %e, "model validation failed");
                false
            }
        }
    }
}

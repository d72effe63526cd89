use serde::Deserialize;

/// Optimisation strategy configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OptimisationConfig {
    /// Rewrite conversations through a strategy before invoking the backend
    #[serde(default)]
    pub enabled: bool,
    /// Strategy used when the model identifier does not name one
    #[serde(default = "default_strategy")]
    pub default_strategy: String,
}

impl Default for OptimisationConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            default_strategy: default_strategy(),
        }
    }
}

fn default_strategy() -> String {
    "direct".to_owned()
}

#![allow(clippy::must_use_candidate)]

pub mod auth;
mod env;
pub mod health;
pub mod llm;
mod loader;
pub mod optimisation;
pub mod server;
pub mod telemetry;

use serde::Deserialize;

pub use auth::*;
pub use health::*;
pub use llm::*;
pub use optimisation::*;
pub use server::*;
pub use telemetry::TelemetryConfig;

/// Top-level Keel configuration
///
/// Read once at process start and treated as immutable afterwards
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Server configuration
    #[serde(default)]
    pub server: ServerConfig,
    /// Bearer token authentication
    #[serde(default)]
    pub auth: AuthConfig,
    /// Backend and model selection
    #[serde(default)]
    pub llm: LlmConfig,
    /// Optimisation strategy selection
    #[serde(default)]
    pub optimisation: OptimisationConfig,
    /// Telemetry configuration
    #[serde(default)]
    pub telemetry: Option<TelemetryConfig>,
}

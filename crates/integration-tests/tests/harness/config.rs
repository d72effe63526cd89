//! Programmatic configuration builder for integration tests

use std::net::SocketAddr;

use keel_config::{AuthConfig, Config, HealthConfig, LlmConfig, OptimisationConfig, ServerConfig};
use secrecy::SecretString;

use super::{API_KEY, DEFAULT_MODEL, FALLBACK_MODEL};

/// Builder for constructing test configurations
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Create a new builder with minimal defaults
    pub fn new() -> Self {
        Self {
            config: Config {
                server: ServerConfig {
                    listen_address: Some(SocketAddr::from(([127, 0, 0, 1], 0))),
                    health: HealthConfig {
                        enabled: true,
                        ..HealthConfig::default()
                    },
                    ..ServerConfig::default()
                },
                auth: AuthConfig {
                    api_key: SecretString::from(API_KEY),
                    ..AuthConfig::default()
                },
                llm: LlmConfig {
                    default_model: DEFAULT_MODEL.to_owned(),
                    fallback_model: FALLBACK_MODEL.to_owned(),
                    ..LlmConfig::default()
                },
                optimisation: OptimisationConfig::default(),
                telemetry: None,
            },
        }
    }

    /// Turn optimisation on with the given default strategy
    pub fn with_optimisation(mut self, default_strategy: &str) -> Self {
        self.config.optimisation = OptimisationConfig {
            enabled: true,
            default_strategy: default_strategy.to_owned(),
        };
        self
    }

    pub fn with_route_prefix(mut self, prefix: &str) -> Self {
        self.config.server.route_prefix = prefix.to_owned();
        self
    }

    /// Disable health endpoint
    pub fn without_health(mut self) -> Self {
        self.config.server.health.enabled = false;
        self
    }

    /// Build the final config
    pub fn build(self) -> Config {
        self.config
    }
}

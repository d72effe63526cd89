use secrecy::SecretString;
use serde::Deserialize;

/// Backend and model selection configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LlmConfig {
    /// Model used when the request names none or names a foreign vendor's model
    #[serde(default = "default_model")]
    pub default_model: String,
    /// Model used when the requested (or default) model fails validation
    #[serde(default = "default_fallback_model")]
    pub fallback_model: String,
    /// Model-name prefixes the backend never serves (matched case-insensitively)
    #[serde(default = "default_foreign_prefixes")]
    pub foreign_prefixes: Vec<String>,
    /// AWS Bedrock backend
    #[serde(default)]
    pub bedrock: BedrockConfig,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            default_model: default_model(),
            fallback_model: default_fallback_model(),
            foreign_prefixes: default_foreign_prefixes(),
            bedrock: BedrockConfig::default(),
        }
    }
}

/// AWS Bedrock-specific configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BedrockConfig {
    /// AWS region
    #[serde(default = "default_region")]
    pub region: String,
    /// Access key ID (optional, uses default credential chain if absent)
    #[serde(default)]
    pub access_key_id: Option<SecretString>,
    /// Secret access key
    #[serde(default)]
    pub secret_access_key: Option<SecretString>,
    /// How often the supported-model catalog is refreshed
    #[serde(default = "default_refresh_interval")]
    pub catalog_refresh_seconds: u64,
}

impl Default for BedrockConfig {
    fn default() -> Self {
        Self {
            region: default_region(),
            access_key_id: None,
            secret_access_key: None,
            catalog_refresh_seconds: default_refresh_interval(),
        }
    }
}

fn default_model() -> String {
    "anthropic.claude-3-5-sonnet-20241022-v2:0".to_owned()
}

fn default_fallback_model() -> String {
    "anthropic.claude-3-sonnet-20240229-v1:0".to_owned()
}

fn default_foreign_prefixes() -> Vec<String> {
    vec!["gpt-".to_owned()]
}

fn default_region() -> String {
    "us-west-2".to_owned()
}

#[allow(clippy::missing_const_for_fn)]
fn default_refresh_interval() -> u64 {
    300
}

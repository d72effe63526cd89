use secrecy::SecretString;
use serde::Deserialize;

/// Bearer token authentication for the chat endpoints
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AuthConfig {
    /// Token clients must present as `Authorization: Bearer <api_key>`
    #[serde(default = "default_api_key")]
    pub api_key: SecretString,

    /// SSM parameter holding the token, read once at startup
    ///
    /// Takes precedence over `api_key` when set.
    #[serde(default)]
    pub api_key_parameter: Option<String>,

    /// Paths that skip authentication
    #[serde(default = "default_public_paths")]
    pub public_paths: Vec<String>,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            api_key: default_api_key(),
            api_key_parameter: None,
            public_paths: default_public_paths(),
        }
    }
}

fn default_api_key() -> SecretString {
    SecretString::from("bedrock")
}

fn default_public_paths() -> Vec<String> {
    vec!["/health".to_owned()]
}

//! Bearer token lookup in AWS Systems Manager Parameter Store

use anyhow::Context;
use aws_config::SdkConfig;
use aws_sdk_ssm::error::DisplayErrorContext;
use keel_config::AuthConfig;
use secrecy::SecretString;

/// The token clients must present
///
/// Reads `auth.api_key_parameter` with decryption when it is set, and a
/// failed lookup is fatal. Otherwise the configured `api_key`.
pub async fn resolve_api_key(auth: &AuthConfig, sdk_config: &SdkConfig) -> anyhow::Result<SecretString> {
    let Some(name) = auth.api_key_parameter.as_deref() else {
        return Ok(auth.api_key.clone());
    };

    let client = aws_sdk_ssm::Client::new(sdk_config);
    let output = client
        .get_parameter()
        .name(name)
        .with_decryption(true)
        .send()
        .await
        .map_err(|e| anyhow::anyhow!("failed to read API key parameter `{name}`: {}", DisplayErrorContext(&e)))?;

    let value = output
        .parameter()
        .and_then(|p| p.value())
        .filter(|v| !v.is_empty())
        .with_context(|| format!("API key parameter `{name}` has no value"))?;

    tracing::info!(parameter = %name, "loaded API key from parameter store");

    Ok(SecretString::from(value.to_owned()))
}

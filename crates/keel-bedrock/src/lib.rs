//! AWS Bedrock backend for Keel
//!
//! Implements [`keel_llm::Backend`] over the Bedrock Converse API and keeps
//! a periodically refreshed catalog of the models the account can invoke.

#![allow(clippy::must_use_candidate, clippy::missing_errors_doc)]

mod catalog;
mod converse;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use aws_config::SdkConfig;
use aws_sdk_bedrockruntime::Client as RuntimeClient;
use aws_sdk_bedrockruntime::error::DisplayErrorContext;
use keel_config::BedrockConfig;
use keel_core::RequestContext;
use keel_llm::types::{Choice, ChoiceMessage, CompletionRequest, CompletionResponse};
use keel_llm::{Backend, EventStream, LlmError};
use secrecy::ExposeSecret;

pub use catalog::ModelCatalog;

/// Bedrock backend using the Converse and `ConverseStream` operations
pub struct BedrockBackend {
    runtime: RuntimeClient,
    catalog: Arc<ModelCatalog>,
}

impl BedrockBackend {
    /// Build clients, load the model catalog and start refreshing it
    ///
    /// A failed initial catalog load is logged, not fatal; validation
    /// reports errors until a refresh succeeds.
    pub async fn connect(config: &BedrockConfig) -> Self {
        let sdk_config = load_sdk_config(config).await;
        Self::from_sdk_config(&sdk_config, config).await
    }

    /// Same as [`BedrockBackend::connect`] over an already loaded SDK config
    pub async fn from_sdk_config(sdk_config: &SdkConfig, config: &BedrockConfig) -> Self {
        let runtime = RuntimeClient::new(sdk_config);
        let control = aws_sdk_bedrock::Client::new(sdk_config);

        let catalog = Arc::new(ModelCatalog::new());
        catalog.refresh(&control).await;
        ModelCatalog::spawn_refresh(&catalog, control, Duration::from_secs(config.catalog_refresh_seconds));

        tracing::info!(region = %config.region, models = catalog.len().await, "bedrock backend ready");

        Self { runtime, catalog }
    }
}

/// Shared AWS configuration for every AWS client Keel builds
pub async fn load_sdk_config(config: &BedrockConfig) -> SdkConfig {
    let mut loader = aws_config::defaults(aws_config::BehaviorVersion::latest())
        .region(aws_config::Region::new(config.region.clone()));

    // Static keys override the default credential chain
    if let (Some(access_key), Some(secret_key)) = (&config.access_key_id, &config.secret_access_key) {
        let credentials = aws_credential_types::Credentials::new(
            access_key.expose_secret(),
            secret_key.expose_secret(),
            None,
            None,
            "keel-config",
        );
        loader = loader.credentials_provider(credentials);
    }

    loader.load().await
}

#[async_trait]
impl Backend for BedrockBackend {
    fn name(&self) -> &str {
        "bedrock"
    }

    async fn supports_model(&self, model: &str) -> Result<bool, LlmError> {
        self.catalog.contains(model).await
    }

    async fn list_models(&self) -> Result<Vec<String>, LlmError> {
        Ok(self.catalog.models().await)
    }

    async fn complete(
        &self,
        request: &CompletionRequest,
        context: &RequestContext,
    ) -> Result<CompletionResponse, LlmError> {
        let input = converse::build_input(request)?;

        let output = self
            .runtime
            .converse()
            .model_id(&request.model)
            .set_system((!input.system.is_empty()).then_some(input.system))
            .set_messages(Some(input.messages))
            .inference_config(converse::inference_config(request))
            .send()
            .await
            .map_err(|e| {
                tracing::error!(request_id = %context.request_id, model = %request.model, error = %DisplayErrorContext(&e), "bedrock converse failed");
                LlmError::Upstream(DisplayErrorContext(&e).to_string())
            })?;

        let created = converse::unix_now();

        Ok(CompletionResponse {
            id: format!("chatcmpl-{}", uuid::Uuid::new_v4().simple()),
            object: "chat.completion".to_owned(),
            created,
            model: request.model.clone(),
            choices: vec![Choice {
                index: 0,
                message: ChoiceMessage::text(converse::output_text(output.output())),
                finish_reason: Some(converse::finish_reason(output.stop_reason())),
            }],
            usage: output.usage().map(converse::usage),
        })
    }

    async fn complete_stream(
        &self,
        request: &CompletionRequest,
        context: &RequestContext,
    ) -> Result<EventStream, LlmError> {
        let input = converse::build_input(request)?;

        let output = self
            .runtime
            .converse_stream()
            .model_id(&request.model)
            .set_system((!input.system.is_empty()).then_some(input.system))
            .set_messages(Some(input.messages))
            .inference_config(converse::inference_config(request))
            .send()
            .await
            .map_err(|e| {
                tracing::error!(request_id = %context.request_id, model = %request.model, error = %DisplayErrorContext(&e), "bedrock converse_stream failed");
                LlmError::Upstream(DisplayErrorContext(&e).to_string())
            })?;

        Ok(converse::event_stream(output.stream))
    }
}

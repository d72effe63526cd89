//! Completion gateway: the per-request control flow

use std::sync::Arc;
use std::time::Instant;

use keel_config::{LlmConfig, OptimisationConfig};
use keel_core::{HttpError, RequestContext};
use keel_telemetry::GatewayMetrics;
use keel_telemetry::metrics::Branch;

use crate::adapter::OptimisationAdapter;
use crate::backend::{Backend, EventStream};
use crate::error::LlmError;
use crate::resolver::ModelResolver;
use crate::strategy::StrategyRegistry;
use crate::types::{CompletionRequest, CompletionResponse};

/// Shared state for the chat completion handlers
///
/// Cheap to clone; everything behind the `Arc` is read-only.
#[derive(Clone)]
pub struct GatewayState {
    inner: Arc<GatewayInner>,
}

struct GatewayInner {
    backend: Arc<dyn Backend>,
    resolver: ModelResolver,
    adapter: OptimisationAdapter,
    metrics: GatewayMetrics,
}

impl GatewayState {
    pub fn new(backend: Arc<dyn Backend>, resolver: ModelResolver, adapter: OptimisationAdapter) -> Self {
        Self {
            inner: Arc::new(GatewayInner {
                backend,
                resolver,
                adapter,
                metrics: GatewayMetrics::new(),
            }),
        }
    }

    /// Assemble the gateway from configuration
    ///
    /// # Errors
    ///
    /// [`LlmError::Configuration`] when optimisation is enabled and the
    /// registry is empty
    pub fn from_config(
        llm: &LlmConfig,
        optimisation: &OptimisationConfig,
        backend: Arc<dyn Backend>,
        registry: StrategyRegistry,
    ) -> Result<Self, LlmError> {
        let resolver = ModelResolver::from_config(llm);
        let adapter = OptimisationAdapter::new(optimisation, Arc::new(registry))?;

        tracing::info!(
            backend = %backend.name(),
            default_model = %resolver.default_model(),
            fallback_model = %resolver.fallback_model(),
            optimisation = adapter.is_enabled(),
            "completion gateway ready"
        );

        Ok(Self::new(backend, resolver, adapter))
    }

    pub fn backend(&self) -> &Arc<dyn Backend> {
        &self.inner.backend
    }

    /// Serve a non-streaming completion
    ///
    /// The response's `model` is the resolved model, whatever the backend
    /// echoes.
    ///
    /// # Errors
    ///
    /// Resolution, optimisation and backend failures, unretried
    pub async fn complete(
        &self,
        request: CompletionRequest,
        context: RequestContext,
    ) -> Result<CompletionResponse, LlmError> {
        let start = Instant::now();
        let branch = self.branch();

        let result: Result<CompletionResponse, LlmError> = async {
            let request = self.prepare(request).await?;
            let mut response = self.inner.backend.complete(&request, &context).await?;
            response.model = request.model;
            Ok(response)
        }
        .await;

        self.record(branch, false, start, &result);
        result
    }

    /// Serve a streaming completion
    ///
    /// Returns the resolved model alongside the backend stream so every
    /// chunk can carry it.
    ///
    /// # Errors
    ///
    /// Failures before the first chunk; later ones travel inside the stream
    pub async fn complete_stream(
        &self,
        request: CompletionRequest,
        context: RequestContext,
    ) -> Result<(String, EventStream), LlmError> {
        let start = Instant::now();
        let branch = self.branch();

        let result: Result<(String, EventStream), LlmError> = async {
            let request = self.prepare(request).await?;
            let stream = self.inner.backend.complete_stream(&request, &context).await?;
            Ok((request.model, stream))
        }
        .await;

        self.record(branch, true, start, &result);
        result
    }

    /// Models the backend can serve
    ///
    /// # Errors
    ///
    /// Propagates the backend's error
    pub async fn list_models(&self) -> Result<Vec<String>, LlmError> {
        self.inner.backend.list_models().await
    }

    /// Turn a client request into the one the backend receives
    ///
    /// With optimisation on, the strategy prefix is split off first and the
    /// remaining model is resolved before the strategy runs, so both the
    /// strategy and the final call use the validated model.
    async fn prepare(&self, mut request: CompletionRequest) -> Result<CompletionRequest, LlmError> {
        let backend = self.inner.backend.as_ref();

        if !self.inner.adapter.is_enabled() {
            request.model = self.inner.resolver.resolve(&request.model, backend).await?;
            return Ok(request);
        }

        let selection = self.inner.adapter.select(&request.model);
        request.model = self.inner.resolver.resolve(&selection.model, backend).await?;

        tracing::debug!(strategy = %selection.strategy, model = %request.model, "optimising request");

        self.inner.adapter.apply(request, &selection.strategy).await
    }

    fn branch(&self) -> Branch {
        if self.inner.adapter.is_enabled() {
            Branch::Optimised
        } else {
            Branch::Direct
        }
    }

    fn record<T>(&self, branch: Branch, stream: bool, start: Instant, result: &Result<T, LlmError>) {
        let outcome = match result {
            Ok(_) => "success",
            Err(e) => e.error_type(),
        };

        self.inner.metrics.record_request(branch, outcome, stream, start);
    }
}

impl std::fmt::Debug for GatewayState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GatewayState")
            .field("backend", &self.inner.backend.name())
            .field("resolver", &self.inner.resolver)
            .field("adapter", &self.inner.adapter)
            .finish_non_exhaustive()
    }
}

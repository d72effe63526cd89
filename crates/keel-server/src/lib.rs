//! HTTP server assembly for Keel

#![allow(clippy::must_use_candidate, clippy::missing_errors_doc)]

mod auth;
mod health;
mod request_context;
mod secret;

use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use keel_bedrock::BedrockBackend;
use keel_config::Config;
use keel_llm::{Backend, GatewayState, StrategyRegistry};
use tower_http::trace::TraceLayer;

pub use request_context::REQUEST_ID_HEADER;

/// Assembled server with all routes and middleware
pub struct Server {
    router: Router,
    listen_address: SocketAddr,
}

impl Server {
    /// Build the server from configuration, backed by Bedrock
    ///
    /// # Errors
    ///
    /// Returns an error if the API key parameter cannot be read or the
    /// completion gateway cannot be assembled
    pub async fn new(mut config: Config) -> anyhow::Result<Self> {
        let sdk_config = keel_bedrock::load_sdk_config(&config.llm.bedrock).await;
        config.auth.api_key = secret::resolve_api_key(&config.auth, &sdk_config).await?;

        let backend: Arc<dyn Backend> = Arc::new(BedrockBackend::from_sdk_config(&sdk_config, &config.llm.bedrock).await);
        let registry = StrategyRegistry::builtin(backend.clone(), tokio::runtime::Handle::current());

        Self::with_backend(config, backend, registry)
    }

    /// Build the server over any backend and strategy set
    ///
    /// # Errors
    ///
    /// Returns an error if optimisation is enabled with an empty registry
    pub fn with_backend(config: Config, backend: Arc<dyn Backend>, registry: StrategyRegistry) -> anyhow::Result<Self> {
        let listen_address = config
            .server
            .listen_address
            .unwrap_or_else(|| SocketAddr::from(([0, 0, 0, 0], 8000)));

        let gateway = GatewayState::from_config(&config.llm, &config.optimisation, backend, registry)?;

        let mut app = Router::new();

        // Chat routes under the prefix; axum refuses to nest at the root
        let chat = keel_llm::llm_router(gateway);
        app = if config.server.route_prefix == "/" {
            app.merge(chat)
        } else {
            app.nest(&config.server.route_prefix, chat)
        };

        if config.server.health.enabled {
            app = app.route(&config.server.health.path, axum::routing::get(health::health_handler));
        }

        // Apply middleware layers (innermost first)

        app = app.layer(axum::middleware::from_fn(request_context::request_context_middleware));

        app = app.layer(TraceLayer::new_for_http());

        let api_key = config.auth.api_key.clone();
        let public_paths = config.auth.public_paths.clone();
        app = app.layer(axum::middleware::from_fn(move |req, next| {
            let api_key = api_key.clone();
            let public_paths = public_paths.clone();
            async move { auth::auth_middleware(api_key, public_paths, req, next).await }
        }));

        Ok(Self {
            router: app,
            listen_address,
        })
    }

    /// Get the configured listen address
    #[must_use]
    pub const fn listen_address(&self) -> SocketAddr {
        self.listen_address
    }

    /// Consume the server and return the inner router
    ///
    /// Useful for testing when the caller manages the listener
    pub fn into_router(self) -> Router {
        self.router
    }

    /// Start serving requests
    ///
    /// Blocks until the cancellation token is triggered.
    ///
    /// # Errors
    ///
    /// Returns an error if binding the TCP listener or serving fails
    pub async fn serve(self, shutdown: tokio_util::sync::CancellationToken) -> anyhow::Result<()> {
        let listener = tokio::net::TcpListener::bind(self.listen_address).await?;
        let local_addr = listener.local_addr()?;
        tracing::info!(%local_addr, "server listening");

        axum::serve(listener, self.router)
            .with_graceful_shutdown(async move {
                shutdown.cancelled().await;
                tracing::info!("graceful shutdown initiated");
            })
            .await?;

        Ok(())
    }
}

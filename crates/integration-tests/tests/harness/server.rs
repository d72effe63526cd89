//! Test server wrapper that starts Keel on a random port

use std::net::SocketAddr;
use std::sync::Arc;

use keel_config::Config;
use keel_llm::{Backend, StrategyRegistry};
use keel_server::Server;
use tokio_util::sync::CancellationToken;

use super::API_KEY;

/// A running test server instance
pub struct TestServer {
    addr: SocketAddr,
    shutdown: CancellationToken,
    client: reqwest::Client,
}

impl TestServer {
    /// Start a test server over `backend` with no optimisation strategies
    pub async fn start(config: Config, backend: Arc<dyn Backend>) -> anyhow::Result<Self> {
        Self::start_with_strategies(config, backend, StrategyRegistry::new()).await
    }

    /// Start a test server with the given configuration and strategies
    ///
    /// Binds to port 0 for automatic port assignment
    pub async fn start_with_strategies(
        config: Config,
        backend: Arc<dyn Backend>,
        registry: StrategyRegistry,
    ) -> anyhow::Result<Self> {
        let server = Server::with_backend(config, backend, registry)?;
        let shutdown = CancellationToken::new();
        let shutdown_clone = shutdown.clone();

        // Bind the listener here so we know the actual port
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;

        tokio::spawn(async move {
            axum::serve(listener, server.into_router())
                .with_graceful_shutdown(async move {
                    shutdown_clone.cancelled().await;
                })
                .await
                .ok();
        });

        let client = reqwest::Client::new();

        Ok(Self { addr, shutdown, client })
    }

    /// Base URL of the running test server
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{path}", self.addr)
    }

    /// Get a reference to the HTTP client
    pub fn client(&self) -> &reqwest::Client {
        &self.client
    }

    /// POST a chat completion body with the test API key
    pub async fn chat(&self, body: &serde_json::Value) -> reqwest::Response {
        self.client
            .post(self.url("/api/v1/chat/completions"))
            .bearer_auth(API_KEY)
            .json(body)
            .send()
            .await
            .expect("request should reach the test server")
    }

    /// Server address
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

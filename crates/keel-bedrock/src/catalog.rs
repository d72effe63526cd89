//! Background refresh of the invocable model set

use std::collections::BTreeSet;
use std::sync::{Arc, Weak};
use std::time::Duration;

use aws_sdk_bedrock::Client as ControlClient;
use aws_sdk_bedrock::error::DisplayErrorContext;
use keel_llm::LlmError;
use tokio::sync::RwLock;

/// Model and inference-profile ids the account can invoke
///
/// Written by the refresh task, read by every request. Until the first
/// successful refresh, lookups fail instead of answering `false`.
#[derive(Debug, Default)]
pub struct ModelCatalog {
    models: RwLock<Option<BTreeSet<String>>>,
}

impl ModelCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether `model` is invocable
    ///
    /// # Errors
    ///
    /// [`LlmError::Upstream`] when the catalog has never been loaded
    pub async fn contains(&self, model: &str) -> Result<bool, LlmError> {
        match &*self.models.read().await {
            Some(models) => Ok(models.contains(model)),
            None => Err(LlmError::Upstream("bedrock model catalog is not loaded".to_owned())),
        }
    }

    /// Known ids, sorted; empty before the first load
    pub async fn models(&self) -> Vec<String> {
        self.models
            .read()
            .await
            .as_ref()
            .map(|models| models.iter().cloned().collect())
            .unwrap_or_default()
    }

    pub async fn len(&self) -> usize {
        self.models.read().await.as_ref().map_or(0, BTreeSet::len)
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Swap in a freshly fetched set
    pub async fn replace(&self, models: impl IntoIterator<Item = String>) {
        let models: BTreeSet<String> = models.into_iter().collect();
        *self.models.write().await = Some(models);
    }

    /// Fetch from Bedrock and replace; failures keep the previous set
    pub async fn refresh(&self, client: &ControlClient) {
        match fetch_models(client).await {
            Ok(models) => {
                tracing::debug!(count = models.len(), "refreshed bedrock model catalog");
                self.replace(models).await;
            }
            Err(e) => tracing::warn!(error = %e, "failed to refresh bedrock model catalog"),
        }
    }

    /// Refresh every `interval` until the catalog is dropped
    pub fn spawn_refresh(catalog: &Arc<Self>, client: ControlClient, interval: Duration) {
        let catalog: Weak<Self> = Arc::downgrade(catalog);

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            // The first tick fires immediately and the caller already loaded once
            ticker.tick().await;

            loop {
                ticker.tick().await;

                let Some(catalog) = catalog.upgrade() else {
                    break;
                };
                catalog.refresh(&client).await;
            }
        });
    }
}

/// Foundation models plus cross-region inference profiles
async fn fetch_models(client: &ControlClient) -> anyhow::Result<Vec<String>> {
    let foundation = client
        .list_foundation_models()
        .send()
        .await
        .map_err(|e| anyhow::anyhow!("list foundation models failed: {}", DisplayErrorContext(&e)))?;

    let mut models: Vec<String> = foundation
        .model_summaries()
        .iter()
        .map(|m| m.model_id().to_owned())
        .collect();

    // Profiles are optional; regions without them still serve foundation models
    match collect_pages(|next_token| fetch_profile_page(client, next_token)).await {
        Ok(profiles) => models.extend(profiles),
        Err(e) => tracing::debug!(error = %e, "skipping inference profiles"),
    }

    Ok(models)
}

/// One page of ids and the token for the next, if any
#[derive(Debug, Default)]
struct Page {
    ids: Vec<String>,
    next_token: Option<String>,
}

async fn fetch_profile_page(client: &ControlClient, next_token: Option<String>) -> anyhow::Result<Page> {
    let output = client
        .list_inference_profiles()
        .set_next_token(next_token)
        .send()
        .await
        .map_err(|e| anyhow::anyhow!("list inference profiles failed: {}", DisplayErrorContext(&e)))?;

    Ok(Page {
        ids: output
            .inference_profile_summaries()
            .iter()
            .map(|p| p.inference_profile_id().to_owned())
            .collect(),
        next_token: output.next_token().map(str::to_owned),
    })
}

/// Follow `next_token` until a page comes back without one
async fn collect_pages<F, Fut>(mut fetch: F) -> anyhow::Result<Vec<String>>
where
    F: FnMut(Option<String>) -> Fut,
    Fut: Future<Output = anyhow::Result<Page>>,
{
    let mut ids = Vec::new();
    let mut next_token = None;

    loop {
        let page = fetch(next_token.take()).await?;
        ids.extend(page.ids);

        match page.next_token {
            Some(token) if !token.is_empty() => next_token = Some(token),
            _ => return Ok(ids),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::future::ready;

    use super::*;

    fn page(ids: &[&str], next_token: Option<&str>) -> Page {
        Page {
            ids: ids.iter().map(|id| (*id).to_owned()).collect(),
            next_token: next_token.map(str::to_owned),
        }
    }

    #[tokio::test]
    async fn every_profile_page_is_collected() {
        let mut requested = Vec::new();

        let ids = collect_pages(|token| {
            requested.push(token.clone());
            ready(Ok(match token.as_deref() {
                None => page(&["us.anthropic.claude-a"], Some("p2")),
                Some("p2") => page(&["us.anthropic.claude-b"], Some("p3")),
                _ => page(&["eu.anthropic.claude-c"], None),
            }))
        })
        .await
        .unwrap();

        assert_eq!(ids, ["us.anthropic.claude-a", "us.anthropic.claude-b", "eu.anthropic.claude-c"]);
        assert_eq!(requested, [None, Some("p2".to_owned()), Some("p3".to_owned())]);
    }

    #[tokio::test]
    async fn empty_next_token_ends_pagination() {
        let mut calls = 0;

        let ids = collect_pages(|_| {
            calls += 1;
            ready(Ok(page(&["a"], Some(""))))
        })
        .await
        .unwrap();

        assert_eq!(ids, ["a"]);
        assert_eq!(calls, 1);
    }

    #[tokio::test]
    async fn failing_later_page_fails_the_collection() {
        let result = collect_pages(|token| {
            ready(match token {
                None => Ok(page(&["a"], Some("p2"))),
                Some(_) => Err(anyhow::anyhow!("throttled")),
            })
        })
        .await;

        assert!(result.is_err());
    }

    #[tokio::test]
    async fn unloaded_catalog_reports_an_error() {
        let catalog = ModelCatalog::new();

        assert!(catalog.contains("anthropic.claude-x").await.is_err());
        assert!(catalog.models().await.is_empty());
    }

    #[tokio::test]
    async fn replace_swaps_the_whole_set() {
        let catalog = ModelCatalog::new();

        catalog
            .replace(["b-model".to_owned(), "a-model".to_owned()])
            .await;
        assert!(catalog.contains("a-model").await.unwrap());
        assert_eq!(catalog.models().await, ["a-model", "b-model"]);

        catalog.replace(["c-model".to_owned()]).await;
        assert!(!catalog.contains("a-model").await.unwrap());
        assert_eq!(catalog.len().await, 1);
    }

    #[tokio::test]
    async fn empty_load_still_counts_as_loaded() {
        let catalog = ModelCatalog::new();
        catalog.replace(Vec::new()).await;

        assert!(!catalog.contains("anything").await.unwrap());
        assert!(catalog.is_empty().await);
    }
}

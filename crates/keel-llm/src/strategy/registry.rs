use std::collections::BTreeMap;
use std::sync::Arc;

use tokio::runtime::Handle;

use super::{DirectStrategy, Strategy};
use crate::backend::Backend;

/// Name to strategy mapping, fixed once the gateway starts
///
/// Built mutably at startup, then shared read-only behind an `Arc`.
#[derive(Default)]
pub struct StrategyRegistry {
    strategies: BTreeMap<String, Arc<dyn Strategy>>,
}

impl StrategyRegistry {
    /// An empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding the strategies that ship with Keel
    ///
    /// `runtime` is the handle strategies use to drive async backend
    /// calls from the blocking pool.
    pub fn builtin(backend: Arc<dyn Backend>, runtime: Handle) -> Self {
        let mut registry = Self::new();
        registry.register(DirectStrategy::new(backend, runtime));
        registry
    }

    /// Add a strategy under its own name, replacing any previous entry
    pub fn register(&mut self, strategy: impl Strategy + 'static) -> &mut Self {
        let name = strategy.name().to_owned();

        if self.strategies.insert(name.clone(), Arc::new(strategy)).is_some() {
            tracing::warn!(strategy = %name, "replacing previously registered optimisation strategy");
        }

        self
    }

    /// Look up a strategy by name
    pub fn lookup(&self, name: &str) -> Option<Arc<dyn Strategy>> {
        self.strategies.get(name).cloned()
    }

    /// Whether `name` is registered
    pub fn contains(&self, name: &str) -> bool {
        self.strategies.contains_key(name)
    }

    /// Registered names, sorted
    pub fn names(&self) -> Vec<&str> {
        self.strategies.keys().map(String::as_str).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.strategies.is_empty()
    }
}

impl std::fmt::Debug for StrategyRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StrategyRegistry")
            .field("strategies", &self.names())
            .finish()
    }
}

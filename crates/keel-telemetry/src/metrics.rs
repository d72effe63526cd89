//! Gateway metric instruments
//!
//! Instruments are created from the global meter, so they are no-ops until
//! [`crate::init`] installs an exporting meter provider.

use std::time::Instant;

use opentelemetry::KeyValue;
use opentelemetry::global;
use opentelemetry::metrics::{Counter, Histogram};

pub const GATEWAY_REQUEST_COUNT: &str = "gateway.request.count";
pub const GATEWAY_REQUEST_DURATION: &str = "gateway.request.duration";
pub const GATEWAY_MODEL_FALLBACK: &str = "gateway.model.fallback";
pub const GATEWAY_STRATEGY_DURATION: &str = "gateway.strategy.duration";

/// Which control-flow branch served a request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Branch {
    /// Optimisation enabled
    Optimised,
    /// Optimisation disabled
    Direct,
}

impl Branch {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Optimised => "optimised",
            Self::Direct => "direct",
        }
    }
}

/// Why the resolver replaced a model
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Substitution {
    /// Blank or foreign model replaced by the default
    Default,
    /// Failed validation replaced by the fallback
    Fallback,
}

impl Substitution {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Default => "default",
            Self::Fallback => "fallback",
        }
    }
}

/// Counters and histograms recorded by the completion gateway
#[derive(Clone)]
pub struct GatewayMetrics {
    requests: Counter<u64>,
    request_duration: Histogram<f64>,
    fallbacks: Counter<u64>,
    strategy_duration: Histogram<f64>,
}

impl GatewayMetrics {
    pub fn new() -> Self {
        let meter = global::meter("keel");

        Self {
            requests: meter
                .u64_counter(GATEWAY_REQUEST_COUNT)
                .with_description("Chat completion requests handled")
                .build(),
            request_duration: meter
                .f64_histogram(GATEWAY_REQUEST_DURATION)
                .with_unit("s")
                .with_description("Time until the response or stream handle is ready")
                .build(),
            fallbacks: meter
                .u64_counter(GATEWAY_MODEL_FALLBACK)
                .with_description("Model substitutions made by the resolver")
                .build(),
            strategy_duration: meter
                .f64_histogram(GATEWAY_STRATEGY_DURATION)
                .with_unit("s")
                .with_description("Time spent inside optimisation strategies")
                .build(),
        }
    }

    /// Record the outcome of one request
    pub fn record_request(&self, branch: Branch, outcome: &str, stream: bool, start: Instant) {
        let attributes = [
            KeyValue::new("branch", branch.as_str()),
            KeyValue::new("outcome", outcome.to_owned()),
            KeyValue::new("stream", stream),
        ];

        self.requests.add(1, &attributes);
        record_duration(&self.request_duration, start, &attributes);
    }

    /// Count a model substitution
    pub fn record_substitution(&self, kind: Substitution) {
        self.fallbacks.add(1, &[KeyValue::new("kind", kind.as_str())]);
    }

    /// Record how long a strategy ran and whether it succeeded
    pub fn record_strategy(&self, strategy: &str, success: bool, start: Instant) {
        let attributes = [
            KeyValue::new("strategy", strategy.to_owned()),
            KeyValue::new("success", success),
        ];

        record_duration(&self.strategy_duration, start, &attributes);
    }
}

impl Default for GatewayMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for GatewayMetrics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GatewayMetrics").finish_non_exhaustive()
    }
}

/// Record a duration measurement on a histogram
pub fn record_duration(histogram: &Histogram<f64>, start: Instant, attributes: &[KeyValue]) {
    histogram.record(start.elapsed().as_secs_f64(), attributes);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn instruments_are_noops_without_a_provider() {
        let metrics = GatewayMetrics::new();
        let start = Instant::now();

        metrics.record_request(Branch::Direct, "success", false, start);
        metrics.record_substitution(Substitution::Fallback);
        metrics.record_strategy("direct", true, start);
    }

    #[test]
    fn attribute_values_are_stable() {
        assert_eq!(Branch::Optimised.as_str(), "optimised");
        assert_eq!(Branch::Direct.as_str(), "direct");
        assert_eq!(Substitution::Default.as_str(), "default");
        assert_eq!(Substitution::Fallback.as_str(), "fallback");
    }
}

use crate::{Error, Result};
use prometheus_client::encoding::text::encode;
use prometheus_client::encoding::EncodeLabelSet;
use prometheus_client::metrics::counter::Counter;
use prometheus_client::metrics::family::Family;
use prometheus_client::registry::Registry;

pub struct Metrics {
    requests: Family<Label, Counter>,
    upstream_calls: Counter,
    rate_limited: Counter,
    batch_legs: Counter,
    registry: Registry,
}

#[derive(Debug, Clone, Hash, PartialEq, Eq, EncodeLabelSet)]
struct Label {
    kind: String,
}

#[derive(Debug, Clone, Copy)]
pub enum RequestKind {
    Passthrough,
    Batched,
    Failed,
}

impl RequestKind {
    fn as_str(self) -> &'static str {
        match self {
            Self::Passthrough => "passthrough",
            Self::Batched => "batched",
            Self::Failed => "failed",
        }
    }
}

impl Metrics {
    pub fn new() -> Self {
        let requests = Family::<Label, Counter>::default();
        let upstream_calls = Counter::default();
        let rate_limited = Counter::default();
        let batch_legs = Counter::default();
        let mut registry = <Registry>::default();

        registry.register(
            "rpc_proxy_requests",
            "Client requests handled, by how they were served",
            requests.clone(),
        );
        registry.register(
            "rpc_proxy_upstream_calls",
            "Requests sent to the upstream rpc",
            upstream_calls.clone(),
        );
        registry.register(
            "rpc_proxy_rate_limited",
            "Upstream calls that had to wait for the rate limiter",
            rate_limited.clone(),
        );
        registry.register(
            "rpc_proxy_batch_legs",
            "eth_getLogs sub-range requests sent to the upstream rpc",
            batch_legs.clone(),
        );

        Self {
            requests,
            upstream_calls,
            rate_limited,
            batch_legs,
            registry,
        }
    }

    pub fn record_request(&self, kind: RequestKind) {
        self.requests
            .get_or_create(&Label {
                kind: kind.as_str().to_owned(),
            })
            .inc();
    }

    pub fn record_upstream_call(&self) {
        self.upstream_calls.inc();
    }

    pub fn record_rate_limited(&self) {
        self.rate_limited.inc();
    }

    pub fn record_batch_leg(&self) {
        self.batch_legs.inc();
    }

    pub fn encode(&self) -> Result<String> {
        let mut buf = String::new();

        encode(&mut buf, &self.registry).map_err(Error::EncodeMetrics)?;

        Ok(buf)
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

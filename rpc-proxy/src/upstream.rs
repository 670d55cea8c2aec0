use crate::limiter::RateLimiter;
use crate::metrics::Metrics;
use crate::{Error, Result};
use eth_rpc_proxy_core::rpc_client::Upstream;
use eth_rpc_proxy_core::types::{RpcRequest, RpcResponse};
use serde_json::value::RawValue;
use std::sync::Arc;

/// Upstream rpc that takes a rate limiter token before every call.
pub struct LimitedUpstream<U> {
    upstream: U,
    limiter: Arc<RateLimiter>,
    metrics: Arc<Metrics>,
}

impl<U: Upstream> LimitedUpstream<U> {
    pub fn new(upstream: U, limiter: Arc<RateLimiter>, metrics: Arc<Metrics>) -> Self {
        Self {
            upstream,
            limiter,
            metrics,
        }
    }

    pub async fn send(&self, req: &RpcRequest) -> Result<RpcResponse> {
        self.limiter.acquire().await;
        self.metrics.record_upstream_call();

        self.upstream.send(req).await.map_err(Error::Upstream)
    }

    pub async fn send_raw(&self, payload: &RawValue) -> Result<Box<RawValue>> {
        self.limiter.acquire().await;
        self.metrics.record_upstream_call();

        self.upstream.send_raw(payload).await.map_err(Error::Upstream)
    }

    pub fn metrics(&self) -> &Metrics {
        &self.metrics
    }
}

#[cfg(test)]
impl<U> LimitedUpstream<U> {
    pub fn inner(&self) -> &U {
        &self.upstream
    }
}

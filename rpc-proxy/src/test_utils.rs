use crate::classifier::filter_bounds;
use crate::config::RateLimitConfig;
use crate::limiter::RateLimiter;
use crate::metrics::Metrics;
use crate::upstream::LimitedUpstream;
use async_trait::async_trait;
use eth_rpc_proxy_core::eth_request::{block_number_to_hex, parse_block_number};
use eth_rpc_proxy_core::rpc_client::Upstream;
use eth_rpc_proxy_core::types::{Reply, RpcError, RpcRequest, RpcResponse};
use serde_json::value::RawValue;
use serde_json::{json, Value as JsonValue};
use std::sync::{Arc, Mutex};

/// In memory node with one log every `log_every` blocks up to `latest`.
pub struct MockUpstream {
    latest: u64,
    log_every: u64,
    fail_leg_from: Option<u64>,
    transport_failure: bool,
    block_number_response: Option<RpcResponse>,
    requests: Mutex<Vec<RpcRequest>>,
    payloads: Mutex<Vec<String>>,
}

impl MockUpstream {
    pub fn new(latest: u64) -> Self {
        Self {
            latest,
            log_every: 1000,
            fail_leg_from: None,
            transport_failure: false,
            block_number_response: None,
            requests: Mutex::new(Vec::new()),
            payloads: Mutex::new(Vec::new()),
        }
    }

    pub fn failing_leg(mut self, from: u64) -> Self {
        self.fail_leg_from = Some(from);
        self
    }

    pub fn failing_transport(mut self) -> Self {
        self.transport_failure = true;
        self
    }

    pub fn with_block_number_response(mut self, resp: RpcResponse) -> Self {
        self.block_number_response = Some(resp);
        self
    }

    pub fn requests(&self) -> Vec<RpcRequest> {
        self.requests.lock().unwrap().clone()
    }

    /// Payloads exactly as they were received.
    pub fn payloads(&self) -> Vec<String> {
        self.payloads.lock().unwrap().clone()
    }

    fn get_logs(&self, req: &RpcRequest) -> RpcResponse {
        let (from, to) = filter_bounds(req).unwrap();
        let from = parse_block_number(from).unwrap();
        let to = if to == "latest" {
            self.latest
        } else {
            parse_block_number(to).unwrap()
        };

        if self.fail_leg_from == Some(from) {
            return RpcResponse::error(
                req.jsonrpc.clone(),
                req.id.clone(),
                RpcError {
                    code: -32005,
                    message: "query returned more than 10000 results".into(),
                    data: None,
                },
            );
        }

        RpcResponse::result(
            req.jsonrpc.clone(),
            req.id.clone(),
            oracle_logs(from, to, self.log_every),
        )
    }
}

#[async_trait]
impl Upstream for MockUpstream {
    async fn send_raw(&self, payload: &RawValue) -> eth_rpc_proxy_core::Result<Box<RawValue>> {
        let req: RpcRequest = serde_json::from_str(payload.get()).unwrap();
        self.payloads.lock().unwrap().push(payload.get().to_owned());
        self.requests.lock().unwrap().push(req.clone());

        if self.transport_failure {
            return Err(eth_rpc_proxy_core::Error::RpcResponseStatus(
                503,
                Some("service unavailable".into()),
            ));
        }

        let resp = match req.method.as_str() {
            "eth_blockNumber" => match &self.block_number_response {
                Some(resp) => resp.clone(),
                None => RpcResponse::result(
                    req.jsonrpc.clone(),
                    req.id.clone(),
                    json!(block_number_to_hex(self.latest)),
                ),
            },
            "eth_getLogs" => self.get_logs(&req),
            method => RpcResponse::result(
                req.jsonrpc.clone(),
                req.id.clone(),
                json!(format!("{}-result", method)),
            ),
        };

        Ok(raw(&resp))
    }
}

/// Logs of `[from, to]` in ascending block order.
pub fn oracle_logs(from: u64, to: u64, log_every: u64) -> JsonValue {
    let first = (from + log_every - 1) / log_every * log_every;

    let logs = (first..=to)
        .step_by(log_every as usize)
        .map(|block| {
            json!({
                "blockNumber": block_number_to_hex(block),
                "logIndex": "0x0",
            })
        })
        .collect();

    JsonValue::Array(logs)
}

pub fn raw<T: serde::Serialize>(value: &T) -> Box<RawValue> {
    serde_json::value::to_raw_value(value).unwrap()
}

pub fn response(reply: Reply) -> RpcResponse {
    match reply {
        Reply::Built(resp) => resp,
        Reply::Forwarded(raw) => serde_json::from_str(raw.get()).unwrap(),
    }
}

pub fn limited(upstream: MockUpstream) -> LimitedUpstream<MockUpstream> {
    let metrics = Arc::new(Metrics::new());
    let limiter = RateLimiter::new(RateLimitConfig::default(), metrics.clone()).unwrap();

    LimitedUpstream::new(upstream, Arc::new(limiter), metrics)
}

use async_trait::async_trait;
use eth_rpc_proxy::{Handler, Metrics, RateLimitConfig, RateLimiter};
use eth_rpc_proxy_core::rpc_client::Upstream;
use eth_rpc_proxy_core::types::{ClientRequest, Reply, RpcError, RpcRequest, RpcResponse};
use serde_json::value::RawValue;
use serde_json::{json, Value as JsonValue};
use std::num::NonZeroU64;
use std::sync::{Arc, Mutex};

type Respond = dyn Fn(&RpcRequest) -> eth_rpc_proxy_core::Result<RpcResponse> + Send + Sync;

/// Upstream that records every request and answers with `respond`.
pub struct MockUpstream {
    respond: Box<Respond>,
    requests: Arc<Mutex<Vec<RpcRequest>>>,
    payloads: Arc<Mutex<Vec<String>>>,
}

impl MockUpstream {
    pub fn new<F>(respond: F) -> (Self, Arc<Mutex<Vec<RpcRequest>>>)
    where
        F: Fn(&RpcRequest) -> eth_rpc_proxy_core::Result<RpcResponse> + Send + Sync + 'static,
    {
        let requests = Arc::new(Mutex::new(Vec::new()));
        let upstream = Self {
            respond: Box::new(respond),
            requests: requests.clone(),
            payloads: Arc::new(Mutex::new(Vec::new())),
        };

        (upstream, requests)
    }

    /// Payloads exactly as they were received.
    pub fn payloads(&self) -> Arc<Mutex<Vec<String>>> {
        self.payloads.clone()
    }
}

#[async_trait]
impl Upstream for MockUpstream {
    async fn send_raw(&self, payload: &RawValue) -> eth_rpc_proxy_core::Result<Box<RawValue>> {
        let req: RpcRequest = serde_json::from_str(payload.get()).unwrap();
        self.payloads.lock().unwrap().push(payload.get().to_owned());
        self.requests.lock().unwrap().push(req.clone());

        let resp = (self.respond)(&req)?;
        Ok(serde_json::value::to_raw_value(&resp).unwrap())
    }
}

pub fn handler(upstream: MockUpstream, rate_limit: RateLimitConfig) -> Handler<MockUpstream> {
    let metrics = Arc::new(Metrics::new());
    let limiter = RateLimiter::new(rate_limit, metrics.clone()).unwrap();

    Handler::new(
        upstream,
        Arc::new(limiter),
        NonZeroU64::new(10000).unwrap(),
        metrics,
    )
}

pub fn request(body: JsonValue) -> ClientRequest {
    ClientRequest::from_raw(raw(&body)).unwrap()
}

pub fn raw(body: &JsonValue) -> Box<RawValue> {
    serde_json::value::to_raw_value(body).unwrap()
}

pub fn response(reply: Reply) -> RpcResponse {
    match reply {
        Reply::Built(resp) => resp,
        Reply::Forwarded(raw) => serde_json::from_str(raw.get()).unwrap(),
    }
}

pub fn hex(n: u64) -> String {
    format!("0x{:x}", n)
}

pub fn parse_hex(s: &str) -> u64 {
    u64::from_str_radix(s.trim_start_matches("0x"), 16).unwrap()
}

/// A chain at height `latest` with one log in every block divisible by 500.
pub fn chain(
    latest: u64,
) -> impl Fn(&RpcRequest) -> eth_rpc_proxy_core::Result<RpcResponse> + Send + Sync + 'static {
    move |req| {
        let result = match req.method.as_str() {
            "eth_blockNumber" => json!(hex(latest)),
            "eth_getLogs" => {
                let filter = &req.params[0];
                let from = parse_hex(filter["fromBlock"].as_str().unwrap());
                let to = match filter["toBlock"].as_str().unwrap() {
                    "latest" => latest,
                    to => parse_hex(to),
                };
                logs(from, to)
            }
            _ => JsonValue::Null,
        };

        Ok(RpcResponse::result(req.jsonrpc.clone(), req.id.clone(), result))
    }
}

pub fn logs(from: u64, to: u64) -> JsonValue {
    let logs = (from..=to)
        .filter(|block| block % 500 == 0)
        .map(|block| json!({ "blockNumber": hex(block), "transactionIndex": "0x0" }))
        .collect();

    JsonValue::Array(logs)
}

pub fn rpc_error(req: &RpcRequest, code: i64, message: &str) -> RpcResponse {
    RpcResponse::error(
        req.jsonrpc.clone(),
        req.id.clone(),
        RpcError {
            code,
            message: message.to_owned(),
            data: None,
        },
    )
}

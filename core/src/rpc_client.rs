use crate::config::RpcClientConfig;
use crate::error::{Error, Result};
use crate::types::{RpcRequest, RpcResponse};
use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use serde_json::value::RawValue;
use std::time::Duration;

/// Sends a single JSON-RPC payload to the upstream node.
///
/// An error envelope returned by the node is a successful call, only transport
/// level failures are reported as `Err`.
#[async_trait]
pub trait Upstream: Send + Sync {
    /// Posts `payload` as is and returns the response body untouched, whatever
    /// its shape.
    async fn send_raw(&self, payload: &RawValue) -> Result<Box<RawValue>>;

    async fn send(&self, req: &RpcRequest) -> Result<RpcResponse> {
        let payload = serde_json::value::to_raw_value(req).map_err(Error::EncodeRpcRequest)?;
        let resp = self.send_raw(&payload).await?;
        serde_json::from_str(resp.get()).map_err(Error::RpcResponseParse)
    }
}

pub struct RpcClient {
    http_client: reqwest::Client,
    rpc_url: url::Url,
}

impl RpcClient {
    pub fn new(cfg: &RpcClientConfig) -> Result<RpcClient> {
        let request_timeout = Duration::from_secs(cfg.request_timeout_secs.get());
        let connect_timeout = Duration::from_millis(cfg.connect_timeout_ms.get());

        let http_client = reqwest::ClientBuilder::new()
            .gzip(true)
            .timeout(request_timeout)
            .connect_timeout(connect_timeout)
            .build()
            .map_err(Error::BuildHttpClient)?;

        Ok(RpcClient {
            http_client,
            rpc_url: cfg.target_rpc.clone(),
        })
    }
}

#[async_trait]
impl Upstream for RpcClient {
    async fn send_raw(&self, payload: &RawValue) -> Result<Box<RawValue>> {
        log::trace!("sending request to {}", self.rpc_url);

        let resp = self
            .http_client
            .post(self.rpc_url.clone())
            .header(CONTENT_TYPE, "application/json")
            .body(payload.get().to_owned())
            .send()
            .await
            .map_err(Error::HttpRequest)?;

        let resp_status = resp.status();
        if !resp_status.is_success() {
            let body = resp.text().await.ok();
            return Err(Error::RpcResponseStatus(resp_status.as_u16(), body));
        }

        let body = resp.bytes().await.map_err(Error::RpcResponseRead)?;

        serde_json::from_slice(&body).map_err(Error::RpcResponseParse)
    }
}

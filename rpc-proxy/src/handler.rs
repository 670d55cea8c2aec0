use crate::batcher;
use crate::classifier::{classify, exceeds_range, with_raw_to_block, Route};
use crate::limiter::RateLimiter;
use crate::metrics::{Metrics, RequestKind};
use crate::resolver::resolve_block;
use crate::splitter::split;
use crate::upstream::LimitedUpstream;
use crate::{Error, Result};
use eth_rpc_proxy_core::eth_request::{block_number_to_hex, parse_block_number};
use eth_rpc_proxy_core::rpc_client::Upstream;
use eth_rpc_proxy_core::types::{ClientRequest, Reply, RpcRequest, RpcResponse, JSONRPC_VERSION};
use serde_json::value::RawValue;
use serde_json::Value as JsonValue;
use std::num::NonZeroU64;
use std::sync::Arc;

pub struct Handler<U> {
    upstream: LimitedUpstream<U>,
    max_block_range: NonZeroU64,
    metrics: Arc<Metrics>,
}

impl<U: Upstream> Handler<U> {
    pub fn new(
        upstream: U,
        limiter: Arc<RateLimiter>,
        max_block_range: NonZeroU64,
        metrics: Arc<Metrics>,
    ) -> Self {
        Self {
            upstream: LimitedUpstream::new(upstream, limiter, metrics.clone()),
            max_block_range,
            metrics,
        }
    }

    /// Handles a single request. Failures are returned as a JSON-RPC error
    /// response with the id of the request.
    pub async fn handle_single(&self, req: ClientRequest) -> Reply {
        match self.route(&req).await {
            Ok(reply) => reply,
            Err(e) => {
                log::debug!("failed to handle {} request:\n{}", req.req.method, e);
                self.metrics.record_request(RequestKind::Failed);

                Reply::Built(RpcResponse::error(
                    req.req.jsonrpc,
                    req.req.id,
                    e.to_rpc_error(),
                ))
            }
        }
    }

    /// Handles every request independently, one failing request doesn't affect
    /// the others. Responses are in the order of the requests.
    pub async fn handle_batch(&self, reqs: Vec<ClientRequest>) -> Vec<Reply> {
        futures::future::join_all(reqs.into_iter().map(|req| self.handle_single(req))).await
    }

    /// Like [`Self::handle_batch`] but takes the raw request body.
    ///
    /// Fails with [`Error::MalformedRequest`] without contacting the upstream if the
    /// body isn't an array. An empty array is malformed too: JSON-RPC 2.0 answers
    /// `[]` with a single invalid request error, not an empty array. Elements that
    /// aren't requests get an invalid request error in their place.
    pub async fn handle_batch_value(&self, body: &RawValue) -> Result<Vec<Reply>> {
        let elems: Vec<Box<RawValue>> = match serde_json::from_str::<Vec<Box<RawValue>>>(body.get()) {
            Ok(elems) if !elems.is_empty() => elems,
            _ => return Err(Error::MalformedRequest),
        };

        let mut reqs = Vec::with_capacity(elems.len());
        let mut replies = Vec::with_capacity(elems.len());
        for elem in elems {
            match serde_json::from_str::<RpcRequest>(elem.get()) {
                Ok(req) => {
                    reqs.push(ClientRequest { raw: elem, req });
                    replies.push(None);
                }
                Err(e) => {
                    let e = Error::InvalidRequestBody(Some(e));
                    let resp = RpcResponse::error(
                        JSONRPC_VERSION.to_owned(),
                        element_id(&elem),
                        e.to_rpc_error(),
                    );
                    replies.push(Some(Reply::Built(resp)));
                }
            }
        }

        let mut handled = self.handle_batch(reqs).await.into_iter();

        Ok(replies
            .into_iter()
            .filter_map(|reply| reply.or_else(|| handled.next()))
            .collect())
    }

    async fn route(&self, req: &ClientRequest) -> Result<Reply> {
        match classify(&req.req, self.max_block_range) {
            Route::Passthrough => self.passthrough(&req.raw).await,
            Route::NeedsBatching {
                from_block,
                to_block,
            } => {
                let from = parse_block_number(&from_block)?;
                let to = resolve_block(&to_block, &self.upstream).await?;

                if !exceeds_range(from, to, self.max_block_range) {
                    let payload = with_raw_to_block(&req.raw, block_number_to_hex(to))
                        .map_err(Error::EncodeRequest)?;
                    return self.passthrough(&payload).await;
                }

                let plan = split(from, to, self.max_block_range);
                log::info!(
                    "splitting eth_getLogs for blocks {}-{} into {} requests",
                    from,
                    to,
                    plan.len()
                );
                self.metrics.record_request(RequestKind::Batched);

                batcher::execute(&req.req, &plan, &self.upstream)
                    .await
                    .map(Reply::Built)
            }
        }
    }

    async fn passthrough(&self, payload: &RawValue) -> Result<Reply> {
        self.metrics.record_request(RequestKind::Passthrough);

        self.upstream.send_raw(payload).await.map(Reply::Forwarded)
    }
}

fn element_id(elem: &RawValue) -> JsonValue {
    serde_json::from_str::<JsonValue>(elem.get())
        .ok()
        .and_then(|elem| elem.get("id").cloned())
        .unwrap_or(JsonValue::Null)
}

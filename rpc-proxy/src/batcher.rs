use crate::classifier::with_bounds;
use crate::splitter::BlockRange;
use crate::upstream::LimitedUpstream;
use crate::{Error, Result};
use eth_rpc_proxy_core::eth_request::block_number_to_hex;
use eth_rpc_proxy_core::rpc_client::Upstream;
use eth_rpc_proxy_core::types::{RpcRequest, RpcResponse};
use serde_json::Value as JsonValue;
use std::time::Instant;

/// Runs `req` once per range of `plan`, in order, and concatenates the logs.
///
/// The first failing range fails the whole request. Logs already fetched for
/// earlier ranges are dropped, the client never gets a partial result.
pub async fn execute<U: Upstream>(
    req: &RpcRequest,
    plan: &[BlockRange],
    upstream: &LimitedUpstream<U>,
) -> Result<RpcResponse> {
    let start_time = Instant::now();
    let mut logs = Vec::new();

    for (i, range) in plan.iter().enumerate() {
        let mut leg = with_bounds(
            req,
            block_number_to_hex(range.from),
            block_number_to_hex(range.to),
        );
        leg.id = JsonValue::from(i + 1);

        log::debug!(
            "fetching logs for blocks {}-{} ({}/{})",
            range.from,
            range.to,
            i + 1,
            plan.len()
        );

        let leg_logs = fetch_leg(&leg, upstream)
            .await
            .map_err(|e| Error::BatchLeg {
                range: *range,
                source: Box::new(e),
            })?;
        logs.extend(leg_logs);
    }

    if let (Some(first), Some(last)) = (plan.first(), plan.last()) {
        log::info!(
            "fetched {} logs for blocks {}-{} in {} requests, took {}ms",
            logs.len(),
            first.from,
            last.to,
            plan.len(),
            start_time.elapsed().as_millis()
        );
    }

    Ok(RpcResponse::result(
        req.jsonrpc.clone(),
        req.id.clone(),
        JsonValue::Array(logs),
    ))
}

async fn fetch_leg<U: Upstream>(
    leg: &RpcRequest,
    upstream: &LimitedUpstream<U>,
) -> Result<Vec<JsonValue>> {
    upstream.metrics().record_batch_leg();
    let resp = upstream.send(leg).await?;

    if let Some(error) = resp.error {
        return Err(Error::UpstreamRpc {
            method: leg.method.clone(),
            error,
        });
    }

    match resp.result {
        None | Some(JsonValue::Null) => Ok(Vec::new()),
        Some(JsonValue::Array(logs)) => Ok(logs),
        Some(result) => Err(Error::UnexpectedResult {
            method: leg.method.clone(),
            result,
        }),
    }
}

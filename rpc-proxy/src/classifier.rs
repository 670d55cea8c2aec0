use eth_rpc_proxy_core::eth_request::{parse_block_number, ETH_GET_LOGS_METHOD};
use eth_rpc_proxy_core::types::RpcRequest;
use serde_json::value::RawValue;
use serde_json::Value as JsonValue;
use std::num::NonZeroU64;

pub const LATEST_BLOCK_TAG: &str = "latest";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    Passthrough,
    NeedsBatching { from_block: String, to_block: String },
}

pub fn classify(req: &RpcRequest, max_range: NonZeroU64) -> Route {
    let (from_block, to_block) = match filter_bounds(req) {
        Some(bounds) => bounds,
        None => return Route::Passthrough,
    };

    let needs_batching = to_block == LATEST_BLOCK_TAG
        || match (parse_block_number(from_block), parse_block_number(to_block)) {
            (Ok(from), Ok(to)) => exceeds_range(from, to, max_range),
            _ => false,
        };

    if needs_batching {
        Route::NeedsBatching {
            from_block: from_block.to_owned(),
            to_block: to_block.to_owned(),
        }
    } else {
        Route::Passthrough
    }
}

pub fn exceeds_range(from: u64, to: u64, max_range: NonZeroU64) -> bool {
    to.saturating_sub(from) > max_range.get()
}

/// Returns `fromBlock` and `toBlock` of an `eth_getLogs` filter if both are strings.
pub fn filter_bounds(req: &RpcRequest) -> Option<(&str, &str)> {
    if req.method != ETH_GET_LOGS_METHOD {
        return None;
    }

    let filter = req.params.as_array()?.first()?.as_object()?;
    let from_block = filter.get("fromBlock").and_then(JsonValue::as_str)?;
    let to_block = filter.get("toBlock").and_then(JsonValue::as_str)?;

    Some((from_block, to_block))
}

/// Returns a copy of `req` with the filter's block bounds replaced.
///
/// Other params and filter fields are left untouched. `req` must have a filter,
/// see [`filter_bounds`].
pub fn with_bounds(req: &RpcRequest, from_block: String, to_block: String) -> RpcRequest {
    let mut req = req.clone();

    set_bound(&mut req.params, "fromBlock", from_block);
    set_bound(&mut req.params, "toBlock", to_block);

    req
}

/// Replaces `toBlock` in a raw client payload, every other member is kept.
pub fn with_raw_to_block(raw: &RawValue, to_block: String) -> serde_json::Result<Box<RawValue>> {
    let mut payload: JsonValue = serde_json::from_str(raw.get())?;

    if let Some(params) = payload.get_mut("params") {
        set_bound(params, "toBlock", to_block);
    }

    serde_json::value::to_raw_value(&payload)
}

fn set_bound(params: &mut JsonValue, key: &str, block: String) {
    if let Some(filter) = params
        .as_array_mut()
        .and_then(|params| params.first_mut())
        .and_then(JsonValue::as_object_mut)
    {
        filter.insert(key.to_owned(), JsonValue::String(block));
    }
}

use crate::error::{Error, Result};
use crate::types::{RpcRequest, JSONRPC_VERSION};
use serde_json::Value as JsonValue;

pub const ETH_GET_LOGS_METHOD: &str = "eth_getLogs";
pub const ETH_BLOCK_NUMBER_METHOD: &str = "eth_blockNumber";

/// A request the proxy builds itself rather than forwarding from a client.
pub trait EthRequest {
    fn to_request(&self, id: usize) -> RpcRequest;
}

#[derive(Debug, Clone, Copy)]
pub struct GetBlockNumber {}

impl EthRequest for GetBlockNumber {
    fn to_request(&self, id: usize) -> RpcRequest {
        RpcRequest {
            jsonrpc: JSONRPC_VERSION.to_owned(),
            id: JsonValue::from(id),
            method: ETH_BLOCK_NUMBER_METHOD.to_owned(),
            params: JsonValue::Array(Vec::new()),
        }
    }
}

pub fn block_number_to_hex(block_number: u64) -> String {
    format!("0x{:x}", block_number)
}

/// Parses a `0x` prefixed hex quantity. Both the prefix and the digits are case-insensitive.
pub fn parse_block_number(hex: &str) -> Result<u64> {
    let digits = hex
        .strip_prefix("0x")
        .or_else(|| hex.strip_prefix("0X"))
        .ok_or_else(|| Error::InvalidBlockNumber(hex.to_owned()))?;

    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_hexdigit()) {
        return Err(Error::InvalidBlockNumber(hex.to_owned()));
    }

    u64::from_str_radix(digits, 16).map_err(|_| Error::InvalidBlockNumber(hex.to_owned()))
}

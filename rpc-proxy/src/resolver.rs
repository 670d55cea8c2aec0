use crate::classifier::LATEST_BLOCK_TAG;
use crate::upstream::LimitedUpstream;
use crate::{Error, Result};
use eth_rpc_proxy_core::eth_request::{parse_block_number, EthRequest, GetBlockNumber};
use eth_rpc_proxy_core::rpc_client::Upstream;

/// Turns a `toBlock` value into a block number, asking the upstream for the
/// chain head if it is `"latest"`.
pub async fn resolve_block<U: Upstream>(block: &str, upstream: &LimitedUpstream<U>) -> Result<u64> {
    if block == LATEST_BLOCK_TAG {
        latest_block(upstream).await
    } else {
        Ok(parse_block_number(block)?)
    }
}

async fn latest_block<U: Upstream>(upstream: &LimitedUpstream<U>) -> Result<u64> {
    let req = GetBlockNumber {}.to_request(1);
    let resp = upstream.send(&req).await?;

    if let Some(error) = resp.error {
        return Err(Error::UpstreamRpc {
            method: req.method,
            error,
        });
    }

    let result = resp
        .result
        .ok_or_else(|| Error::MissingResult(req.method.clone()))?;

    match result.as_str().map(parse_block_number) {
        Some(Ok(block_number)) => {
            log::debug!("resolved latest block to {}", block_number);
            Ok(block_number)
        }
        _ => Err(Error::UnexpectedResult {
            method: req.method,
            result,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{limited, MockUpstream};
    use eth_rpc_proxy_core::types::{RpcError, RpcResponse};
    use serde_json::json;

    #[tokio::test]
    async fn test_resolve_hex() {
        let upstream = limited(MockUpstream::new(12345));

        assert_eq!(resolve_block("0x2710", &upstream).await.unwrap(), 10000);
        assert!(matches!(
            resolve_block("pending", &upstream).await,
            Err(Error::InvalidBlockNumber(s)) if s == "pending"
        ));
        assert!(upstream_requests(&upstream).is_empty());
    }

    #[tokio::test]
    async fn test_resolve_latest() {
        let upstream = limited(MockUpstream::new(12345));

        assert_eq!(resolve_block("latest", &upstream).await.unwrap(), 12345);

        let reqs = upstream_requests(&upstream);
        assert_eq!(reqs.len(), 1);
        assert_eq!(reqs[0].method, "eth_blockNumber");
    }

    #[tokio::test]
    async fn test_resolve_latest_failures() {
        let cases = [
            (
                RpcResponse::error("2.0".into(), json!(1), RpcError {
                    code: -32005,
                    message: "limit exceeded".into(),
                    data: None,
                }),
                "UpstreamRpc",
            ),
            (
                RpcResponse {
                    jsonrpc: "2.0".into(),
                    id: json!(1),
                    result: None,
                    error: None,
                },
                "MissingResult",
            ),
            (
                RpcResponse::result("2.0".into(), json!(1), json!(12345)),
                "UnexpectedResult",
            ),
        ];

        for (resp, expected) in cases {
            let upstream = limited(MockUpstream::new(0).with_block_number_response(resp));
            let err = resolve_block("latest", &upstream).await.unwrap_err();

            let kind = match err {
                Error::UpstreamRpc { .. } => "UpstreamRpc",
                Error::MissingResult(_) => "MissingResult",
                Error::UnexpectedResult { .. } => "UnexpectedResult",
                _ => "other",
            };
            assert_eq!(kind, expected);
            assert_eq!(err.rpc_code(), -32603);
        }
    }

    #[tokio::test]
    async fn test_resolve_latest_transport_failure() {
        let upstream = limited(MockUpstream::new(0).failing_transport());

        assert!(matches!(
            resolve_block("latest", &upstream).await,
            Err(Error::Upstream(_))
        ));
    }

    fn upstream_requests(
        upstream: &LimitedUpstream<MockUpstream>,
    ) -> Vec<eth_rpc_proxy_core::types::RpcRequest> {
        upstream.inner().requests()
    }
}

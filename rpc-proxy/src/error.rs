use crate::splitter::BlockRange;
use eth_rpc_proxy_core::types::RpcError;
use serde_json::Value as JsonValue;
use std::fmt;
use std::result::Result as StdResult;
use thiserror::Error as ThisError;

pub const INVALID_REQUEST_CODE: i64 = -32600;
pub const PARSE_ERROR_CODE: i64 = -32700;
pub const INTERNAL_ERROR_CODE: i64 = -32603;

#[derive(Debug, ThisError)]
pub enum Error {
    #[error("invalid hex block number {0:?}")]
    InvalidBlockNumber(String),
    #[error("failed to send request to upstream rpc:\n{0}")]
    Upstream(eth_rpc_proxy_core::Error),
    #[error("upstream rpc returned an error for {method}: {} ({})", .error.code, .error.message)]
    UpstreamRpc { method: String, error: RpcError },
    #[error("upstream rpc response to {0} has no result")]
    MissingResult(String),
    #[error("upstream rpc response to {method} has an unexpected result:\n{result}")]
    UnexpectedResult { method: String, result: JsonValue },
    #[error("failed to get logs for blocks {}-{}:\n{source}", .range.from, .range.to)]
    BatchLeg { range: BlockRange, source: Box<Error> },
    #[error("failed to encode request for upstream rpc:\n{0}")]
    EncodeRequest(serde_json::Error),
    #[error("batch request body must be an array")]
    MalformedRequest,
    #[error("invalid request body:\n{0:?}")]
    InvalidRequestBody(Option<serde_json::Error>),
    #[error("rate limit of {max_requests_per_minute} requests per minute with safety margin {safety_margin} leaves no capacity")]
    InvalidRateLimit {
        max_requests_per_minute: u64,
        safety_margin: f64,
    },
    #[error("failed to create upstream rpc client:\n{0}")]
    CreateRpcClient(eth_rpc_proxy_core::Error),
    #[error("failed to encode metrics:\n{0}")]
    EncodeMetrics(fmt::Error),
    #[error("failed to bind http server:\n{0}")]
    BindHttpServer(hyper::Error),
    #[error("failed to run http server:\n{0}")]
    RunHttpServer(hyper::Error),
}

pub type Result<T> = StdResult<T, Error>;

impl From<eth_rpc_proxy_core::Error> for Error {
    fn from(e: eth_rpc_proxy_core::Error) -> Self {
        match e {
            eth_rpc_proxy_core::Error::InvalidBlockNumber(hex) => Self::InvalidBlockNumber(hex),
            e => Self::Upstream(e),
        }
    }
}

impl Error {
    pub fn rpc_code(&self) -> i64 {
        match self {
            Self::MalformedRequest => INVALID_REQUEST_CODE,
            Self::InvalidRequestBody(Some(e)) if !e.is_syntax() && !e.is_eof() => {
                INVALID_REQUEST_CODE
            }
            Self::InvalidRequestBody(_) => PARSE_ERROR_CODE,
            _ => INTERNAL_ERROR_CODE,
        }
    }

    pub fn to_rpc_error(&self) -> RpcError {
        let code = self.rpc_code();
        let message = match code {
            INVALID_REQUEST_CODE => "Invalid Request",
            PARSE_ERROR_CODE => "Parse error",
            _ => "Internal error",
        };

        RpcError {
            code,
            message: message.to_owned(),
            data: Some(JsonValue::String(self.to_string())),
        }
    }
}

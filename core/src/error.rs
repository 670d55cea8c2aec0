use std::result::Result as StdResult;

use thiserror::Error as ThisError;

#[derive(Debug, ThisError)]
pub enum Error {
    #[error("failed to read rpc response:\n{0}")]
    RpcResponseRead(reqwest::Error),
    #[error("failed to parse rpc response:\n{0}")]
    RpcResponseParse(serde_json::Error),
    #[error("failed to encode rpc request:\n{0}")]
    EncodeRpcRequest(serde_json::Error),
    #[error("error: rpc response status is {0}. payload:\n{1:?}")]
    RpcResponseStatus(u16, Option<String>),
    #[error("failed to execute http request:\n{0}")]
    HttpRequest(reqwest::Error),
    #[error("failed to build http client:\n{0}")]
    BuildHttpClient(reqwest::Error),
    #[error("invalid hex block number {0:?}")]
    InvalidBlockNumber(String),
}

pub type Result<T> = StdResult<T, Error>;

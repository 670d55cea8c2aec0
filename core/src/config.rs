use clap::Args;
use std::num::NonZeroU64;

#[derive(Args, Clone, Debug)]
pub struct RpcClientConfig {
    /// Url of the upstream rpc endpoint every request is forwarded to
    #[clap(long, env = "TARGET_RPC")]
    pub target_rpc: url::Url,
    /// Http request timeout in seconds
    #[clap(long, env = "REQUEST_TIMEOUT_SECS", default_value_t = NonZeroU64::new(30).unwrap())]
    pub request_timeout_secs: NonZeroU64,
    /// Http connect timeout in milliseconds
    #[clap(long, env = "CONNECT_TIMEOUT_MS", default_value_t = NonZeroU64::new(5000).unwrap())]
    pub connect_timeout_ms: NonZeroU64,
}

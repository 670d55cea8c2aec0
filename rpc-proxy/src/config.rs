use clap::{Args, Parser};
use eth_rpc_proxy_core::config::RpcClientConfig;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::num::NonZeroU64;

#[derive(Clone, Parser, Debug)]
#[clap(author, version, about, long_about = None)]
pub struct Config {
    #[command(flatten)]
    pub rpc: RpcClientConfig,
    /// Address to be used for running server
    #[clap(long, env = "SERVER_ADDR", default_value_t = default_server_addr())]
    pub server_addr: SocketAddr,
    /// Maximum block range on a eth_getLogs request.
    /// Requests spanning more blocks are split into multiple upstream requests
    #[clap(long, env = "MAX_BLOCK_RANGE", default_value_t = NonZeroU64::new(10000).unwrap())]
    pub max_block_range: NonZeroU64,
    #[command(flatten)]
    pub rate_limit: RateLimitConfig,
}

#[derive(Clone, Copy, Args, Debug)]
pub struct RateLimitConfig {
    /// Maximum requests per minute the target rpc accepts
    #[clap(long, env = "MAX_REQUESTS_PER_MINUTE", default_value_t = NonZeroU64::new(2000).unwrap())]
    pub max_requests_per_minute: NonZeroU64,
    /// Fraction of the target rpc's limit the proxy actually uses
    #[clap(long, env = "SAFETY_MARGIN", default_value_t = 0.9)]
    pub safety_margin: f64,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            max_requests_per_minute: NonZeroU64::new(2000).unwrap(),
            safety_margin: 0.9,
        }
    }
}

fn default_server_addr() -> SocketAddr {
    SocketAddr::new(IpAddr::V4(Ipv4Addr::new(127, 0, 0, 1)), 8282)
}

impl Config {
    pub fn parse() -> Self {
        <Self as Parser>::parse()
    }
}

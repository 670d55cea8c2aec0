mod batcher;
mod classifier;
mod config;
mod error;
mod handler;
mod limiter;
mod metrics;
mod resolver;
mod server;
mod splitter;
mod upstream;

#[cfg(test)]
mod test_utils;

pub use classifier::{classify, Route};
pub use config::{Config, RateLimitConfig};
pub use error::{Error, Result};
pub use handler::Handler;
pub use limiter::RateLimiter;
pub use metrics::Metrics;
pub use server::Server;
pub use splitter::{split, BlockRange};

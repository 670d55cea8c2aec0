pub mod config;
pub mod error;
pub mod eth_request;
pub mod rpc_client;
pub mod types;

pub use error::{Error, Result};

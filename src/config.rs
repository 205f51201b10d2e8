//! Command line and environment configuration

use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;

use crate::fetch::{FetchConfig, DEFAULT_MAX_FEED_BYTES, DEFAULT_USER_AGENT};

#[derive(Parser, Debug, Clone)]
#[command(name = "rff", about = "Removes XPath-selected nodes from RSS and Atom feeds")]
pub struct Config {
    /// Address to bind the HTTP server to (host:port).
    #[arg(long, env = "RFF_BIND", default_value = "127.0.0.1:8080")]
    pub bind: String,

    /// Directory served for non-API paths.
    #[arg(long, env = "RFF_WEB_ROOT", default_value = "wwwroot")]
    pub web_root: PathBuf,

    /// Seconds before an upstream feed request is abandoned.
    #[arg(long, env = "RFF_FETCH_TIMEOUT_SECS", default_value_t = 30)]
    pub fetch_timeout_secs: u64,

    /// Largest feed body accepted, in bytes.
    #[arg(long, env = "RFF_MAX_FEED_BYTES", default_value_t = DEFAULT_MAX_FEED_BYTES)]
    pub max_feed_bytes: usize,

    /// User-Agent header sent upstream.
    #[arg(long, env = "RFF_USER_AGENT", default_value = DEFAULT_USER_AGENT)]
    pub user_agent: String,

    /// Compiled XPath expressions kept in memory (0 disables the cache).
    #[arg(long, env = "RFF_XPATH_CACHE_SIZE", default_value_t = 256)]
    pub xpath_cache_size: usize,
}

impl Config {
    pub fn fetch_config(&self) -> FetchConfig {
        FetchConfig {
            timeout: Duration::from_secs(self.fetch_timeout_secs.max(1)),
            max_bytes: self.max_feed_bytes,
            user_agent: self.user_agent.clone(),
        }
    }
}

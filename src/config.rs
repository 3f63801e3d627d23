//! Configuration for the respkv binaries.
//!
//! Both binaries take the same bind flags; the client adds the key/value it
//! should exercise the server with.

use clap::Parser;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

/// The default port respkv listens on (same as Redis)
pub const DEFAULT_PORT: u16 = 6379;

/// The default host respkv binds to
pub const DEFAULT_HOST: &str = "127.0.0.1";

/// Server configuration
#[derive(Debug, Clone, Parser)]
#[command(name = "respkv-server", version, about = "Minimal RESP key-value server")]
pub struct ServerConfig {
    /// Host to bind to (empty means 127.0.0.1)
    #[arg(long = "bind-addr", default_value = "")]
    pub bind_addr: String,

    /// Port to listen on
    #[arg(long = "bind-port", default_value_t = DEFAULT_PORT)]
    pub bind_port: u16,

    /// Log level. Available options: debug, info, warn, error
    #[arg(long = "log-level", default_value = "info")]
    pub log_level: String,

    /// How long to let open connections finish after shutdown (ms)
    #[arg(long = "grace-period-ms", default_value_t = 1000)]
    pub grace_period_ms: u64,
}

impl ServerConfig {
    /// Returns the bind address as a string
    pub fn bind_address(&self) -> String {
        bind_address(&self.bind_addr, self.bind_port)
    }

    pub fn grace_period(&self) -> Duration {
        Duration::from_millis(self.grace_period_ms)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: String::new(),
            bind_port: DEFAULT_PORT,
            log_level: "info".to_string(),
            grace_period_ms: 1000,
        }
    }
}

/// Client configuration
#[derive(Debug, Clone, Parser)]
#[command(name = "respkv-cli", version, about = "SET then GET a key against respkv")]
pub struct ClientConfig {
    /// Server host (empty means 127.0.0.1)
    #[arg(long = "bind-addr", default_value = "")]
    pub bind_addr: String,

    /// Server port
    #[arg(long = "bind-port", default_value_t = DEFAULT_PORT)]
    pub bind_port: u16,

    /// Log level. Available options: debug, info, warn, error
    #[arg(long = "log-level", default_value = "debug")]
    pub log_level: String,

    /// key:val to set. In get-only mode, the key to read
    #[arg(long = "key-val")]
    pub key_val: Option<String>,

    /// Only GET the key given by --key-val
    #[arg(long = "get-only")]
    pub get_only: bool,
}

impl ClientConfig {
    pub fn bind_address(&self) -> String {
        bind_address(&self.bind_addr, self.bind_port)
    }
}

fn bind_address(host: &str, port: u16) -> String {
    let host = if host.is_empty() { DEFAULT_HOST } else { host };
    format!("{}:{}", host, port)
}

/// Builds the log filter from a `--log-level` value. `RUST_LOG` wins when set.
///
/// Unknown levels fall back to `info`.
pub fn log_filter(level: &str) -> EnvFilter {
    let level = match level.to_ascii_lowercase().as_str() {
        "debug" => "debug",
        "error" => "error",
        "warn" => "warn",
        "trace" => "trace",
        _ => "info",
    };
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level))
}

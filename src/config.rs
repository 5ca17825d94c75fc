//! Runtime configuration for replays and the HTTP server.
//!
//! Defaults can be overridden from the environment with [`ReplayConfig::from_env`]
//! and [`ServerConfig::from_env`]; the CLI maps its flags onto the same types.

use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;
use tracing::warn;

/// Environment variable overriding the server bind address.
pub const ADDR_ENV: &str = "ROAD_NETWORK_ADDR";

/// Environment variable overriding the replay output path.
pub const OUTPUT_ENV: &str = "ROAD_NETWORK_OUTPUT";

/// Settings for replaying a queries document.
#[derive(Debug, Clone, PartialEq)]
pub struct ReplayConfig {
    pub output: PathBuf,
    /// Pretty-print the output document.
    pub pretty: bool,
    /// Attach `processing_time` (milliseconds) to each record.
    pub record_timing: bool,
}

impl Default for ReplayConfig {
    fn default() -> Self {
        Self {
            output: PathBuf::from("output.json"),
            pretty: true,
            record_timing: true,
        }
    }
}

impl ReplayConfig {
    /// Defaults with `ROAD_NETWORK_OUTPUT` applied when set.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Ok(output) = env::var(OUTPUT_ENV) {
            config.output = PathBuf::from(output);
        }
        config
    }

    pub fn with_output(mut self, output: impl Into<PathBuf>) -> Self {
        self.output = output.into();
        self
    }

    pub fn with_pretty(mut self, pretty: bool) -> Self {
        self.pretty = pretty;
        self
    }

    pub fn with_record_timing(mut self, record_timing: bool) -> Self {
        self.record_timing = record_timing;
        self
    }
}

/// Settings for the HTTP server.
#[derive(Debug, Clone, PartialEq)]
pub struct ServerConfig {
    pub addr: SocketAddr,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            addr: SocketAddr::from(([0, 0, 0, 0], 7860)),
        }
    }
}

impl ServerConfig {
    /// Defaults with `ROAD_NETWORK_ADDR` applied when set and parseable.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Ok(addr) = env::var(ADDR_ENV) {
            match addr.parse() {
                Ok(addr) => config.addr = addr,
                Err(e) => warn!("Ignoring {}={:?}: {}", ADDR_ENV, addr, e),
            }
        }
        config
    }

    pub fn with_addr(mut self, addr: SocketAddr) -> Self {
        self.addr = addr;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_replay_defaults() {
        let config = ReplayConfig::default();
        assert_eq!(config.output, PathBuf::from("output.json"));
        assert!(config.pretty);
        assert!(config.record_timing);
    }

    #[test]
    fn test_replay_builders() {
        let config = ReplayConfig::default()
            .with_output("out/result.json")
            .with_pretty(false)
            .with_record_timing(false);
        assert_eq!(config.output, PathBuf::from("out/result.json"));
        assert!(!config.pretty);
        assert!(!config.record_timing);
    }

    #[test]
    fn test_server_default_port() {
        assert_eq!(ServerConfig::default().addr.port(), 7860);
        let addr: SocketAddr = "127.0.0.1:9000".parse().unwrap();
        assert_eq!(ServerConfig::default().with_addr(addr).addr, addr);
    }
}

//! Server configuration
//!
//! Configuration is resolved from command-line flags first, then
//! environment variables, then the built-in defaults.

use clap::Parser;
use std::path::PathBuf;

/// Runtime configuration for the waypoint server
#[derive(Debug, Clone, Parser)]
#[command(
    name = "waypoint-server",
    version,
    about = "Checkpoint, confirm and resume server for suspendable executions"
)]
pub struct ServerConfig {
    /// Host address to bind the HTTP listener to
    #[arg(long, env = "WAYPOINT_HOST", default_value = "0.0.0.0")]
    pub host: String,

    /// Port to bind the HTTP listener to
    #[arg(long, env = "WAYPOINT_PORT", default_value_t = 8080)]
    pub port: u16,

    /// Directory where checkpoint and overlay files are kept
    #[arg(long, env = "WAYPOINT_DATA_DIR", default_value = "./checkpoints_data")]
    pub data_dir: PathBuf,
}

impl ServerConfig {
    /// Address string suitable for `TcpListener::bind`
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

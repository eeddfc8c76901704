//! Server configuration from environment variables.

use std::path::PathBuf;

/// Runtime configuration for `plan-server`.
#[derive(Debug, Clone)]
pub struct Config {
    /// Address the HTTP server binds to.
    pub bind_addr: String,
    /// Path of the JSON snapshot file the store is loaded from and saved to.
    pub snapshot_path: PathBuf,
}

impl Config {
    pub fn from_env() -> Self {
        let bind_addr =
            std::env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:8080".to_string());
        let snapshot_path = std::env::var("SNAPSHOT_PATH")
            .unwrap_or_else(|_| "data/scopeline.json".to_string())
            .into();
        Self {
            bind_addr,
            snapshot_path,
        }
    }
}

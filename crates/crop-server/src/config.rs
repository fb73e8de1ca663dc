use anyhow::{Context, Result};
use crop_model::ArtifactPaths;
use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;

const DEFAULT_BIND_ADDR: &str = "127.0.0.1:5000";

#[derive(Debug, Clone, PartialEq)]
pub struct ServerConfig {
    pub bind_addr: SocketAddr,
    pub artifacts: ArtifactPaths,
}

impl ServerConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let bind = lookup("BIND_ADDR").unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string());
        let bind_addr = bind
            .parse()
            .with_context(|| format!("BIND_ADDR is not a socket address: {bind}"))?;

        let defaults = ArtifactPaths::default();
        let path_or = |key: &str, default: PathBuf| lookup(key).map(PathBuf::from).unwrap_or(default);

        Ok(Self {
            bind_addr,
            artifacts: ArtifactPaths {
                model: path_or("MODEL_PATH", defaults.model),
                standard_scaler: path_or("STANDARD_SCALER_PATH", defaults.standard_scaler),
                minmax_scaler: path_or("MINMAX_SCALER_PATH", defaults.minmax_scaler),
            },
        })
    }
}

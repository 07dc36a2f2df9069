use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;

use contracts::DEFAULT_PROGRESS_THRESHOLD;
use dialogue_core::{Catalog, DialogueError};
use thiserror::Error;

pub const DEFAULT_BIND_ADDR: &str = "127.0.0.1:8080";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid REHEARSAL_BIND_ADDR: {0}")]
    BindAddr(String),
    #[error("invalid REHEARSAL_PROGRESS_THRESHOLD: {0} (expected an integer of at least 1)")]
    ProgressThreshold(String),
}

/// Host settings read from `REHEARSAL_*` environment variables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostConfig {
    pub catalog_path: Option<PathBuf>,
    pub access_token: Option<String>,
    pub bind_addr: SocketAddr,
    pub progress_threshold: u32,
}

impl Default for HostConfig {
    fn default() -> Self {
        Self {
            catalog_path: None,
            access_token: None,
            bind_addr: SocketAddr::from(([127, 0, 0, 1], 8080)),
            progress_threshold: DEFAULT_PROGRESS_THRESHOLD,
        }
    }
}

impl HostConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let read = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        let bind_raw = read("REHEARSAL_BIND_ADDR").unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string());
        let bind_addr = bind_raw
            .parse::<SocketAddr>()
            .map_err(|_| ConfigError::BindAddr(bind_raw.clone()))?;

        let progress_threshold = match read("REHEARSAL_PROGRESS_THRESHOLD") {
            Some(raw) => raw
                .trim()
                .parse::<u32>()
                .ok()
                .filter(|value| *value >= 1)
                .ok_or_else(|| ConfigError::ProgressThreshold(raw.clone()))?,
            None => DEFAULT_PROGRESS_THRESHOLD,
        };

        Ok(Self {
            catalog_path: read("REHEARSAL_CATALOG_PATH").map(PathBuf::from),
            access_token: read("REHEARSAL_ACCESS_TOKEN"),
            bind_addr,
            progress_threshold,
        })
    }

    pub fn load_catalog(&self) -> Result<Catalog, DialogueError> {
        match &self.catalog_path {
            Some(path) => Catalog::from_path(path),
            None => Catalog::builtin(),
        }
    }
}

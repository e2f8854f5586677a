use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use serde::Deserialize;

use crate::error::PoolError;

fn default_host() -> String {
    common::config::invoker_host()
}

/// Description of the sandbox workers, as written by the provisioning
/// scripts: `{"host": "127.0.0.1", "remote": {"65044": "<container id>"}}`.
#[derive(Debug, Clone, Deserialize)]
pub struct PoolConfig {
    #[serde(default = "default_host")]
    pub host: String,
    /// Port (as a string key) to sandbox identity.
    pub remote: BTreeMap<String, String>,
}

impl PoolConfig {
    pub fn new<I, S>(host: impl Into<String>, slots: I) -> Self
    where
        I: IntoIterator<Item = (u16, S)>,
        S: Into<String>,
    {
        Self {
            host: host.into(),
            remote: slots
                .into_iter()
                .map(|(port, id)| (port.to_string(), id.into()))
                .collect(),
        }
    }

    /// `(port, id)` pairs in port order.
    pub fn slots(&self) -> Result<Vec<(u16, String)>, PoolError> {
        let mut slots = self
            .remote
            .iter()
            .map(|(port, id)| {
                port.trim()
                    .parse::<u16>()
                    .map(|port| (port, id.clone()))
                    .map_err(|_| PoolError::Config(format!("'{port}' is not a valid port")))
            })
            .collect::<Result<Vec<_>, _>>()?;
        slots.sort_by_key(|(port, _)| *port);
        if slots.is_empty() {
            return Err(PoolError::Config("no invokers configured".into()));
        }
        Ok(slots)
    }
}

/// Loads a [`PoolConfig`] from a JSON file.
///
/// # Arguments
/// - `path`: path to the `invokers.json` file.
///
/// # Returns
/// - `Ok(PoolConfig)` if the file exists and parses.
/// - `Err(PoolError::Config)` with a descriptive message otherwise.
pub fn load_pool_config_from_json<P: AsRef<Path>>(path: P) -> Result<PoolConfig, PoolError> {
    let path_ref = path.as_ref();

    if !path_ref.exists() || !path_ref.is_file() {
        return Err(PoolError::Config(format!(
            "Config file {:?} does not exist or is not a valid file",
            path_ref
        )));
    }

    let content = fs::read_to_string(path_ref)
        .map_err(|e| PoolError::Config(format!("Failed to read config file {:?}: {}", path_ref, e)))?;

    serde_json::from_str(&content)
        .map_err(|e| PoolError::Config(format!("Invalid JSON in config file {:?}: {}", path_ref, e)))
}

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::{Error, Result};

/// Prefix for environment overrides, e.g. `MSG_RELAY_FORWARD_ADDR`.
pub const ENV_PREFIX: &str = "MSG_RELAY";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub listen_addr: String,
    pub forward_addr: String,
    pub metrics_addr: String,
    /// Longest accepted message in bytes. Unset means unbounded.
    pub max_message_len: Option<usize>,
    /// Stop accepting after this many connections. Unset in production.
    pub accept_limit: Option<usize>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            listen_addr: "0.0.0.0:8002".to_string(),
            forward_addr: "127.0.0.1:8001".to_string(),
            metrics_addr: "0.0.0.0:8003".to_string(),
            max_message_len: None,
            accept_limit: None,
        }
    }
}

impl Config {
    /// Load a config file, with `MSG_RELAY_*` environment variables taking precedence.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let settings = config::Config::builder()
            .add_source(config::File::from(path.as_ref()))
            .add_source(config::Environment::with_prefix(ENV_PREFIX))
            .build()?;

        let config: Config = settings.try_deserialize()?;
        Ok(config)
    }

    pub fn to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content).map_err(Error::Io)?;
        Ok(())
    }
}

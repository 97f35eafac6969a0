use std::env;
use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use starter::params::{
    Defaults, Runtimes, DEFAULT_GO_VERSION, DEFAULT_MONGO_VERSION, DEFAULT_NETWORK,
    DEFAULT_NODE_VERSION, DEFAULT_REGISTRY, DEFAULT_TEMPLATE,
};
use starter::sanitize;

const FILE_NAME: &str = ".starter.config.toml";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub(crate) struct Config {
    pub(crate) node_version: String,
    pub(crate) go_version: String,
    pub(crate) mongo_version: String,
    pub(crate) network: String,
    pub(crate) registry: String,
    pub(crate) template: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            node_version: DEFAULT_NODE_VERSION.to_string(),
            go_version: DEFAULT_GO_VERSION.to_string(),
            mongo_version: DEFAULT_MONGO_VERSION.to_string(),
            network: DEFAULT_NETWORK.to_string(),
            registry: DEFAULT_REGISTRY.to_string(),
            template: DEFAULT_TEMPLATE.to_string(),
        }
    }
}

impl Config {
    /// `STARTER_CONFIG` when set, `~/.starter.config.toml` otherwise.
    pub(crate) fn path() -> Result<PathBuf> {
        if let Some(path) = env::var_os("STARTER_CONFIG") {
            return Ok(PathBuf::from(path));
        }
        let home = home::home_dir().context("failed to locate user home directory")?;
        Ok(home.join(FILE_NAME))
    }

    /// Reads the configuration file if there is one. Never creates it.
    pub(crate) fn load() -> Result<Self> {
        let path = Self::path()?;
        if !path.exists() {
            return Ok(Self::default());
        }
        let contents = fs::read_to_string(&path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        Self::parse(&contents)
            .with_context(|| format!("invalid configuration in {}", path.display()))
    }

    fn parse(contents: &str) -> Result<Self> {
        let config: Self = toml::from_str(contents)?;
        for (key, value) in [
            ("node_version", &config.node_version),
            ("go_version", &config.go_version),
            ("mongo_version", &config.mongo_version),
        ] {
            sanitize::runtime_version(key, value)?;
        }
        Ok(config)
    }

    pub(crate) fn to_toml(&self) -> Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    pub(crate) fn defaults(&self) -> Defaults {
        Defaults {
            runtimes: Runtimes {
                node: self.node_version.trim_start_matches('v').to_string(),
                go: self.go_version.trim_start_matches('v').to_string(),
                mongo: self.mongo_version.clone(),
            },
            network: self.network.clone(),
            registry: self.registry.trim_end_matches('/').to_string(),
            template: self.template.clone(),
        }
    }
}

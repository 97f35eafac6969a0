use serde::Serialize;

pub const DEFAULT_NODE_VERSION: &str = "22.19.0";
pub const DEFAULT_GO_VERSION: &str = "1.24.4";
pub const DEFAULT_MONGO_VERSION: &str = "7.0";
pub const DEFAULT_NETWORK: &str = "traefik-nseven";
pub const DEFAULT_REGISTRY: &str = "ghcr.io/nsevendev";
pub const DEFAULT_PORT: u16 = 3000;
pub const DEFAULT_TEMPLATE: &str = "https://github.com/nsevendev/temp-angssr-go.git";

/// Runtime versions pinned into images and prerequisite checks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Runtimes {
    pub node: String,
    pub go: String,
    pub mongo: String,
}

impl Default for Runtimes {
    fn default() -> Self {
        Self {
            node: DEFAULT_NODE_VERSION.to_string(),
            go: DEFAULT_GO_VERSION.to_string(),
            mongo: DEFAULT_MONGO_VERSION.to_string(),
        }
    }
}

/// Values a run falls back to when no flag overrides them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Defaults {
    pub runtimes: Runtimes,
    pub network: String,
    pub registry: String,
    /// Repository cloned by the template-based stage.
    pub template: String,
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            runtimes: Runtimes::default(),
            network: DEFAULT_NETWORK.to_string(),
            registry: DEFAULT_REGISTRY.to_string(),
            template: DEFAULT_TEMPLATE.to_string(),
        }
    }
}

/// Inputs of one scaffold run. Built once from the command line and only
/// ever read afterwards; every template renders from it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScaffoldParameters {
    pub name: String,
    pub version: Option<String>,
    pub host: String,
    pub api_host: Option<String>,
    pub allowed_hosts: Vec<String>,
    pub db_name: String,
    pub deploy_folder: String,
    pub runtimes: Runtimes,
    pub port: u16,
    pub network: String,
    pub registry: String,
}

impl ScaffoldParameters {
    pub fn builder(name: impl Into<String>) -> Builder {
        Builder {
            name: name.into(),
            version: None,
            host: String::new(),
            api_host: None,
            allowed_hosts: Vec::new(),
            db_name: None,
            deploy_folder: None,
            runtimes: Runtimes::default(),
            port: DEFAULT_PORT,
            network: DEFAULT_NETWORK.to_string(),
            registry: DEFAULT_REGISTRY.to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Builder {
    name: String,
    version: Option<String>,
    host: String,
    api_host: Option<String>,
    allowed_hosts: Vec<String>,
    db_name: Option<String>,
    deploy_folder: Option<String>,
    runtimes: Runtimes,
    port: u16,
    network: String,
    registry: String,
}

impl Builder {
    pub fn version(mut self, version: impl Into<String>) -> Self {
        self.version = Some(version.into());
        self
    }

    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.host = host.into();
        self
    }

    pub fn api_host(mut self, host: impl Into<String>) -> Self {
        self.api_host = Some(host.into());
        self
    }

    pub fn allowed_hosts(mut self, hosts: Vec<String>) -> Self {
        self.allowed_hosts = hosts;
        self
    }

    pub fn db_name(mut self, db_name: Option<String>) -> Self {
        self.db_name = db_name;
        self
    }

    pub fn deploy_folder(mut self, folder: Option<String>) -> Self {
        self.deploy_folder = folder;
        self
    }

    pub fn runtimes(mut self, runtimes: Runtimes) -> Self {
        self.runtimes = runtimes;
        self
    }

    pub fn port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    pub fn network(mut self, network: impl Into<String>) -> Self {
        self.network = network.into();
        self
    }

    pub fn registry(mut self, registry: impl Into<String>) -> Self {
        self.registry = registry.into();
        self
    }

    pub fn defaults(self, defaults: &Defaults) -> Self {
        self.runtimes(defaults.runtimes.clone())
            .network(defaults.network.clone())
            .registry(defaults.registry.clone())
    }

    /// Database name and deploy folder fall back to the project name, the
    /// allowed hosts to the main host.
    pub fn build(self) -> ScaffoldParameters {
        let allowed_hosts = if self.allowed_hosts.is_empty() && !self.host.is_empty() {
            vec![self.host.clone()]
        } else {
            self.allowed_hosts
        };
        ScaffoldParameters {
            db_name: self.db_name.unwrap_or_else(|| self.name.clone()),
            deploy_folder: self.deploy_folder.unwrap_or_else(|| self.name.clone()),
            name: self.name,
            version: self.version,
            host: self.host,
            api_host: self.api_host,
            allowed_hosts,
            runtimes: self.runtimes,
            port: self.port,
            network: self.network,
            registry: self.registry,
        }
    }
}

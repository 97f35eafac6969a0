use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args, Subcommand};
use colored::Colorize;
use starter::artifact::{self, WriteOutcome, WritePolicy};
use starter::params::{Defaults, DEFAULT_PORT};
use starter::stage::{angular_go, angular_ssr, astro_go, Orchestrator};
use starter::tool;

use crate::config::Config;
use crate::{prompt, App};

#[derive(Subcommand)]
pub(crate) enum Command {
    /// Angular application with server-side rendering, no backend.
    AngularSsr(AngularSsrArgs),
    /// Astro front, Go API and MongoDB.
    AstroGo(AstroGoArgs),
    /// Angular front, Go API and MongoDB cloned from a template repository.
    AngularGo(AngularGoArgs),
    /// Print the effective configuration, or create the configuration file.
    Config(ConfigArgs),
}

#[derive(Args)]
pub(crate) struct AngularSsrArgs {
    #[arg(long, help = "Project name, also the name of the created directory.")]
    name: String,

    #[arg(long, help = "Host the application is served on, e.g. shop.local.")]
    host: String,

    #[arg(
        long = "allowed-host",
        value_delimiter = ',',
        help = "Host accepted by the dev server [default: --host]"
    )]
    allowed_hosts: Vec<String>,

    #[arg(long = "node-version", help = "Node.js version of the images.")]
    node_version: Option<String>,

    #[arg(long, default_value_t = DEFAULT_PORT, help = "Port the dev server listens on.")]
    port: u16,
}

#[derive(Args)]
pub(crate) struct AstroGoArgs {
    #[arg(long, help = "Project name, also the name of the created directory.")]
    name: String,

    #[arg(long = "host-front", help = "Host the Astro front is served on.")]
    host_front: String,

    #[arg(long = "host-api", help = "Host the Go API is served on.")]
    host_api: String,

    #[arg(long = "db-name", help = "MongoDB database name [default: --name]")]
    db_name: Option<String>,

    #[arg(
        long = "deploy-folder",
        help = "Folder under ~/preprod and ~/prod on the server [default: --name]"
    )]
    deploy_folder: Option<String>,

    #[arg(
        long = "allowed-host",
        value_delimiter = ',',
        help = "Host accepted by the Vite dev server [default: .local]"
    )]
    allowed_hosts: Vec<String>,
}

#[derive(Args)]
pub(crate) struct AngularGoArgs {
    #[arg(long, help = "Project name, also the name of the created directory.")]
    name: String,

    #[arg(long, help = "Template tag to clone, e.g. v1.0.0.")]
    version: String,

    #[arg(
        long = "allowed-host",
        value_delimiter = ',',
        help = "Host accepted by the dev server [default: --host-traefik]"
    )]
    allowed_hosts: Vec<String>,

    #[arg(
        long = "host-traefik",
        help = "Host the application is served on [default: <name>.local]"
    )]
    host_traefik: Option<String>,

    #[arg(long = "db-name", help = "MongoDB database name [default: --name]")]
    db_name: Option<String>,

    #[arg(
        long = "deploy-folder",
        help = "Folder under ~/preprod and ~/prod on the server [default: --name]"
    )]
    deploy_folder: Option<String>,

    #[arg(long, help = "Template repository URL or host:owner/repo shorthand.")]
    template: Option<String>,
}

#[derive(Args)]
pub(crate) struct ConfigArgs {
    #[arg(long, help = "Write the configuration file if it does not exist yet.")]
    init: bool,
}

impl App {
    pub(crate) fn run(self) -> Result<()> {
        let Self {
            command,
            dir,
            yes,
            config,
        } = self;
        let defaults = config.defaults();
        let network = defaults.network.clone();
        let mut gate = prompt::gate(yes);
        let mut orchestrator = Orchestrator::new(gate.as_mut())?;

        let report = match command {
            Command::Config(args) => return show_config(&config, &args),
            Command::AngularSsr(args) => {
                orchestrator.run::<angular_ssr::AngularSsr>(args.into_options(dir, defaults))?
            }
            Command::AstroGo(args) => {
                orchestrator.run::<astro_go::AstroGo>(args.into_options(dir, defaults))?
            }
            Command::AngularGo(args) => {
                orchestrator.run::<angular_go::AngularGo>(args.into_options(dir, defaults))?
            }
        };

        report.print_manifest();
        let hints = tool::docker_hints(&network);
        if !hints.is_empty() {
            println!("Docker:");
            for hint in hints {
                println!("  {} {hint}", "!".yellow());
            }
        }
        Ok(())
    }
}

impl AngularSsrArgs {
    fn into_options(self, dir: PathBuf, defaults: Defaults) -> angular_ssr::Options {
        angular_ssr::Options {
            dir,
            name: self.name,
            host: self.host,
            allowed_hosts: self.allowed_hosts,
            node_version: self.node_version,
            port: self.port,
            defaults,
        }
    }
}

impl AstroGoArgs {
    fn into_options(self, dir: PathBuf, defaults: Defaults) -> astro_go::Options {
        astro_go::Options {
            dir,
            name: self.name,
            host_front: self.host_front,
            host_api: self.host_api,
            db_name: self.db_name,
            deploy_folder: self.deploy_folder,
            allowed_hosts: self.allowed_hosts,
            defaults,
        }
    }
}

impl AngularGoArgs {
    fn into_options(self, dir: PathBuf, defaults: Defaults) -> angular_go::Options {
        angular_go::Options {
            dir,
            name: self.name,
            version: self.version,
            allowed_hosts: self.allowed_hosts,
            host_traefik: self.host_traefik,
            db_name: self.db_name,
            deploy_folder: self.deploy_folder,
            template: self.template,
            defaults,
        }
    }
}

fn show_config(config: &Config, args: &ConfigArgs) -> Result<()> {
    let contents = config.to_toml()?;
    if !args.init {
        print!("{contents}");
        return Ok(());
    }
    let path = Config::path()?;
    if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        artifact::ensure_dir(parent)?;
    }
    let outcome = artifact::write(&path, &contents, WritePolicy::CreateIfAbsent)
        .with_context(|| format!("failed to create {}", path.display()))?;
    match outcome {
        WriteOutcome::Skipped => {
            println!("- {} {} (already present)", "[SKIP]".yellow(), path.display())
        }
        _ => println!("- {} {} (created)", "[OK]".green(), path.display()),
    }
    Ok(())
}

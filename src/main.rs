mod config;
mod prompt;
mod scaffold;

use std::io::IsTerminal;
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{ArgAction, Parser};
use colored::Colorize;
use tracing_subscriber::EnvFilter;

use crate::config::Config;
use crate::scaffold::Command;

#[derive(Parser)]
#[command(version)]
#[command(disable_help_flag = true)]
#[command(disable_version_flag = true)]
#[command(arg_required_else_help = true)]
#[command(about = "Scaffolds containerised web application starters")]
struct Cli {
    #[command(subcommand)]
    command: Command,

    #[arg(
        short = 'C',
        long = "dir",
        global = true,
        value_name = "DIR",
        help = "Directory the project is created in [default: current directory]"
    )]
    dir: Option<PathBuf>,

    #[arg(
        short = 'y',
        long = "yes",
        global = true,
        help = "Answer yes to every confirmation."
    )]
    yes: bool,

    #[arg(
        short = 'v',
        long = "verbose",
        global = true,
        help = "Print debug diagnostics to stderr."
    )]
    verbose: bool,

    #[arg(
        short = 'h',
        long = "help",
        help = "Print this help message.",
        action = ArgAction::Help,
    )]
    help: Option<bool>,

    #[arg(
        short = 'V',
        long = "version",
        help = "Print version information.",
        action = ArgAction::Version,
    )]
    version: Option<bool>,
}

pub(crate) struct App {
    command: Command,
    dir: PathBuf,
    yes: bool,
    config: Config,
}

impl App {
    fn init(cli: Cli) -> Result<Self> {
        let config = Config::load()?;
        let dir = match cli.dir {
            Some(dir) => dir,
            None => std::env::current_dir().context("failed to read the current directory")?,
        };
        Ok(Self {
            command: cli.command,
            dir,
            yes: cli.yes,
            config,
        })
    }
}

fn init_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_env("STARTER_LOG").unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);
    if !std::io::stdout().is_terminal() {
        colored::control::set_override(false);
    }

    match App::init(cli).and_then(App::run) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            match err.downcast_ref::<starter::Error>().map(starter::Error::root) {
                Some(starter::Error::UserCancelled(reason)) => {
                    println!("{} {reason}", "Cancelled:".yellow());
                }
                _ => eprintln!("{} {err:#}", "error:".red().bold()),
            }
            ExitCode::FAILURE
        }
    }
}

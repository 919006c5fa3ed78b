use std::path::{Path, PathBuf};

mod extract;
mod init;
mod terminal;

use clap::ArgAction;
use reqcase::Config;

/// The configuration file looked up in the working directory.
const CONFIG_FILE: &str = "reqcase.toml";

#[derive(Debug, clap::Parser)]
#[command(version, about)]
pub struct Cli {
    /// Verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    /// Path to a configuration file (defaults to ./reqcase.toml if present)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

impl Cli {
    pub fn run(self) -> anyhow::Result<()> {
        Self::setup_logging(self.verbose);

        match self.command {
            Command::Extract(command) => {
                let config = load_config(self.config.as_deref())?;
                command.run(&config)
            }
            Command::Init(command) => command.run(self.config.as_deref()),
        }
    }

    fn setup_logging(verbosity: u8) {
        use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

        let level = match verbosity {
            0 => tracing::Level::WARN,
            1 => tracing::Level::INFO,
            2 => tracing::Level::DEBUG,
            _ => tracing::Level::TRACE,
        };

        let filter = tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into());

        let fmt_layer = tracing_subscriber::fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(false)
            .with_thread_names(false)
            .with_line_number(false);

        tracing_subscriber::registry()
            .with(filter)
            .with(fmt_layer)
            .init();
    }
}

#[derive(Debug, clap::Subcommand)]
pub enum Command {
    /// Extract test cases from a document or a directory of documents
    Extract(extract::Command),

    /// Write a default configuration file
    Init(init::Command),
}

/// Loads the explicit config file, else `./reqcase.toml` if it exists, else
/// the defaults.
fn load_config(explicit: Option<&Path>) -> anyhow::Result<Config> {
    if let Some(path) = explicit {
        return Config::load(path).map_err(|e| anyhow::anyhow!("{}: {e}", path.display()));
    }

    let local = Path::new(CONFIG_FILE);
    if local.exists() {
        tracing::debug!("Using configuration from {}", local.display());
        return Config::load(local).map_err(|e| anyhow::anyhow!("{CONFIG_FILE}: {e}"));
    }

    tracing::debug!("No configuration file found, using defaults");
    Ok(Config::default())
}

use std::path::Path;

use reqcase::Config;
use tracing::instrument;

use super::CONFIG_FILE;

#[derive(Debug, clap::Parser)]
pub struct Command {
    /// Overwrite an existing configuration file
    #[arg(long)]
    force: bool,
}

impl Command {
    #[instrument]
    pub fn run(self, path: Option<&Path>) -> anyhow::Result<()> {
        let path = path.unwrap_or_else(|| Path::new(CONFIG_FILE));
        if path.exists() && !self.force {
            anyhow::bail!(
                "Configuration already exists at {} (use --force to overwrite)",
                path.display()
            );
        }

        Config::default()
            .save(path)
            .map_err(|e| anyhow::anyhow!("Failed to create {}: {e}", path.display()))?;

        println!("Created {}", path.display());
        println!();
        println!("Next steps:");
        println!("  reqcase extract specs/ -o cases.csv");

        Ok(())
    }
}

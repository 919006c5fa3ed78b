//! Command-line front end for extracting test cases from requirement
//! documents.

mod cli;

use clap::Parser;

fn main() -> anyhow::Result<()> {
    cli::Cli::parse().run()
}

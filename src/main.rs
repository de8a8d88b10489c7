//! streamconv CLI
//!
//! Command-line interface for running conversion jobs

use clap::Parser;
use streamconv::cli::{Cli, Runner};

fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let runner = Runner::new(cli)?;
    runner.run()?;
    Ok(())
}

fn main() {
    if let Err(e) = run() {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

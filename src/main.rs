use anyhow::Result;
use clap::Parser;

fn main() -> Result<()> {
    let cli = taskmaster::cli::Cli::parse();
    taskmaster::run_blocking(cli)
}

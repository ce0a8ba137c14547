//! Fleet CLI
//!
//! Runs git operations, synchronization and diagnostics across every
//! repository under a directory.

mod cli;
mod commands;
mod context;
mod error;
mod logging;

use clap::Parser;
use colored::Colorize;

use cli::Cli;
use context::Context;
use error::Result;

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        eprintln!("{}: {}", "error".red().bold(), e);
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    let cli = Cli::parse();
    logging::init(cli.verbose);

    let Some(command) = cli.command else {
        println!("{} bulk git across many repositories", "fleet".green().bold());
        println!();
        println!("Run {} for available commands.", "fleet --help".cyan());
        return Ok(());
    };

    let ctx = Context::new(cli.config.as_deref(), cli.json)?;
    let cancel = ctx.cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_err() {
            return;
        }
        eprintln!(
            "{} waiting for in-flight repositories; press Ctrl-C again to exit",
            "interrupted:".yellow().bold()
        );
        cancel.cancel();
        if tokio::signal::ctrl_c().await.is_ok() {
            std::process::exit(130);
        }
    });

    commands::execute(ctx, command).await
}

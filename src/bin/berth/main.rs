//! berth CLI - install layout planner for Python native extensions

use std::io::IsTerminal;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use berth::util::diagnostic::{emit, suggestions};
use berth::LayoutError;

mod cli;
mod commands;

use cli::{Cli, Commands};

fn main() {
    let cli = Cli::parse();
    let color = !cli.no_color && std::io::stderr().is_terminal();
    let verbose = cli.verbose;

    if let Err(e) = run(cli) {
        match e.downcast_ref::<LayoutError>() {
            Some(err) => emit(&err.to_diagnostic(), color),
            None => {
                eprintln!("error: {:#}", e);
                if !verbose {
                    eprintln!("{}", suggestions::PLAN_FAILED);
                }
            }
        }
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    // Set up logging
    let filter = if cli.verbose {
        EnvFilter::new("berth=debug")
    } else {
        EnvFilter::new("berth=info")
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .without_time()
        .init();

    match cli.command {
        Commands::Plan(args) => commands::plan::execute(args),
        Commands::Tag(args) => commands::tag::execute(args),
    }
}

//! CLI definitions using clap.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use berth::core::{PlatformFamily, PythonVersion};

/// berth - install layout planner for Python native extensions
#[derive(Parser)]
#[command(name = "berth")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Plan the install layout and print it as JSON
    Plan(PlanArgs),

    /// Print the distribution tag
    Tag(TagArgs),
}

/// Inputs shared by every command.
#[derive(Args)]
pub struct InputArgs {
    /// Build graph records (JSON)
    #[arg(long, value_name = "FILE")]
    pub graph: PathBuf,

    /// Declared package names (JSON)
    #[arg(long, value_name = "FILE")]
    pub packages: Option<PathBuf>,

    /// Configuration file (defaults to ./berth.toml if present)
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Target platform family (elf, macho, windows)
    #[arg(long)]
    pub target: Option<PlatformFamily>,

    /// Interpreter version for records that do not name one (e.g. 3.12)
    #[arg(long)]
    pub python: Option<PythonVersion>,

    /// Wheel platform tag
    #[arg(long)]
    pub platform_tag: Option<String>,

    /// Number of resolver threads
    #[arg(short, long, env = "BERTH_JOBS")]
    pub jobs: Option<usize>,
}

#[derive(Args)]
pub struct PlanArgs {
    #[command(flatten)]
    pub input: InputArgs,

    /// Write the plan to a file instead of stdout
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,
}

#[derive(Args)]
pub struct TagArgs {
    #[command(flatten)]
    pub input: InputArgs,

    /// Print every expanded tag, one per line
    #[arg(long)]
    pub all: bool,
}

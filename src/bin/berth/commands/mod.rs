//! Command implementations

pub mod plan;
pub mod tag;

use std::path::Path;

use anyhow::{bail, Result};

use crate::cli::InputArgs;
use berth::util::config::{Config, LayoutConfig, TargetConfig, CONFIG_FILE_NAME};
use berth::util::diagnostic::suggestions;
use berth::{plan_distribution, PlanInput, PlanOutput};

/// Load inputs and configuration, then plan the distribution.
pub fn plan_from_args(args: &InputArgs) -> Result<PlanOutput> {
    if !args.graph.exists() {
        bail!(
            "build graph not found: {}\n{}",
            args.graph.display(),
            suggestions::NO_GRAPH
        );
    }
    if let Some(packages) = &args.packages {
        if !packages.exists() {
            bail!(
                "package list not found: {}\n{}",
                packages.display(),
                suggestions::NO_PACKAGES
            );
        }
    }

    let config = load_config(args)?;
    let input = PlanInput::load(&args.graph, args.packages.as_deref())?;

    Ok(plan_distribution(&input, &config)?)
}

fn load_config(args: &InputArgs) -> Result<Config> {
    let mut config = match &args.config {
        Some(path) => Config::load(path)?,
        None => Config::load_or_default(Path::new(CONFIG_FILE_NAME)),
    };

    // Command line flags win over the file.
    config.merge(Config {
        target: TargetConfig {
            family: args.target,
            python: args.python,
            platform_tag: args.platform_tag.clone(),
            ..Default::default()
        },
        layout: LayoutConfig {
            jobs: args.jobs,
            ..Default::default()
        },
        ..Default::default()
    });
    config.validate()?;

    Ok(config)
}

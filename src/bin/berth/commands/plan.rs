//! `berth plan` command

use anyhow::{Context, Result};

use crate::cli::PlanArgs;
use crate::commands::plan_from_args;

pub fn execute(args: PlanArgs) -> Result<()> {
    let output = plan_from_args(&args.input)?;
    let json = serde_json::to_string_pretty(&output).context("failed to serialize plan")?;

    match &args.output {
        Some(path) => {
            std::fs::write(path, format!("{}\n", json))
                .with_context(|| format!("failed to write plan: {}", path.display()))?;
            tracing::info!(
                "wrote {} entries for {} to {}",
                output.plan.len(),
                output.tag,
                path.display()
            );
        }
        None => println!("{}", json),
    }

    Ok(())
}

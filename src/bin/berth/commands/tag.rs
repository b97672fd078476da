//! `berth tag` command

use anyhow::Result;

use crate::cli::TagArgs;
use crate::commands::plan_from_args;

pub fn execute(args: TagArgs) -> Result<()> {
    let output = plan_from_args(&args.input)?;

    if args.all {
        for tag in output.tag.tags() {
            println!("{}", tag);
        }
    } else {
        println!("{}", output.tag);
    }

    Ok(())
}

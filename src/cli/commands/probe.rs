use anyhow::Result;
use clap::Args;

use crate::cli::Output;
use crate::probe::{CapabilityProbe, SystemProbe};
use crate::strategy::THREADED_CORE_THRESHOLD;

#[derive(Args, Default)]
pub struct ProbeArgs {
    /// Print only the number
    #[arg(long)]
    pub raw: bool,
}

pub fn execute(args: &ProbeArgs, output: &Output) -> Result<()> {
    let cores = SystemProbe.available_parallelism();

    if args.raw {
        println!("{cores}");
        return Ok(());
    }

    output.header("Host capability");
    output.key_value("Parallelism:", &cores.to_string(), true);
    let automatic = if cores <= THREADED_CORE_THRESHOLD {
        "threading"
    } else {
        "multiprocessing"
    };
    output.key_value("Automatic choice:", automatic, false);
    Ok(())
}

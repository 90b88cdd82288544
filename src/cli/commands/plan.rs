use anyhow::{Result, bail};
use clap::{Args, ValueEnum};
use serde::Serialize;

use super::Cli;
use crate::cli::Output;
use crate::config::Settings;
use crate::probe::{CapabilityProbe, FixedProbe, SystemProbe};
use crate::strategy::{ExecutionPlan, StrategyDecision, translate};

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

impl OutputFormat {
    /// `--format` wins over the `output.format` config key
    pub fn resolve(flag: Option<OutputFormat>, settings: &Settings) -> Result<Self> {
        if let Some(format) = flag {
            return Ok(format);
        }
        match settings.output.format.to_lowercase().as_str() {
            "text" => Ok(OutputFormat::Text),
            "json" => Ok(OutputFormat::Json),
            other => bail!("Unsupported output format: {other}. Use text or json"),
        }
    }
}

#[derive(Args, Default)]
pub struct PlanArgs {
    /// Output format
    #[arg(long, value_enum)]
    pub format: Option<OutputFormat>,

    /// Decide as if the host had this many cores
    #[arg(long, value_name = "N")]
    pub cores: Option<usize>,
}

/// Machine-readable plan
#[derive(Serialize)]
struct PlanView<'a> {
    core_count: usize,
    decision: &'a StrategyDecision,
    plan: &'a ExecutionPlan,
    args: Vec<String>,
}

/// Decide and translate for the given settings
pub fn resolve(
    settings: &Settings,
    probe: &dyn CapabilityProbe,
) -> Result<(StrategyDecision, ExecutionPlan)> {
    let overrides = settings.strategy_override()?;
    let decision = StrategyDecision::probe(probe, &overrides)?;
    Ok((decision, translate(&decision)))
}

/// Print the decision the way the run announces it
pub fn announce(output: &Output, decision: &StrategyDecision, plan: &ExecutionPlan) {
    output.announce(&format!(
        "Using {} workers with {} strategy",
        decision.worker_count(),
        decision.strategy()
    ));

    if !decision.grouping_enabled() {
        return;
    }
    match plan {
        ExecutionPlan::Threaded(_) => output.announce(&format!(
            "Task grouping ({}) enabled for threading strategy",
            decision.grouping()
        )),
        ExecutionPlan::IsolatedProcess(params) => output.announce(&format!(
            "Task grouping enabled (--dist={})",
            params.distribution_mode
        )),
    }
}

pub fn execute(args: &PlanArgs, cli: &Cli, output: &Output) -> Result<()> {
    let settings = cli.settings()?;
    let format = OutputFormat::resolve(args.format, &settings)?;

    let probe: Box<dyn CapabilityProbe> = match args.cores {
        Some(cores) => Box::new(FixedProbe::new(cores)),
        None => Box::new(SystemProbe),
    };
    let core_count = probe.available_parallelism();
    let (decision, plan) = resolve(&settings, probe.as_ref())?;

    match format {
        OutputFormat::Json => {
            let view = PlanView {
                core_count,
                decision: &decision,
                plan: &plan,
                args: plan.to_args(),
            };
            println!("{}", serde_json::to_string_pretty(&view)?);
        }
        OutputFormat::Text => {
            announce(output, &decision, &plan);
            output.header("Execution plan");
            output.key_value("Cores:", &core_count.to_string(), false);
            output.key_value("Strategy:", &decision.strategy().to_string(), true);
            output.key_value("Workers:", &decision.worker_count().to_string(), true);
            output.key_value("Grouping:", &decision.grouping().to_string(), false);
            if let ExecutionPlan::IsolatedProcess(params) = &plan {
                output.key_value("Distribution:", params.distribution_mode.dist_name(), false);
                output.key_value("Backend:", &settings.backend.program, false);
            }
            // Arguments are the machine-facing part, printed even when quiet
            println!("{}", plan.to_args().join(" "));
        }
    }

    Ok(())
}

use anyhow::{Context, Result};
use clap::Args;
use serde::Serialize;
use std::path::PathBuf;

use super::Cli;
use super::plan::{OutputFormat, announce, resolve};
use crate::backend::{CommandBackend, IsolatedBackend};
use crate::cli::Output;
use crate::manifest::Manifest;
use crate::models::{Outcome, OutcomeStatus, RunReport, WorkItem};
use crate::parallel::{CancellationToken, RunProgress, ThreadedExecutor, partition};
use crate::probe::SystemProbe;
use crate::strategy::{ExecutionPlan, Strategy, ThreadedConfig};

#[derive(Args)]
pub struct RunArgs {
    /// Work manifest (TOML or JSON)
    pub manifest: PathBuf,

    /// Output format
    #[arg(long, value_enum)]
    pub format: Option<OutputFormat>,

    /// Show progress bars while items run
    #[arg(long)]
    pub progress: bool,
}

#[derive(Serialize)]
struct RunView<'a> {
    strategy: Strategy,
    worker_count: usize,
    passed: usize,
    failed: usize,
    errored: usize,
    cancelled: usize,
    pass_rate: f64,
    outcomes: &'a [Outcome],
}

pub async fn execute(args: &RunArgs, cli: &Cli, output: &Output) -> Result<()> {
    let settings = cli.settings()?;
    let format = OutputFormat::resolve(args.format, &settings)?;
    let show_progress = (args.progress || settings.output.progress) && !cli.quiet;

    let manifest = Manifest::load(&args.manifest)?;
    let items = manifest.work_items();
    let (decision, plan) = resolve(&settings, &SystemProbe)?;

    if format == OutputFormat::Text {
        output.verbose(&format!(
            "Loaded {} items from {}",
            items.len(),
            args.manifest.display()
        ));
        announce(output, &decision, &plan);
    }

    if items.is_empty() {
        output.warning("Manifest contains no items");
        return Ok(());
    }

    let report = match plan {
        ExecutionPlan::Threaded(config) => {
            if config.grouping_enabled() && format == OutputFormat::Text {
                let units = partition(&items, config.grouping).len();
                output.announce(&format!(
                    "Reordered {} items into {} {} groups for threading strategy",
                    items.len(),
                    units,
                    config.grouping
                ));
            }
            run_threaded(config, &manifest, items, show_progress).await?
        }
        ExecutionPlan::IsolatedProcess(params) => {
            let backend = CommandBackend::new(&settings.backend.program)
                .with_args(settings.backend.args.iter().cloned());
            backend.ensure_available()?;
            if format == OutputFormat::Text {
                output.info(&format!("Handing {} items to {}", items.len(), backend.name()));
            }
            backend.run(&params, &items).await?
        }
    };

    match format {
        OutputFormat::Json => {
            let view = RunView {
                strategy: decision.strategy(),
                worker_count: decision.worker_count(),
                passed: report.count(OutcomeStatus::Passed),
                failed: report.count(OutcomeStatus::Failed),
                errored: report.count(OutcomeStatus::Errored),
                cancelled: report.count(OutcomeStatus::Cancelled),
                pass_rate: report.pass_rate(),
                outcomes: report.outcomes(),
            };
            println!("{}", serde_json::to_string_pretty(&view)?);
        }
        OutputFormat::Text => output.report(&report),
    }

    if !report.all_passed() {
        std::process::exit(1);
    }
    Ok(())
}

async fn run_threaded(
    config: ThreadedConfig,
    manifest: &Manifest,
    items: Vec<WorkItem>,
    show_progress: bool,
) -> Result<RunReport> {
    let token = CancellationToken::new();
    let handler_token = token.clone();
    if let Err(e) = ctrlc::set_handler(move || {
        tracing::warn!("Interrupted, finishing items in flight");
        handler_token.cancel();
    }) {
        tracing::debug!("Could not install Ctrl-C handler: {}", e);
    }

    let progress =
        show_progress.then(|| RunProgress::new(items.len(), active_workers(&config, &items)));

    let mut executor = ThreadedExecutor::from_config(&config).with_cancellation(token);
    if let Some(progress) = &progress {
        executor = executor.with_progress(progress.reporter());
    }

    let runner = manifest.shell_runner();
    let result = tokio::task::spawn_blocking(move || {
        executor.execute(&items, |item, _worker_id| runner.run(item))
    })
    .await;

    if let Some(progress) = progress {
        progress.finish();
    }
    result.context("Threaded executor task failed")?
}

/// Threads the executor will actually start for these items
fn active_workers(config: &ThreadedConfig, items: &[WorkItem]) -> usize {
    partition(items, config.grouping).len().min(config.worker_count)
}

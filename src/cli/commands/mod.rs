use anyhow::Result;
use clap::{CommandFactory, Parser, Subcommand};

use crate::cli::Output;
use crate::config::{AppConfig, ConfigOverrides, Settings};

pub mod config;
pub mod plan;
pub mod probe;
pub mod run;

#[derive(Parser)]
#[command(
    name = "auto-concurrency",
    version = env!("CARGO_PKG_VERSION"),
    about = "Pick threaded or isolated-process execution for a batch of work items",
    long_about = "auto-concurrency decides between in-process threads and isolated worker \
                  processes based on host parallelism, sizes the worker pool, and runs \
                  items with optional task grouping."
)]
pub struct Cli {
    /// Increase verbosity (can be repeated)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Use custom configuration file
    #[arg(long, global = true)]
    pub config: Option<String>,

    /// Number of workers: "auto" or a positive integer
    #[arg(long, value_name = "auto|N", global = true)]
    pub concurrency: Option<String>,

    /// Force the threaded strategy
    #[arg(long, global = true)]
    pub multithreading: bool,

    /// Force the isolated-process strategy
    #[arg(long, global = true)]
    pub multiprocessing: bool,

    /// Keep related items on one worker (bare flag means "file")
    #[arg(
        long,
        value_name = "file|package",
        num_args = 0..=1,
        default_missing_value = "file",
        require_equals = true,
        global = true
    )]
    pub task_grouping: Option<String>,

    /// Debug logging (same as -vv)
    #[arg(long, global = true)]
    pub debug: bool,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Show the detected host parallelism
    Probe(probe::ProbeArgs),
    /// Show the strategy and parameters that would be used
    Plan(plan::PlanArgs),
    /// Run the items of a work manifest
    Run(run::RunArgs),
    /// Configuration management
    Config(config::ConfigArgs),
}

impl Cli {
    pub async fn run(self) -> Result<()> {
        let verbosity = if self.debug { self.verbose.max(2) } else { self.verbose };
        setup_logging(verbosity, self.quiet);

        let output = Output::new(verbosity > 0, self.quiet);

        match &self.command {
            Some(Commands::Probe(args)) => probe::execute(args, &output),
            Some(Commands::Plan(args)) => plan::execute(args, &self, &output),
            Some(Commands::Run(args)) => run::execute(args, &self, &output).await,
            Some(Commands::Config(args)) => config::execute(args, &self),
            None => {
                Cli::command().print_help()?;
                Ok(())
            }
        }
    }

    /// Config values carried by global flags; unset flags stay unset
    pub fn overrides(&self) -> ConfigOverrides {
        let mut overrides = ConfigOverrides::default();
        overrides.concurrency.workers = self.concurrency.clone();
        overrides.concurrency.grouping = self.task_grouping.clone();
        if self.multithreading {
            overrides.concurrency.force_threaded = Some(true);
        }
        if self.multiprocessing {
            overrides.concurrency.force_isolated_process = Some(true);
        }
        overrides
    }

    pub fn load_config(&self) -> Result<AppConfig> {
        AppConfig::load_with(self.config.as_deref(), Some(self.overrides()))
    }

    pub fn settings(&self) -> Result<Settings> {
        self.load_config()?.settings()
    }
}

fn setup_logging(verbose: u8, quiet: bool) {
    if quiet {
        return;
    }

    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        match verbose {
            0 => tracing_subscriber::EnvFilter::new("warn"),
            1 => tracing_subscriber::EnvFilter::new("info"),
            2 => tracing_subscriber::EnvFilter::new("debug"),
            _ => tracing_subscriber::EnvFilter::new("trace"),
        }
    });

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}

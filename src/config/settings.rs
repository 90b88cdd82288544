//! Typed configuration and its conversion into scheduler overrides
//!
//! Raw text (worker counts, strategy names, grouping names) is parsed here,
//! so the decision procedure only ever sees an already-parsed
//! [`StrategyOverride`].

use serde::{Deserialize, Serialize};

use crate::error::SchedulerError;
use crate::models::GroupingMode;
use crate::strategy::{StrategyChoice, StrategyOverride, WorkerRequest};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub concurrency: ConcurrencySettings,
    #[serde(default)]
    pub backend: BackendSettings,
    #[serde(default)]
    pub output: OutputSettings,
}

/// `workers` may be written as a number or as text ("auto", "4")
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum WorkersSetting {
    Count(i64),
    Text(String),
}

impl Default for WorkersSetting {
    fn default() -> Self {
        WorkersSetting::Text("auto".to_string())
    }
}

impl WorkersSetting {
    pub fn to_request(&self) -> Result<WorkerRequest, SchedulerError> {
        match self {
            WorkersSetting::Count(n) => Ok(WorkerRequest::Count(*n)),
            WorkersSetting::Text(text) => text.parse(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConcurrencySettings {
    #[serde(default)]
    pub workers: WorkersSetting,
    #[serde(default = "default_strategy")]
    pub strategy: String,
    #[serde(default)]
    pub force_threaded: bool,
    #[serde(default)]
    pub force_isolated_process: bool,
    #[serde(default = "default_grouping")]
    pub grouping: String,
}

fn default_strategy() -> String {
    "auto".to_string()
}

fn default_grouping() -> String {
    "none".to_string()
}

impl Default for ConcurrencySettings {
    fn default() -> Self {
        Self {
            workers: WorkersSetting::default(),
            strategy: default_strategy(),
            force_threaded: false,
            force_isolated_process: false,
            grouping: default_grouping(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackendSettings {
    #[serde(default = "default_backend_program")]
    pub program: String,
    #[serde(default)]
    pub args: Vec<String>,
}

fn default_backend_program() -> String {
    "pytest".to_string()
}

impl Default for BackendSettings {
    fn default() -> Self {
        Self {
            program: default_backend_program(),
            args: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputSettings {
    #[serde(default)]
    pub progress: bool,
    #[serde(default = "default_format")]
    pub format: String,
}

fn default_format() -> String {
    "text".to_string()
}

impl Default for OutputSettings {
    fn default() -> Self {
        Self {
            progress: false,
            format: default_format(),
        }
    }
}

impl Settings {
    /// Parse the concurrency section into scheduler overrides
    ///
    /// The force flags and the `strategy` key must agree; both force flags at
    /// once is rejected.
    pub fn strategy_override(&self) -> Result<StrategyOverride, SchedulerError> {
        let concurrency = &self.concurrency;

        let from_flags = StrategyChoice::from_flags(
            concurrency.force_threaded,
            concurrency.force_isolated_process,
        )?;
        let from_key: StrategyChoice = concurrency.strategy.parse()?;

        let strategy = match (from_flags, from_key) {
            (StrategyChoice::Auto, key) => key,
            (flags, StrategyChoice::Auto) => flags,
            (flags, key) if flags == key => flags,
            (flags, key) => {
                return Err(SchedulerError::invalid(format!(
                    "strategy '{}' conflicts with force flag ({:?} vs {:?})",
                    concurrency.strategy, key, flags
                )));
            }
        };

        Ok(StrategyOverride {
            strategy,
            requested_workers: Some(concurrency.workers.to_request()?),
            grouping: concurrency.grouping.parse::<GroupingMode>()?,
        })
    }
}

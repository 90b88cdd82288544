use serde::Serialize;
use std::fmt;

use super::decision::{Strategy, StrategyDecision};
use crate::models::GroupingMode;

/// How the isolated-process distributor spreads items over its workers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum DistributionMode {
    /// Any item to any worker
    PerItem,
    /// All items of one file to the same worker
    PerGroupFile,
    /// All items of one named group (package) to the same worker
    PerGroup,
}

impl DistributionMode {
    /// Distributor's own name for the mode
    pub fn dist_name(&self) -> &'static str {
        match self {
            DistributionMode::PerItem => "load",
            DistributionMode::PerGroupFile => "loadfile",
            DistributionMode::PerGroup => "loadgroup",
        }
    }
}

impl From<GroupingMode> for DistributionMode {
    fn from(mode: GroupingMode) -> Self {
        match mode {
            GroupingMode::None => DistributionMode::PerItem,
            GroupingMode::File => DistributionMode::PerGroupFile,
            GroupingMode::Package => DistributionMode::PerGroup,
        }
    }
}

impl fmt::Display for DistributionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.dist_name())
    }
}

/// Parameters handed to the external isolated-process distributor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DistributorParams {
    pub workers: usize,
    pub distribution_mode: DistributionMode,
}

impl DistributorParams {
    /// Distributor command-line arguments: `-n <workers> [--dist <mode>]`
    pub fn to_args(&self) -> Vec<String> {
        let mut args = vec!["-n".to_string(), self.workers.to_string()];
        if self.distribution_mode != DistributionMode::PerItem {
            args.push("--dist".to_string());
            args.push(self.distribution_mode.dist_name().to_string());
        }
        args
    }
}

/// Configuration for the in-process threaded executor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ThreadedConfig {
    pub worker_count: usize,
    pub grouping: GroupingMode,
}

impl ThreadedConfig {
    pub fn grouping_enabled(&self) -> bool {
        self.grouping.is_enabled()
    }

    pub fn to_args(&self) -> Vec<String> {
        vec!["--workers".to_string(), self.worker_count.to_string()]
    }
}

/// Concrete instructions for one run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "strategy", rename_all = "kebab-case")]
pub enum ExecutionPlan {
    Threaded(ThreadedConfig),
    IsolatedProcess(DistributorParams),
}

impl ExecutionPlan {
    pub fn strategy(&self) -> Strategy {
        match self {
            ExecutionPlan::Threaded(_) => Strategy::Threaded,
            ExecutionPlan::IsolatedProcess(_) => Strategy::IsolatedProcess,
        }
    }

    pub fn worker_count(&self) -> usize {
        match self {
            ExecutionPlan::Threaded(config) => config.worker_count,
            ExecutionPlan::IsolatedProcess(params) => params.workers,
        }
    }

    pub fn to_args(&self) -> Vec<String> {
        match self {
            ExecutionPlan::Threaded(config) => config.to_args(),
            ExecutionPlan::IsolatedProcess(params) => params.to_args(),
        }
    }
}

/// Turn a decision into executor configuration or distributor parameters
pub fn translate(decision: &StrategyDecision) -> ExecutionPlan {
    match decision.strategy() {
        Strategy::Threaded => ExecutionPlan::Threaded(ThreadedConfig {
            worker_count: decision.worker_count(),
            grouping: decision.grouping(),
        }),
        Strategy::IsolatedProcess => ExecutionPlan::IsolatedProcess(DistributorParams {
            workers: decision.worker_count(),
            distribution_mode: decision.grouping().into(),
        }),
    }
}

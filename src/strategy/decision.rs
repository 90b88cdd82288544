use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::SchedulerError;
use crate::models::GroupingMode;
use crate::probe::CapabilityProbe;

/// Hosts with this many cores or fewer run the threaded strategy under `Auto`
///
/// With little parallel headroom, threads sharing one process pay less
/// context-switch and memory overhead than worker processes. Past this point
/// process start-up cost is absorbed by the extra cores.
pub const THREADED_CORE_THRESHOLD: usize = 2;

/// User intent for the concurrency strategy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StrategyChoice {
    #[default]
    Auto,
    ForceThreaded,
    ForceIsolatedProcess,
}

impl StrategyChoice {
    /// Combine the two force flags; setting both is contradictory
    pub fn from_flags(force_threaded: bool, force_isolated: bool) -> Result<Self, SchedulerError> {
        match (force_threaded, force_isolated) {
            (true, true) => Err(SchedulerError::invalid(
                "--multithreading and --multiprocessing cannot be used together",
            )),
            (true, false) => Ok(StrategyChoice::ForceThreaded),
            (false, true) => Ok(StrategyChoice::ForceIsolatedProcess),
            (false, false) => Ok(StrategyChoice::Auto),
        }
    }
}

impl FromStr for StrategyChoice {
    type Err = SchedulerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "" | "auto" => Ok(StrategyChoice::Auto),
            "threaded" | "threading" | "multithreading" => Ok(StrategyChoice::ForceThreaded),
            "isolated-process" | "process" | "multiprocessing" => {
                Ok(StrategyChoice::ForceIsolatedProcess)
            }
            other => Err(SchedulerError::invalid(format!(
                "unknown strategy '{other}' (expected auto, threaded or isolated-process)"
            ))),
        }
    }
}

/// Explicit worker count request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerRequest {
    /// One worker per available core
    Auto,
    /// Literal count as given; validated by [`decide`]
    Count(i64),
}

impl FromStr for WorkerRequest {
    type Err = SchedulerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let value = s.trim();
        if value.eq_ignore_ascii_case("auto") {
            return Ok(WorkerRequest::Auto);
        }
        value
            .parse::<i64>()
            .map(WorkerRequest::Count)
            .map_err(|_| SchedulerError::invalid(format!("invalid --concurrency value: {value}")))
    }
}

impl fmt::Display for WorkerRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WorkerRequest::Auto => f.write_str("auto"),
            WorkerRequest::Count(n) => write!(f, "{n}"),
        }
    }
}

/// Already-parsed user overrides fed into the decision
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StrategyOverride {
    pub strategy: StrategyChoice,
    pub requested_workers: Option<WorkerRequest>,
    pub grouping: GroupingMode,
}

/// Concrete concurrency strategy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Strategy {
    Threaded,
    IsolatedProcess,
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Strategy::Threaded => f.write_str("threading"),
            Strategy::IsolatedProcess => f.write_str("multiprocessing"),
        }
    }
}

/// Outcome of the decision procedure, fixed for the whole run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StrategyDecision {
    strategy: Strategy,
    worker_count: usize,
    grouping: GroupingMode,
}

impl StrategyDecision {
    pub fn strategy(&self) -> Strategy {
        self.strategy
    }

    pub fn worker_count(&self) -> usize {
        self.worker_count
    }

    pub fn grouping(&self) -> GroupingMode {
        self.grouping
    }

    pub fn grouping_enabled(&self) -> bool {
        self.grouping.is_enabled()
    }

    /// Decide using a live capability reading
    pub fn probe(
        probe: &dyn CapabilityProbe,
        overrides: &StrategyOverride,
    ) -> Result<Self, SchedulerError> {
        decide(probe.available_parallelism(), overrides)
    }
}

/// Map host capability and overrides to a strategy, worker count and grouping
///
/// Precedence: `ForceThreaded`, then `ForceIsolatedProcess`, then the core
/// count threshold. Invalid worker requests fail before anything is decided.
pub fn decide(
    core_count: usize,
    overrides: &StrategyOverride,
) -> Result<StrategyDecision, SchedulerError> {
    let core_count = core_count.max(1);

    let worker_count = match overrides.requested_workers {
        None | Some(WorkerRequest::Auto) => core_count,
        Some(WorkerRequest::Count(n)) if n > 0 => usize::try_from(n).map_err(|_| {
            SchedulerError::invalid(format!("worker count {n} is out of range"))
        })?,
        Some(WorkerRequest::Count(n)) => {
            return Err(SchedulerError::invalid(format!(
                "worker count must be a positive integer, got {n}"
            )));
        }
    };

    let strategy = match overrides.strategy {
        StrategyChoice::ForceThreaded => Strategy::Threaded,
        StrategyChoice::ForceIsolatedProcess => Strategy::IsolatedProcess,
        StrategyChoice::Auto if core_count <= THREADED_CORE_THRESHOLD => Strategy::Threaded,
        StrategyChoice::Auto => Strategy::IsolatedProcess,
    };

    let decision = StrategyDecision {
        strategy,
        worker_count: worker_count.max(1),
        grouping: overrides.grouping,
    };

    tracing::debug!(
        "Decided {} strategy with {} workers (cores: {}, choice: {:?}, grouping: {})",
        decision.strategy,
        decision.worker_count,
        core_count,
        overrides.strategy,
        decision.grouping
    );

    Ok(decision)
}

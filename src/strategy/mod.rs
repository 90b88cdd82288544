//! Strategy selection and parameter translation
//!
//! The decision procedure combines the host's parallelism with user overrides
//! into a [`StrategyDecision`]; the translator turns that decision into either
//! a [`ThreadedConfig`] for the in-process executor or [`DistributorParams`]
//! for the external isolated-process distributor.
//!
//! ```rust
//! use auto_concurrency::strategy::{decide, translate, ExecutionPlan, StrategyOverride};
//!
//! let decision = decide(8, &StrategyOverride::default())?;
//! match translate(&decision) {
//!     ExecutionPlan::IsolatedProcess(params) => assert_eq!(params.to_args(), vec!["-n", "8"]),
//!     ExecutionPlan::Threaded(_) => unreachable!(),
//! }
//! # Ok::<(), auto_concurrency::SchedulerError>(())
//! ```

pub mod decision;
pub mod translate;

pub use decision::{
    Strategy, StrategyChoice, StrategyDecision, StrategyOverride, THREADED_CORE_THRESHOLD,
    WorkerRequest, decide,
};
pub use translate::{DistributionMode, DistributorParams, ExecutionPlan, ThreadedConfig, translate};

//! # auto-concurrency
//!
//! Chooses between two ways of running a batch of already-enumerated work
//! items: a pool of threads inside this process, or an external distributor
//! running items in isolated worker processes.
//!
//! - [`probe`] reads how many cores the host offers.
//! - [`strategy`] decides the strategy and worker count and translates the
//!   decision into executor configuration or distributor arguments.
//! - [`parallel`] is the threaded executor, with optional task grouping.
//! - [`backend`] hands items to the isolated-process distributor.
//!
//! ```rust
//! use auto_concurrency::models::{Verdict, WorkItem};
//! use auto_concurrency::parallel::ThreadedExecutor;
//! use auto_concurrency::strategy::{decide, translate, ExecutionPlan, StrategyOverride};
//!
//! let decision = decide(2, &StrategyOverride::default())?;
//! let ExecutionPlan::Threaded(config) = translate(&decision) else {
//!     unreachable!("two cores always run threaded");
//! };
//!
//! let items = vec![WorkItem::new("a"), WorkItem::new("b")];
//! let report = ThreadedExecutor::from_config(&config)
//!     .execute(&items, |_item, _worker| Ok(Verdict::Passed))?;
//! assert!(report.all_passed());
//! # Ok::<(), anyhow::Error>(())
//! ```

pub mod backend;
pub mod cli;
pub mod config;
pub mod error;
pub mod manifest;
pub mod models;
pub mod parallel;
pub mod probe;
pub mod strategy;

pub use error::SchedulerError;

/// Result type alias for scheduler operations
pub type Result<T> = anyhow::Result<T>;

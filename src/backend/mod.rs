//! Isolated-process backend
//!
//! When the decision picks the isolated-process strategy, items are handed to
//! an external distributor together with [`DistributorParams`]. The
//! distributor partitions and runs them in its own worker processes; its
//! scheduling is opaque to us. If it cannot be invoked the run fails with
//! `BackendUnavailable` rather than falling back to threads.

pub mod command;

use anyhow::Result;
use std::future::Future;

use crate::error::SchedulerError;
use crate::models::{RunReport, WorkItem};
use crate::strategy::DistributorParams;

pub use command::CommandBackend;

/// External distributor trusted to run items in separate processes
pub trait IsolatedBackend: Send + Sync {
    /// Name used in diagnostics
    fn name(&self) -> &str;

    /// Fail with `BackendUnavailable` if the backend cannot be invoked
    fn ensure_available(&self) -> Result<(), SchedulerError>;

    /// Run all items under `params` and return one outcome per item in
    /// submission order
    fn run(
        &self,
        params: &DistributorParams,
        items: &[WorkItem],
    ) -> impl Future<Output = Result<RunReport>> + Send;
}

//! Threaded execution of work items
//!
//! This module owns the in-process half of the scheduler: everything needed to
//! run a batch of items on a fixed pool of OS threads sharing one process.
//!
//! # Pieces
//!
//! - [`partition`] buckets items into [`DispatchUnit`]s. Without grouping each
//!   item is its own unit; with grouping all items sharing a key form one unit,
//!   ordered by the key's first occurrence.
//! - [`ThreadedExecutor`] feeds those units through a per-run FIFO queue to
//!   `worker_count` threads. Workers pull the next unit as soon as they finish
//!   one, and run a unit's items strictly in order.
//! - [`ResultAggregator`] collects outcomes into pre-sized slots indexed by
//!   submission position, so the report comes back in submission order no
//!   matter which worker finished first.
//! - [`CancellationToken`] stops dispatch of new units; units in flight drain
//!   and never-started items are reported as `Cancelled`.
//!
//! # Fault containment
//!
//! Threads share memory, so the executor itself contains faults: an `Err` or
//! a panic from an item's runner becomes an `Errored` outcome for that item and
//! the worker carries on with the rest of its unit.
//!
//! # Example
//!
//! ```rust
//! use auto_concurrency::models::{GroupingMode, Verdict, WorkItem};
//! use auto_concurrency::parallel::ThreadedExecutor;
//!
//! let items = vec![
//!     WorkItem::new("tests/test_db.py::test_create"),
//!     WorkItem::new("tests/test_db.py::test_update"),
//!     WorkItem::new("tests/test_api.py::test_get"),
//! ];
//!
//! let report = ThreadedExecutor::new(2)
//!     .with_grouping(GroupingMode::File)
//!     .execute(&items, |_item, _worker_id| Ok(Verdict::Passed))?;
//!
//! assert_eq!(report.len(), 3);
//! assert!(report.all_passed());
//! # Ok::<(), anyhow::Error>(())
//! ```

pub mod aggregate;
pub mod cancel;
pub mod core;
pub mod partition;
pub mod progress;

pub use aggregate::ResultAggregator;
pub use cancel::CancellationToken;
pub use self::core::{ProgressFn, ThreadedExecutor};
pub use partition::{DispatchUnit, partition};
pub use progress::RunProgress;

//! Data model shared by the scheduler, the backend and the CLI

pub mod item;
pub mod outcome;

pub use item::{GroupingMode, ResolvedGroup, WorkItem};
pub use outcome::{Outcome, OutcomeStatus, RunReport, Verdict};

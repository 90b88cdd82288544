//! Order-preserving result collection
//!
//! Every item owns one pre-sized slot indexed by its submission position.
//! Workers fill slots as items finish, in any order; each slot is written at
//! most once, so the store needs no lock and no sort afterwards.

use std::sync::OnceLock;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::models::{Outcome, RunReport, WorkItem};

/// Thread-safe accumulation point for one run's outcomes
#[derive(Debug)]
pub struct ResultAggregator {
    slots: Vec<OnceLock<Outcome>>,
    completed: AtomicUsize,
}

impl ResultAggregator {
    pub fn new(total_items: usize) -> Self {
        Self {
            slots: (0..total_items).map(|_| OnceLock::new()).collect(),
            completed: AtomicUsize::new(0),
        }
    }

    /// Store the outcome for the item at `position`
    ///
    /// Returns the number of outcomes recorded so far. A second outcome for
    /// the same position is dropped; outcomes are never overwritten.
    pub fn record(&self, position: usize, outcome: Outcome) -> usize {
        let Some(slot) = self.slots.get(position) else {
            tracing::warn!("Dropping outcome for out-of-range position {}", position);
            return self.completed();
        };

        match slot.set(outcome) {
            Ok(()) => self.completed.fetch_add(1, Ordering::AcqRel) + 1,
            Err(duplicate) => {
                tracing::warn!(
                    "Ignoring duplicate outcome for item '{}' at position {}",
                    duplicate.item_id,
                    position
                );
                self.completed()
            }
        }
    }

    pub fn completed(&self) -> usize {
        self.completed.load(Ordering::Acquire)
    }

    pub fn total(&self) -> usize {
        self.slots.len()
    }

    /// Build the report in submission order; empty slots become `Cancelled`
    pub fn into_report(self, items: &[WorkItem]) -> RunReport {
        let outcomes = self
            .slots
            .into_iter()
            .zip(items)
            .map(|(slot, item)| {
                slot.into_inner()
                    .unwrap_or_else(|| Outcome::cancelled(item.id.clone()))
            })
            .collect();
        RunReport::from_ordered(outcomes)
    }
}

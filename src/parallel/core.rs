use anyhow::Result;
use crossbeam::channel::{Receiver, unbounded};
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::time::Instant;

use super::aggregate::ResultAggregator;
use super::cancel::CancellationToken;
use super::partition::{DispatchUnit, partition};
use crate::error::SchedulerError;
use crate::models::{GroupingMode, Outcome, RunReport, Verdict, WorkItem};
use crate::strategy::ThreadedConfig;

/// Progress callback: (completed, total, worker_id)
pub type ProgressFn = Arc<dyn Fn(usize, usize, usize) + Send + Sync>;

/// FIFO of dispatch units owned by a single `execute` call
///
/// Filled once up front and closed, so an empty, closed queue is the signal
/// for workers to exit. Waiting on it blocks instead of spinning.
struct ReadyQueue {
    units: Receiver<DispatchUnit>,
}

impl ReadyQueue {
    fn new(units: Vec<DispatchUnit>) -> Self {
        let (tx, rx) = unbounded();
        for unit in units {
            // Receiver is alive in this scope, send cannot fail
            let _ = tx.send(unit);
        }
        Self { units: rx }
    }

    fn next(&self, cancellation: Option<&CancellationToken>) -> Option<DispatchUnit> {
        if cancellation.is_some_and(CancellationToken::is_cancelled) {
            return None;
        }
        self.units.recv().ok()
    }

    fn remaining(&self) -> usize {
        self.units.len()
    }
}

/// Context for worker threads to avoid too many function parameters
struct WorkerContext<'a, F> {
    worker_id: usize,
    items: &'a [WorkItem],
    queue: &'a ReadyQueue,
    aggregator: &'a ResultAggregator,
    runner: &'a F,
    cancellation: Option<&'a CancellationToken>,
    progress: Option<&'a ProgressFn>,
}

/// In-process scheduler running dispatch units on a fixed pool of OS threads
///
/// Workers pull units from a shared queue, so a worker that finishes a small
/// unit immediately takes the next one. Items of one unit run strictly in
/// order on one worker. A fault in one item is contained to that item.
#[derive(Clone)]
pub struct ThreadedExecutor {
    worker_count: usize,
    grouping: GroupingMode,
    cancellation: Option<CancellationToken>,
    progress: Option<ProgressFn>,
}

impl ThreadedExecutor {
    pub fn new(worker_count: usize) -> Self {
        Self {
            worker_count: worker_count.max(1),
            grouping: GroupingMode::None,
            cancellation: None,
            progress: None,
        }
    }

    pub fn from_config(config: &ThreadedConfig) -> Self {
        Self::new(config.worker_count).with_grouping(config.grouping)
    }

    pub fn with_grouping(mut self, grouping: GroupingMode) -> Self {
        self.grouping = grouping;
        self
    }

    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = Some(token);
        self
    }

    pub fn with_progress<P>(mut self, reporter: P) -> Self
    where
        P: Fn(usize, usize, usize) + Send + Sync + 'static,
    {
        self.progress = Some(Arc::new(reporter));
        self
    }

    pub fn worker_count(&self) -> usize {
        self.worker_count
    }

    pub fn grouping(&self) -> GroupingMode {
        self.grouping
    }

    /// Execute every item and block until each has exactly one outcome
    ///
    /// `runner` receives the item and the id of the worker running it. An
    /// `Err` or a panic from `runner` becomes an `Errored` outcome for that
    /// item only. The report is in submission order.
    pub fn execute<F>(&self, items: &[WorkItem], runner: F) -> Result<RunReport>
    where
        F: Fn(&WorkItem, usize) -> Result<Verdict> + Sync,
    {
        if items.is_empty() {
            return Ok(RunReport::default());
        }

        let units = partition(items, self.grouping);
        let actual_workers = std::cmp::min(self.worker_count, units.len());
        let start = Instant::now();

        tracing::info!(
            "Running {} items as {} units on {} worker threads",
            items.len(),
            units.len(),
            actual_workers
        );

        let queue = ReadyQueue::new(units);
        let aggregator = ResultAggregator::new(items.len());

        crossbeam::thread::scope(|s| {
            for worker_id in 0..actual_workers {
                let ctx = WorkerContext {
                    worker_id,
                    items,
                    queue: &queue,
                    aggregator: &aggregator,
                    runner: &runner,
                    cancellation: self.cancellation.as_ref(),
                    progress: self.progress.as_ref(),
                };
                s.spawn(move |_| worker_loop(ctx));
            }
        })
        .map_err(|_| anyhow::anyhow!("Worker thread panic occurred during threaded execution"))?;

        if queue.remaining() > 0 {
            tracing::warn!(
                "Run cancelled with {} dispatch units never started",
                queue.remaining()
            );
        }

        let report = aggregator.into_report(items);
        tracing::info!(
            "Threaded execution completed in {}ms - {}",
            start.elapsed().as_millis(),
            report.summary()
        );

        Ok(report)
    }
}

impl Default for ThreadedExecutor {
    fn default() -> Self {
        Self::new(1)
    }
}

impl std::fmt::Debug for ThreadedExecutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ThreadedExecutor")
            .field("worker_count", &self.worker_count)
            .field("grouping", &self.grouping)
            .field("cancellable", &self.cancellation.is_some())
            .field("progress", &self.progress.is_some())
            .finish()
    }
}

fn worker_loop<F>(ctx: WorkerContext<'_, F>)
where
    F: Fn(&WorkItem, usize) -> Result<Verdict> + Sync,
{
    let mut units_run = 0usize;

    while let Some(unit) = ctx.queue.next(ctx.cancellation) {
        if let Some(key) = unit.group_key() {
            tracing::debug!(
                "Worker {} took group '{}' ({} items)",
                ctx.worker_id,
                key,
                unit.len()
            );
        }

        for &position in unit.positions() {
            let item = &ctx.items[position];
            let outcome = run_item(item, ctx.worker_id, ctx.runner);
            let completed = ctx.aggregator.record(position, outcome);

            if let Some(reporter) = ctx.progress {
                report_progress(reporter, completed, ctx.aggregator.total(), ctx.worker_id);
            }
        }
        units_run += 1;
    }

    tracing::debug!("Worker {} exiting after {} units", ctx.worker_id, units_run);
}

/// A panicking progress callback must not take the worker down with it
fn report_progress(reporter: &ProgressFn, completed: usize, total: usize, worker_id: usize) {
    let result = panic::catch_unwind(AssertUnwindSafe(|| reporter(completed, total, worker_id)));
    if let Err(payload) = result {
        tracing::warn!(
            "Progress callback on worker {} {}",
            worker_id,
            panic_message(payload.as_ref())
        );
    }
}

/// Run one item, containing any fault at the item boundary
fn run_item<F>(item: &WorkItem, worker_id: usize, runner: &F) -> Outcome
where
    F: Fn(&WorkItem, usize) -> Result<Verdict>,
{
    let start = Instant::now();
    let result = panic::catch_unwind(AssertUnwindSafe(|| runner(item, worker_id)));
    let duration_ms = start.elapsed().as_millis() as u64;

    match result {
        Ok(Ok(verdict)) => Outcome::from_verdict(item.id.clone(), duration_ms, verdict),
        Ok(Err(e)) => contained(item, duration_ms, format!("{e:#}")),
        Err(payload) => contained(item, duration_ms, panic_message(payload.as_ref())),
    }
}

fn contained(item: &WorkItem, duration_ms: u64, message: String) -> Outcome {
    let error = SchedulerError::ItemExecution {
        item_id: item.id.clone(),
        message: message.clone(),
    };
    tracing::warn!("{}", error);
    Outcome::errored(item.id.clone(), duration_ms, message)
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        format!("panicked: {message}")
    } else if let Some(message) = payload.downcast_ref::<String>() {
        format!("panicked: {message}")
    } else {
        "panicked with a non-string payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{OutcomeStatus, ResolvedGroup};
    use std::collections::HashMap;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    fn numbered(n: usize) -> Vec<WorkItem> {
        (1..=n).map(|i| WorkItem::new(i.to_string())).collect()
    }

    fn ids(report: &RunReport) -> Vec<String> {
        report.iter().map(|o| o.item_id.clone()).collect()
    }

    #[test]
    fn test_empty_input_spawns_nothing() {
        let calls = AtomicUsize::new(0);
        let report = ThreadedExecutor::new(4)
            .execute(&[], |_, _| {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok(Verdict::Passed)
            })
            .unwrap();
        assert!(report.is_empty());
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_report_preserves_submission_order() {
        let items = numbered(40);
        for workers in [1, 2, 3, 8] {
            let report = ThreadedExecutor::new(workers)
                .execute(&items, |item, _| {
                    // Later items finish first
                    let n: u64 = item.id.parse()?;
                    std::thread::sleep(Duration::from_millis((40 - n) / 8));
                    Ok(Verdict::Passed)
                })
                .unwrap();
            assert_eq!(report.len(), items.len());
            let expected: Vec<String> = items.iter().map(|i| i.id.clone()).collect();
            assert_eq!(ids(&report), expected, "workers = {workers}");
        }
    }

    #[test]
    fn test_grouped_scenario() {
        let items = vec![
            WorkItem::new("1"),
            WorkItem::new("2").with_group("fileA"),
            WorkItem::new("3"),
            WorkItem::new("4").with_group("fileA"),
            WorkItem::new("5"),
        ];
        let trace: Mutex<Vec<(usize, String)>> = Mutex::new(Vec::new());

        let report = ThreadedExecutor::new(2)
            .with_grouping(GroupingMode::File)
            .execute(&items, |item, worker| {
                trace.lock().unwrap().push((worker, item.id.clone()));
                Ok(Verdict::Passed)
            })
            .unwrap();

        assert_eq!(ids(&report), vec!["1", "2", "3", "4", "5"]);
        let trace = trace.into_inner().unwrap();
        let worker_of = |id: &str| trace.iter().find(|(_, i)| i == id).map(|(w, _)| *w);
        assert_eq!(worker_of("2"), worker_of("4"));

        let pos = |id: &str| trace.iter().position(|(_, i)| i == id).unwrap();
        assert!(pos("2") < pos("4"));
    }

    #[test]
    fn test_groups_never_interleave_on_a_worker() {
        let items: Vec<WorkItem> = (0..30)
            .map(|i| WorkItem::new(format!("tests/test_{}.py::case_{i}", i % 5)))
            .collect();
        let traces: Mutex<HashMap<usize, Vec<String>>> = Mutex::new(HashMap::new());

        ThreadedExecutor::new(3)
            .with_grouping(GroupingMode::File)
            .execute(&items, |item, worker| {
                let group = item
                    .resolve_group_key(GroupingMode::File)
                    .map(ResolvedGroup::into_key)
                    .unwrap_or_default();
                traces.lock().unwrap().entry(worker).or_default().push(group);
                std::thread::sleep(Duration::from_millis(1));
                Ok(Verdict::Passed)
            })
            .unwrap();

        let traces = traces.into_inner().unwrap();
        let mut owner: HashMap<String, usize> = HashMap::new();
        for (worker, groups) in &traces {
            let mut closed: Vec<&String> = Vec::new();
            for (i, group) in groups.iter().enumerate() {
                if i > 0 && &groups[i - 1] != group {
                    closed.push(&groups[i - 1]);
                }
                assert!(!closed.contains(&group), "group {group} resumed on worker {worker}");
                let previous = owner.insert(group.clone(), *worker);
                assert!(previous.is_none() || previous == Some(*worker));
            }
        }
        assert_eq!(owner.len(), 5);
    }

    #[test]
    fn test_group_items_never_overlap() {
        let items: Vec<WorkItem> = (0..12)
            .map(|i| WorkItem::new(format!("case-{i}")).with_group(format!("g{}", i % 2)))
            .collect();
        let active: Mutex<HashMap<String, usize>> = Mutex::new(HashMap::new());
        let overlap = AtomicUsize::new(0);

        ThreadedExecutor::new(4)
            .with_grouping(GroupingMode::File)
            .execute(&items, |item, _| {
                let key = item.group_key().unwrap_or_default().to_string();
                {
                    let mut active = active.lock().unwrap();
                    let count = active.entry(key.clone()).or_default();
                    *count += 1;
                    if *count > 1 {
                        overlap.fetch_add(1, Ordering::SeqCst);
                    }
                }
                std::thread::sleep(Duration::from_millis(5));
                *active.lock().unwrap().get_mut(&key).unwrap() -= 1;
                Ok(Verdict::Passed)
            })
            .unwrap();

        assert_eq!(overlap.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_workers_run_concurrently() {
        let items = numbered(4);
        let active = AtomicUsize::new(0);
        let peak = AtomicUsize::new(0);

        ThreadedExecutor::new(2)
            .execute(&items, |_, _| {
                let now = active.fetch_add(1, Ordering::SeqCst) + 1;
                peak.fetch_max(now, Ordering::SeqCst);
                std::thread::sleep(Duration::from_millis(100));
                active.fetch_sub(1, Ordering::SeqCst);
                Ok(Verdict::Passed)
            })
            .unwrap();

        assert_eq!(peak.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_fault_is_contained_to_one_item() {
        let items = vec![
            WorkItem::new("a").with_group("g"),
            WorkItem::new("b").with_group("g"),
            WorkItem::new("c").with_group("g"),
            WorkItem::new("d"),
        ];

        let report = ThreadedExecutor::new(2)
            .with_grouping(GroupingMode::File)
            .execute(&items, |item, _| {
                if item.id == "b" {
                    panic!("fixture exploded");
                }
                Ok(Verdict::Passed)
            })
            .unwrap();

        assert_eq!(report.len(), 4);
        assert_eq!(report.count(OutcomeStatus::Errored), 1);
        let errored = report.get(1).unwrap();
        assert_eq!(errored.status, OutcomeStatus::Errored);
        assert!(errored.detail.as_deref().unwrap().contains("fixture exploded"));
        for index in [0, 2, 3] {
            assert_eq!(report.get(index).unwrap().status, OutcomeStatus::Passed);
        }
    }

    #[test]
    fn test_err_and_failure_are_distinct() {
        let items = numbered(3);
        let report = ThreadedExecutor::new(2)
            .execute(&items, |item, _| match item.id.as_str() {
                "1" => Ok(Verdict::Passed),
                "2" => Ok(Verdict::Failed("assert 1 == 2".to_string())),
                _ => Err(anyhow::anyhow!("could not start")),
            })
            .unwrap();

        let statuses: Vec<OutcomeStatus> = report.iter().map(|o| o.status).collect();
        assert_eq!(
            statuses,
            vec![OutcomeStatus::Passed, OutcomeStatus::Failed, OutcomeStatus::Errored]
        );
        assert_eq!(report.get(2).unwrap().detail.as_deref(), Some("could not start"));
    }

    #[test]
    fn test_excess_workers_match_exact_workers() {
        let items = vec![
            WorkItem::new("1"),
            WorkItem::new("2").with_group("fileA"),
            WorkItem::new("3"),
            WorkItem::new("4").with_group("fileA"),
        ];
        let run = |workers: usize| {
            ThreadedExecutor::new(workers)
                .with_grouping(GroupingMode::File)
                .execute(&items, |item, _| {
                    if item.id == "3" {
                        Ok(Verdict::Failed("expected".to_string()))
                    } else {
                        Ok(Verdict::Passed)
                    }
                })
                .unwrap()
        };

        let strip = |report: RunReport| -> Vec<(String, OutcomeStatus, Option<String>)> {
            report
                .iter()
                .map(|o| (o.item_id.clone(), o.status, o.detail.clone()))
                .collect()
        };
        assert_eq!(strip(run(3)), strip(run(16)));
    }

    #[test]
    fn test_cancelled_before_start() {
        let token = CancellationToken::new();
        token.cancel();
        let calls = AtomicUsize::new(0);

        let report = ThreadedExecutor::new(2)
            .with_cancellation(token)
            .execute(&numbered(5), |_, _| {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok(Verdict::Passed)
            })
            .unwrap();

        assert_eq!(calls.load(Ordering::SeqCst), 0);
        assert_eq!(report.len(), 5);
        assert_eq!(report.count(OutcomeStatus::Cancelled), 5);
    }

    #[test]
    fn test_cancellation_drains_in_flight_unit() {
        let items = vec![
            WorkItem::new("a").with_group("g"),
            WorkItem::new("b").with_group("g"),
            WorkItem::new("c"),
            WorkItem::new("d"),
        ];
        let token = CancellationToken::new();
        let trigger = token.clone();

        let report = ThreadedExecutor::new(1)
            .with_grouping(GroupingMode::File)
            .with_cancellation(token)
            .execute(&items, |item, _| {
                if item.id == "a" {
                    trigger.cancel();
                }
                Ok(Verdict::Passed)
            })
            .unwrap();

        let statuses: Vec<OutcomeStatus> = report.iter().map(|o| o.status).collect();
        assert_eq!(
            statuses,
            vec![
                OutcomeStatus::Passed,
                OutcomeStatus::Passed,
                OutcomeStatus::Cancelled,
                OutcomeStatus::Cancelled,
            ]
        );
    }

    #[test]
    fn test_progress_reports_every_item() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();

        ThreadedExecutor::new(3)
            .with_progress(move |completed, total, _worker| {
                sink.lock().unwrap().push((completed, total));
            })
            .execute(&numbered(7), |_, _| Ok(Verdict::Passed))
            .unwrap();

        let mut seen = seen.lock().unwrap().clone();
        seen.sort_unstable();
        assert_eq!(seen.len(), 7);
        assert_eq!(seen.last(), Some(&(7, 7)));
    }

    #[test]
    fn test_panicking_progress_callback_keeps_outcomes() {
        let report = ThreadedExecutor::new(2)
            .with_progress(|completed, _total, _worker| {
                if completed == 2 {
                    panic!("progress display broke");
                }
            })
            .execute(&numbered(5), |_, _| Ok(Verdict::Passed))
            .unwrap();

        assert_eq!(report.len(), 5);
        assert!(report.all_passed());
    }

    #[test]
    fn test_from_config() {
        let executor = ThreadedExecutor::from_config(&ThreadedConfig {
            worker_count: 0,
            grouping: GroupingMode::Package,
        });
        assert_eq!(executor.worker_count(), 1);
        assert_eq!(executor.grouping(), GroupingMode::Package);
    }
}

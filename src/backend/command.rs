use anyhow::{Context, Result};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::PathBuf;
use std::process::Stdio;
use std::time::Instant;
use tokio::process::Command;

use super::IsolatedBackend;
use crate::error::SchedulerError;
use crate::models::{Outcome, OutcomeStatus, RunReport, WorkItem};
use crate::strategy::DistributorParams;

/// Detail attached to items the backend never reported on
pub const MISSING_OUTCOME: &str = "no outcome reported by backend";

/// One outcome line on the backend's stdout
#[derive(Debug, Deserialize)]
struct BackendRecord {
    item_id: String,
    status: OutcomeStatus,
    #[serde(default)]
    detail: Option<String>,
    #[serde(default)]
    duration_ms: Option<u64>,
}

/// Distributor invoked as an external command
///
/// Runs `program [args] <distributor args> <item ids...>` and reads one JSON
/// object per stdout line: `{"item_id": .., "status": .., "detail": ..}`.
/// Lines that are not outcome records are ignored.
#[derive(Debug, Clone)]
pub struct CommandBackend {
    program: String,
    args: Vec<String>,
}

impl CommandBackend {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }

    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args = args.into_iter().map(Into::into).collect();
        self
    }

    /// Full argument list for one invocation
    pub fn command_line(&self, params: &DistributorParams, items: &[WorkItem]) -> Vec<String> {
        let mut line = self.args.clone();
        line.extend(params.to_args());
        line.extend(items.iter().map(|item| item.id.clone()));
        line
    }

    fn resolve(&self) -> Result<PathBuf, SchedulerError> {
        which::which(&self.program).map_err(|e| {
            SchedulerError::backend_unavailable(&self.program, format!("not found on PATH ({e})"))
        })
    }
}

impl IsolatedBackend for CommandBackend {
    fn name(&self) -> &str {
        &self.program
    }

    fn ensure_available(&self) -> Result<(), SchedulerError> {
        self.resolve().map(|path| {
            tracing::debug!("Isolated-process backend resolved to {}", path.display());
        })
    }

    async fn run(&self, params: &DistributorParams, items: &[WorkItem]) -> Result<RunReport> {
        let program = self.resolve()?;
        let args = self.command_line(params, items);

        tracing::info!(
            "Handing {} items to {} ({})",
            items.len(),
            self.program,
            params.to_args().join(" ")
        );
        tracing::debug!("Backend command: {} {}", program.display(), args.join(" "));

        let start = Instant::now();
        let output = Command::new(&program)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await
            .map_err(|e| SchedulerError::backend_unavailable(&self.program, e.to_string()))?;

        let stdout = String::from_utf8(output.stdout)
            .with_context(|| format!("Backend '{}' produced non UTF-8 output", self.program))?;

        if !output.status.success() {
            tracing::info!(
                "Backend '{}' exited with {} after {}ms",
                self.program,
                output.status,
                start.elapsed().as_millis()
            );
            let stderr = String::from_utf8_lossy(&output.stderr);
            if !stderr.trim().is_empty() {
                tracing::debug!("Backend stderr: {}", stderr.trim());
            }
        }

        Ok(collect_outcomes(items, &stdout))
    }
}

/// Map backend outcome lines onto the submitted items, in submission order
pub fn collect_outcomes(items: &[WorkItem], stdout: &str) -> RunReport {
    let positions: HashMap<&str, usize> = items
        .iter()
        .enumerate()
        .map(|(position, item)| (item.id.as_str(), position))
        .collect();
    let mut slots: Vec<Option<Outcome>> = vec![None; items.len()];

    for line in stdout.lines().map(str::trim).filter(|l| l.starts_with('{')) {
        let record: BackendRecord = match serde_json::from_str(line) {
            Ok(record) => record,
            Err(e) => {
                tracing::trace!("Skipping backend line ({}): {}", e, line);
                continue;
            }
        };

        let Some(&position) = positions.get(record.item_id.as_str()) else {
            tracing::warn!("Backend reported unknown item '{}'", record.item_id);
            continue;
        };

        if slots[position].is_some() {
            tracing::warn!("Backend reported '{}' more than once", record.item_id);
            continue;
        }

        slots[position] = Some(Outcome {
            item_id: record.item_id,
            status: record.status,
            detail: record.detail,
            duration_ms: record.duration_ms.unwrap_or_default(),
        });
    }

    let outcomes = slots
        .into_iter()
        .zip(items)
        .map(|(slot, item)| {
            slot.unwrap_or_else(|| Outcome::errored(item.id.clone(), 0, MISSING_OUTCOME))
        })
        .collect();
    RunReport::from_ordered(outcomes)
}

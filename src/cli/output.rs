//! Styled terminal output for the command-line interface
//!
//! Messages go through one handler so `--quiet` is honored everywhere.
//! Errors are always printed.

use console::style;

use crate::models::{Outcome, OutcomeStatus, RunReport};

/// Prefix carried by decision announcements
pub const BANNER: &str = "[AUTO-CONCURRENCY]";

/// Output handler for consistent CLI formatting
pub struct Output {
    verbose: bool,
    quiet: bool,
}

impl Output {
    pub fn new(verbose: bool, quiet: bool) -> Self {
        Self { verbose, quiet }
    }

    pub fn success(&self, message: &str) {
        if !self.quiet {
            println!("{} {}", style("✔").green(), message);
        }
    }

    pub fn error(&self, message: &str) {
        eprintln!("{} {}", style("✖").red(), message);
    }

    pub fn warning(&self, message: &str) {
        if !self.quiet {
            println!("{} {}", style("⚠").yellow(), message);
        }
    }

    pub fn info(&self, message: &str) {
        if !self.quiet {
            println!("{} {}", style("ℹ").blue(), message);
        }
    }

    /// Only printed with `-v`
    pub fn verbose(&self, message: &str) {
        if self.verbose && !self.quiet {
            println!("{} {}", style("ℹ").dim(), style(message).dim());
        }
    }

    /// Decision announcement, e.g. `[AUTO-CONCURRENCY] Using 4 workers with threading strategy`
    pub fn announce(&self, message: &str) {
        if !self.quiet {
            println!("{} {}", style(BANNER).cyan().bold(), message);
        }
    }

    pub fn header(&self, title: &str) {
        if !self.quiet {
            println!("\n{}", style(title).bold().underlined());
        }
    }

    pub fn key_value(&self, key: &str, value: &str, highlight: bool) {
        if !self.quiet {
            let styled_value = if highlight {
                style(value).green().bold()
            } else {
                style(value).white()
            };
            println!("  {:<20} {}", style(key).dim(), styled_value);
        }
    }

    /// One line per item; passing items only in verbose mode
    pub fn outcome(&self, outcome: &Outcome) {
        if self.quiet || (outcome.is_passed() && !self.verbose) {
            return;
        }

        let status = match outcome.status {
            OutcomeStatus::Passed => style(outcome.status.to_string()).green().bold(),
            OutcomeStatus::Failed => style(outcome.status.to_string()).red().bold(),
            OutcomeStatus::Errored => style(outcome.status.to_string()).magenta().bold(),
            OutcomeStatus::Cancelled => style(outcome.status.to_string()).yellow().bold(),
        };

        match &outcome.detail {
            Some(detail) => println!(
                "{} {:<9} {} {}",
                style(outcome.status.symbol()).bold(),
                status,
                outcome.item_id,
                style(format!("({detail})")).dim()
            ),
            None => println!(
                "{} {:<9} {}",
                style(outcome.status.symbol()).bold(),
                status,
                outcome.item_id
            ),
        }
    }

    /// Per-item lines followed by the summary; a failing summary always prints
    pub fn report(&self, report: &RunReport) {
        for outcome in report {
            self.outcome(outcome);
        }

        if report.all_passed() {
            self.success(&report.summary());
        } else {
            self.error(&report.summary());
        }
    }
}

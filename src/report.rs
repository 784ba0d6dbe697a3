//! Per-item outcomes and batch reports.

use anyhow::{Context, Result};
use serde::Serialize;
use std::fmt;
use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

/// Which way a batch moves data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    LocalToObjectStore,
    ObjectStoreToMemory,
    MemoryToRelational,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::LocalToObjectStore => "local -> object store",
            Self::ObjectStoreToMemory => "object store -> memory",
            Self::MemoryToRelational => "memory -> relational store",
        })
    }
}

/// Lifecycle of one item. `Succeeded` and `Failed` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemState {
    Pending,
    Converting,
    Transferring,
    Succeeded,
    Failed,
}

impl ItemState {
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Succeeded | Self::Failed)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TransferOutcome {
    pub name: String,
    pub succeeded: bool,
    pub detail: Option<String>,
}

impl TransferOutcome {
    pub fn success(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            succeeded: true,
            detail: None,
        }
    }

    pub fn failure(name: impl Into<String>, detail: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            succeeded: false,
            detail: Some(detail.into()),
        }
    }
}

/// Aggregate of one batch, in item order. Only the pipeline records into it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TransferReport {
    pub direction: Direction,
    pub total: usize,
    pub succeeded_count: usize,
    pub failed: Vec<String>,
    pub outcomes: Vec<TransferOutcome>,
}

impl TransferReport {
    #[must_use]
    pub const fn new(direction: Direction) -> Self {
        Self {
            direction,
            total: 0,
            succeeded_count: 0,
            failed: Vec::new(),
            outcomes: Vec::new(),
        }
    }

    pub(crate) fn record(&mut self, outcome: TransferOutcome) {
        self.total += 1;
        if outcome.succeeded {
            self.succeeded_count += 1;
        } else {
            self.failed.push(outcome.name.clone());
        }
        self.outcomes.push(outcome);
    }

    #[must_use]
    pub fn failed_count(&self) -> usize {
        self.failed.len()
    }

    /// True when every item succeeded (vacuously true for an empty batch).
    #[must_use]
    pub fn all_succeeded(&self) -> bool {
        self.failed.is_empty()
    }

    #[must_use]
    pub fn outcome(&self, name: &str) -> Option<&TransferOutcome> {
        self.outcomes.iter().find(|o| o.name == name)
    }

    /// One-line tally, e.g. `"3 of 4 items succeeded (local -> object store); failed: b"`.
    #[must_use]
    pub fn summary(&self) -> String {
        let mut s = format!(
            "{} of {} items succeeded ({})",
            self.succeeded_count, self.total, self.direction
        );
        if !self.failed.is_empty() {
            s.push_str("; failed: ");
            s.push_str(&self.failed.join(", "));
        }
        s
    }

    /// Write the report as pretty JSON.
    ///
    /// # Errors
    /// Returns an error if the file cannot be created or written.
    pub fn save_to_file(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let f = File::create(path).with_context(|| format!("create {}", path.display()))?;
        serde_json::to_writer_pretty(BufWriter::new(f), self)
            .with_context(|| format!("write report to {}", path.display()))?;
        Ok(())
    }
}

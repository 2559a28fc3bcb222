//! Recompute metrics from a finished (or interrupted) trace file.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use tracing::warn;

use crate::metrics::{Correctness, Metrics, MetricsReport};
use crate::run::InstanceRecord;

/// Rebuild the metrics report from a trace JSONL.
///
/// Unparseable lines are logged and skipped so a truncated final line from an
/// interrupted run does not make the whole trace unreadable.
pub fn report_from_trace(path: &Path) -> Result<MetricsReport> {
    let contents =
        fs::read_to_string(path).with_context(|| format!("read trace {}", path.display()))?;

    let mut metrics = Metrics::new();
    for (lineno, line) in contents.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        let record: InstanceRecord = match serde_json::from_str(line) {
            Ok(record) => record,
            Err(err) => {
                warn!(lineno = lineno + 1, %err, "skipping unreadable trace line");
                continue;
            }
        };
        metrics.update(Correctness {
            default_correct: record.default_correct,
            revised_correct: record.revised_correct,
        });
    }
    Ok(metrics.report())
}

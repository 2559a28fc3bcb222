//! Benchmark dataset loading.
//!
//! All datasets are JSONL files with one `{"question", "answer"}` record per
//! line (the BigBench tasks are preprocessed into this shape upstream).
//! Malformed lines are logged and skipped rather than aborting the run.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Supported benchmarks. `key` must match a bundled prompt configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DatasetKind {
    Gsm8k,
    Logiqa,
    Aqua,
    Date,
    Lastletter,
    Causeeffect,
    Socialqa,
    Oddoneout,
    Objects,
}

impl DatasetKind {
    pub fn key(self) -> &'static str {
        match self {
            Self::Gsm8k => "gsm8k",
            Self::Logiqa => "logiqa",
            Self::Aqua => "aqua",
            Self::Date => "date",
            Self::Lastletter => "lastletter",
            Self::Causeeffect => "causeeffect",
            Self::Socialqa => "socialqa",
            Self::Oddoneout => "oddoneout",
            Self::Objects => "objects",
        }
    }
}

/// One problem instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Example {
    pub idx: usize,
    pub question: String,
    /// Reference reasoning, where the dataset provides one (GSM8K).
    pub reasoning: String,
    /// Gold completion as stored in the file, before answer extraction.
    pub gold: String,
}

#[derive(Debug, Deserialize)]
struct RawRecord {
    question: String,
    answer: String,
}

/// Load up to `limit` examples from a JSONL file.
pub fn load(path: &Path, kind: DatasetKind, limit: Option<usize>) -> Result<Vec<Example>> {
    let contents =
        fs::read_to_string(path).with_context(|| format!("read dataset {}", path.display()))?;

    let mut examples = Vec::new();
    for (lineno, line) in contents.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        let record: RawRecord = match serde_json::from_str(line) {
            Ok(record) => record,
            Err(err) => {
                warn!(lineno = lineno + 1, %err, "skipping malformed dataset line");
                continue;
            }
        };
        examples.push(parse_record(examples.len(), kind, record));
        if limit.is_some_and(|n| examples.len() >= n) {
            break;
        }
    }
    Ok(examples)
}

fn parse_record(idx: usize, kind: DatasetKind, record: RawRecord) -> Example {
    // GSM8K stores "reasoning #### answer" in a single field.
    let (reasoning, gold) = match kind {
        DatasetKind::Gsm8k => match record.answer.split_once("#### ") {
            Some((reasoning, _)) => (reasoning.trim().to_string(), record.answer.clone()),
            None => (String::new(), record.answer.clone()),
        },
        _ => (String::new(), record.answer.clone()),
    };
    Example {
        idx,
        question: record.question,
        reasoning,
        gold,
    }
}

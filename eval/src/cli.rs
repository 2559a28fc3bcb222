//! Command-line interface.

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use harness::policy::PolicyKind;

use crate::dataset::DatasetKind;

#[derive(Debug, Parser)]
#[command(name = "eval", about = "Chain-of-thought revision benchmark driver")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Run a benchmark dataset through the revision protocol.
    Run {
        /// Benchmark to run.
        #[arg(long, value_enum)]
        dataset: DatasetKind,

        /// Path to the dataset JSONL file.
        #[arg(long)]
        data: PathBuf,

        /// Critique policy.
        #[arg(long, value_enum, default_value = "argue-review")]
        policy: PolicyArg,

        /// Config TOML; defaults apply when the file is missing.
        #[arg(long, default_value = "eval.toml")]
        config: PathBuf,

        /// Directory where run artifacts are written.
        #[arg(long, default_value = "runs")]
        output: PathBuf,

        /// Stop after this many examples.
        #[arg(long)]
        limit: Option<usize>,
    },
    /// Recompute metrics from an existing trace file.
    Report {
        /// Path to a trace.jsonl produced by `run`.
        file: PathBuf,
    },
}

/// CLI-facing policy selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum PolicyArg {
    Direct,
    ArgueReview,
    ArgueNoreview,
    Negation,
}

impl From<PolicyArg> for PolicyKind {
    fn from(arg: PolicyArg) -> Self {
        match arg {
            PolicyArg::Direct => PolicyKind::Direct,
            PolicyArg::ArgueReview => PolicyKind::ArgueReview,
            PolicyArg::ArgueNoreview => PolicyKind::ArgueNoReview,
            PolicyArg::Negation => PolicyKind::Negation,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_a_run_invocation() {
        let cli = Cli::try_parse_from([
            "eval", "run", "--dataset", "gsm8k", "--data", "data/gsm8k.jsonl", "--policy",
            "negation", "--limit", "10",
        ])
        .expect("parse");
        match cli.command {
            Commands::Run {
                dataset,
                policy,
                limit,
                ..
            } => {
                assert_eq!(dataset, DatasetKind::Gsm8k);
                assert_eq!(PolicyKind::from(policy), PolicyKind::Negation);
                assert_eq!(limit, Some(10));
            }
            Commands::Report { .. } => panic!("expected run"),
        }
    }

    #[test]
    fn report_takes_a_trace_path() {
        let cli = Cli::try_parse_from(["eval", "report", "runs/x/trace.jsonl"]).expect("parse");
        assert!(matches!(cli.command, Commands::Report { .. }));
    }
}

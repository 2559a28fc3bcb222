//! Benchmark run driver: one revision-machine episode per example, scored
//! against gold, appended to an auditable run directory.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::Utc;
use rand::Rng;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::{info, warn};

use harness::core::graph::NodeLinkGraph;
use harness::io::command_oracle::CommandOracle;
use harness::io::run_log::RunLog;
use harness::machine::{MachineConfig, RevisionMachine};
use harness::oracle::{ChatOracle, Message};
use harness::policy::{CritiquePolicy, PolicyKind, build_policy};
use harness::prompts::PromptSet;

use crate::answer::{self, Answer};
use crate::config::EvalConfig;
use crate::dataset::{self, DatasetKind, Example};
use crate::metrics::{Correctness, Metrics, MetricsReport};

/// One line of the trace JSONL.
#[derive(Debug, Serialize, Deserialize)]
pub struct InstanceRecord {
    pub idx: usize,
    pub question: String,
    pub gold: Answer,
    pub default_answer: Answer,
    pub revised_answer: Answer,
    pub default_correct: bool,
    pub revised_correct: bool,
    /// Full branch graph in node-link form.
    pub graph: NodeLinkGraph,
}

#[derive(Debug, Serialize)]
struct RunMeta<'a> {
    run_id: &'a str,
    dataset: &'a str,
    policy: &'a str,
    prompt_version: u32,
    max_steps: u32,
    oracle_command: &'a [String],
    data_path: String,
    data_sha256: String,
    examples: usize,
    started_at: String,
}

pub struct RunArgs {
    pub kind: DatasetKind,
    pub data: PathBuf,
    pub policy: PolicyKind,
    pub config: EvalConfig,
    pub output: PathBuf,
    pub limit: Option<usize>,
}

/// Drive one example through the revision protocol and score both contexts.
pub fn run_instance(
    oracle: &dyn ChatOracle,
    prompts: &PromptSet,
    policy: &dyn CritiquePolicy,
    config: &MachineConfig,
    kind: DatasetKind,
    example: &Example,
) -> Result<InstanceRecord> {
    let mut machine = RevisionMachine::new(oracle, prompts, config.clone());
    let mut turn = machine
        .reset(&example.question)
        .with_context(|| format!("reset instance {}", example.idx))?;
    while let Some(state) = turn.state.take() {
        let verdict = policy
            .evaluate(&state)
            .with_context(|| format!("critique step {} of instance {}", state.col, example.idx))?;
        turn = machine
            .step(&verdict)
            .with_context(|| format!("step instance {}", example.idx))?;
    }

    let gold = answer::extract_gold(kind, &example.gold);
    let default_answer = request_answer(oracle, prompts, kind, machine.first_pass_context())?;
    let revised_answer = request_answer(oracle, prompts, kind, machine.context())?;
    let default_correct = default_answer.matches(&gold);
    let revised_correct = revised_answer.matches(&gold);

    Ok(InstanceRecord {
        idx: example.idx,
        question: example.question.clone(),
        gold,
        default_answer,
        revised_answer,
        default_correct,
        revised_correct,
        graph: machine.graph().to_node_link(),
    })
}

/// Ask the oracle for the final answer given a finished reasoning context.
fn request_answer(
    oracle: &dyn ChatOracle,
    prompts: &PromptSet,
    kind: DatasetKind,
    context: &str,
) -> Result<Answer> {
    let completion = oracle
        .complete(&[
            Message::system(context),
            Message::user(prompts.answer_request()),
        ])
        .context("answer completion")?;
    Ok(answer::extract_pred(kind, &completion))
}

/// Run a whole dataset, appending per-instance records as they finish.
///
/// Instance failures are logged and skipped; the run keeps going and the
/// final metrics cover the scored instances only.
pub fn run_dataset(args: &RunArgs) -> Result<MetricsReport> {
    args.config.validate()?;
    let examples = dataset::load(&args.data, args.kind, args.limit)?;
    if examples.is_empty() {
        warn!(path = %args.data.display(), "dataset is empty");
    }

    let prompts = PromptSet::new(args.kind.key(), args.config.prompt_version)?;
    let oracle = CommandOracle::new(
        args.config.oracle.command.clone(),
        Duration::from_secs(args.config.oracle.timeout_secs),
        args.config.oracle.output_limit_bytes,
    )?;
    let policy = build_policy(args.policy, &oracle, &prompts);
    let machine_config = MachineConfig {
        max_steps: args.config.max_steps,
    };

    let run_id = new_run_id(args.kind);
    let run_dir = args.output.join(&run_id);
    fs::create_dir_all(&run_dir)
        .with_context(|| format!("create run dir {}", run_dir.display()))?;
    write_meta(&run_dir, &run_id, args, &examples)?;
    let mut log = RunLog::open(&run_dir.join("trace.jsonl"))?;

    let mut metrics = Metrics::new();
    for example in &examples {
        let record = match run_instance(
            &oracle,
            &prompts,
            policy.as_ref(),
            &machine_config,
            args.kind,
            example,
        ) {
            Ok(record) => record,
            Err(err) => {
                warn!(idx = example.idx, err = format!("{err:#}"), "instance failed, skipping");
                continue;
            }
        };
        metrics.update(Correctness {
            default_correct: record.default_correct,
            revised_correct: record.revised_correct,
        });
        log.append(&record)?;
        let report = metrics.report();
        info!(
            idx = example.idx,
            acc_default = report.acc_default,
            acc_revised = report.acc_revised,
            "instance scored"
        );
    }

    let report = metrics.report();
    let mut buf = serde_json::to_string_pretty(&report)?;
    buf.push('\n');
    fs::write(run_dir.join("metrics.json"), buf)
        .with_context(|| format!("write metrics in {}", run_dir.display()))?;
    info!(run_dir = %run_dir.display(), instances = report.instances, "run finished");
    Ok(report)
}

fn policy_name(kind: PolicyKind) -> &'static str {
    match kind {
        PolicyKind::Direct => "direct",
        PolicyKind::ArgueReview => "argue_review",
        PolicyKind::ArgueNoReview => "argue_noreview",
        PolicyKind::Negation => "negation",
    }
}

fn new_run_id(kind: DatasetKind) -> String {
    let stamp = Utc::now().format("%Y%m%d-%H%M%S");
    let suffix: u32 = rand::thread_rng().gen_range(0..0x10000);
    format!("{}-{stamp}-{suffix:04x}", kind.key())
}

fn write_meta(run_dir: &Path, run_id: &str, args: &RunArgs, examples: &[Example]) -> Result<()> {
    let data = fs::read(&args.data)
        .with_context(|| format!("hash dataset {}", args.data.display()))?;
    let meta = RunMeta {
        run_id,
        dataset: args.kind.key(),
        policy: policy_name(args.policy),
        prompt_version: args.config.prompt_version,
        max_steps: args.config.max_steps,
        oracle_command: &args.config.oracle.command,
        data_path: args.data.display().to_string(),
        data_sha256: hex::encode(Sha256::digest(&data)),
        examples: examples.len(),
        started_at: Utc::now().to_rfc3339(),
    };
    let mut buf = serde_json::to_string_pretty(&meta)?;
    buf.push('\n');
    fs::write(run_dir.join("meta.json"), buf)
        .with_context(|| format!("write meta in {}", run_dir.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use harness::policy::DirectPolicy;
    use harness::test_support::ScriptedOracle;

    fn example(question: &str, gold: &str) -> Example {
        Example {
            idx: 0,
            question: question.to_string(),
            reasoning: String::new(),
            gold: gold.to_string(),
        }
    }

    #[test]
    fn scores_both_contexts_against_gold() {
        let prompts = PromptSet::new("gsm8k", 0).expect("prompts");
        let oracle = ScriptedOracle::new([
            "First double it.\n#2. Then add nothing.",
            // Continuation after the second step has no boundary.
            "that is all",
            // Final-answer completions: first pass, then revised.
            "the numerical result is 4",
            "the numerical result is 4",
        ]);
        let record = run_instance(
            &oracle,
            &prompts,
            &DirectPolicy,
            &MachineConfig { max_steps: 5 },
            DatasetKind::Gsm8k,
            &example("What is 2 + 2?", "double 2.\n#### 4"),
        )
        .expect("run");

        assert_eq!(record.gold, Answer::Number(4.0));
        assert!(record.default_correct);
        assert!(record.revised_correct);
        assert!(!record.graph.nodes.is_empty());
        assert_eq!(oracle.remaining(), 0);
    }

    #[test]
    fn invalid_prediction_scores_as_wrong() {
        let prompts = PromptSet::new("gsm8k", 0).expect("prompts");
        let oracle = ScriptedOracle::new([
            "no steps here at all",
            // Both answer completions lack a number.
            "I do not know",
            "still no idea",
        ]);
        let record = run_instance(
            &oracle,
            &prompts,
            &DirectPolicy,
            &MachineConfig { max_steps: 5 },
            DatasetKind::Gsm8k,
            &example("Q", "#### 7"),
        )
        .expect("run");
        assert!(record.default_answer.is_invalid());
        assert!(!record.default_correct);
        assert!(!record.revised_correct);
    }
}

//! Immutable prompt configuration, keyed by dataset + prompt version.
//!
//! All prompt text lives in bundled templates; a [`PromptSet`] is built once
//! at startup and injected wherever prompts are rendered. There is no mutable
//! global template state.

use anyhow::{Result, anyhow};
use minijinja::{Environment, context};

const SYSTEM_BASE: &str = include_str!("prompts/system_base.j2");
const SYSTEM_REDUCTIO: &str = include_str!("prompts/system_reductio.j2");
const ARGUE_CLARIFY: &str = include_str!("prompts/argue_clarify.j2");
const ARGUE_CRITICIZE: &str = include_str!("prompts/argue_criticize.j2");
const ARGUE_JUDGE: &str = include_str!("prompts/argue_judge.j2");
const ARGUE_REVISE: &str = include_str!("prompts/argue_revise.j2");
const ARGUE_REVISE_PLAIN: &str = include_str!("prompts/argue_revise_plain.j2");
const NEGATION_CHECK: &str = include_str!("prompts/negation_check.j2");

/// Benchmark datasets with bundled prompt configurations.
const DATASETS: &[&str] = &[
    "gsm8k",
    "logiqa",
    "aqua",
    "date",
    "lastletter",
    "causeeffect",
    "socialqa",
    "oddoneout",
    "objects",
];

/// Prompt templates for one dataset + prompt version pair.
#[derive(Debug)]
pub struct PromptSet {
    env: Environment<'static>,
    dataset: String,
    version: u32,
}

impl PromptSet {
    /// Build the prompt set, validating the dataset + version pair.
    ///
    /// Version 1 (the reductio system prompt) exists only for `logiqa`; every
    /// dataset has version 0.
    pub fn new(dataset: &str, version: u32) -> Result<Self> {
        if !DATASETS.contains(&dataset) {
            return Err(anyhow!("unknown dataset {dataset:?}"));
        }
        let max_version = if dataset == "logiqa" { 1 } else { 0 };
        if version > max_version {
            return Err(anyhow!(
                "prompt version {version} not available for {dataset:?} (max {max_version})"
            ));
        }

        let mut env = Environment::new();
        env.set_keep_trailing_newline(true);
        for (name, source) in [
            ("system_base", SYSTEM_BASE),
            ("system_reductio", SYSTEM_REDUCTIO),
            ("argue_clarify", ARGUE_CLARIFY),
            ("argue_criticize", ARGUE_CRITICIZE),
            ("argue_judge", ARGUE_JUDGE),
            ("argue_revise", ARGUE_REVISE),
            ("argue_revise_plain", ARGUE_REVISE_PLAIN),
            ("negation_check", NEGATION_CHECK),
        ] {
            env.add_template(name, source)
                .expect("bundled template should be valid");
        }

        Ok(Self {
            env,
            dataset: dataset.to_string(),
            version,
        })
    }

    pub fn dataset(&self) -> &str {
        &self.dataset
    }

    pub fn version(&self) -> u32 {
        self.version
    }

    /// System prompt establishing the problem context.
    pub fn system(&self, question: &str) -> Result<String> {
        let template = if self.dataset == "logiqa" && self.version == 1 {
            "system_reductio"
        } else {
            "system_base"
        };
        let body = self
            .env
            .get_template(template)?
            .render(context! { question })?;
        let rendered = match self.dataset.as_str() {
            "logiqa" => format!(
                "Analyze and answer the following single-choice problem in the symbolic logic field.\n{body}"
            ),
            "aqua" => format!("Analyze and answer the following single-choice problem.\n{body}"),
            _ => body,
        };
        Ok(rendered)
    }

    /// Dataset-specific final-answer request appended to a completed context.
    pub fn answer_request(&self) -> &'static str {
        match self.dataset.as_str() {
            "gsm8k" => "Therefore, the numerical (int or float) result is: ",
            "logiqa" | "aqua" => {
                "Therefore, the final answer is (chose only one option indicator from the list [OptA, OptB, OptC, OptD]):"
            }
            "date" => "Therefore, the answer (in MM/DD/YYYY format) is:",
            "lastletter" => "Therefore, the answer (only the answer no extra comments) is:",
            "causeeffect" => {
                "Therefore, the final answer is (chose only one option indicator from the list [OptA, OptB]):"
            }
            "socialqa" | "objects" => {
                "Therefore, the final answer is (chose only one option indicator from the list [OptA, OptB, OptC]):"
            }
            "oddoneout" => {
                "Therefore, the final answer is (chose only one option indicator from the list [OptA, OptB, OptC, OptD, OptE, OptF]):"
            }
            _ => "Therefore, the final answer is:",
        }
    }

    pub fn clarify(&self, col: u32, step: &str) -> Result<String> {
        self.render("argue_clarify", context! { col, step })
    }

    pub fn criticize(&self, col: u32, step: &str) -> Result<String> {
        self.render("argue_criticize", context! { col, step })
    }

    pub fn judge(&self, col: u32, step: &str, defense: &str, criticism: &str) -> Result<String> {
        self.render("argue_judge", context! { col, step, defense, criticism })
    }

    pub fn revise(&self, col: u32, step: &str, criticism: &str) -> Result<String> {
        self.render("argue_revise", context! { col, step, criticism })
    }

    pub fn revise_unconditioned(&self, col: u32, step: &str) -> Result<String> {
        self.render("argue_revise_plain", context! { col, step })
    }

    pub fn negation_check(&self, col: u32, step: &str) -> Result<String> {
        self.render("negation_check", context! { col, step })
    }

    fn render(&self, name: &str, ctx: minijinja::Value) -> Result<String> {
        let rendered = self.env.get_template(name)?.render(ctx)?;
        Ok(rendered)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_dataset_is_rejected() {
        let err = PromptSet::new("riddles", 0).expect_err("unknown dataset");
        assert!(err.to_string().contains("unknown dataset"));
    }

    #[test]
    fn version_one_only_exists_for_logiqa() {
        assert!(PromptSet::new("logiqa", 1).is_ok());
        let err = PromptSet::new("gsm8k", 1).expect_err("version");
        assert!(err.to_string().contains("not available"));
    }

    #[test]
    fn system_prompt_embeds_question() {
        let prompts = PromptSet::new("gsm8k", 0).expect("prompts");
        let rendered = prompts.system("How many apples?").expect("render");
        assert!(rendered.contains("Question: How many apples?"));
        assert!(rendered.contains("Let's think step by step."));
        assert!(rendered.ends_with("Answer:\n"));
    }

    #[test]
    fn logiqa_system_prompt_carries_domain_prefix() {
        let prompts = PromptSet::new("logiqa", 1).expect("prompts");
        let rendered = prompts.system("Which option?").expect("render");
        assert!(rendered.starts_with("Analyze and answer"));
        assert!(rendered.contains("reduction to absurdity"));
    }

    #[test]
    fn critique_templates_reference_the_column() {
        let prompts = PromptSet::new("gsm8k", 0).expect("prompts");
        let clarify = prompts.clarify(3, "2 + 2 = 4").expect("clarify");
        assert!(clarify.contains("#3. 2 + 2 = 4"));
        assert!(clarify.contains("is true because"));

        let judge = prompts
            .judge(3, "2 + 2 = 4", "sound arithmetic", "wrong premise")
            .expect("judge");
        assert!(judge.contains("TRUE because sound arithmetic"));
        assert!(judge.contains("FALSE because wrong premise"));
    }

    #[test]
    fn revision_templates_embed_the_criticism_only_when_conditioned() {
        let prompts = PromptSet::new("gsm8k", 0).expect("prompts");
        let conditioned = prompts.revise(2, "B", "off by one").expect("revise");
        assert!(conditioned.contains("off by one"));

        let plain = prompts.revise_unconditioned(2, "B").expect("revise");
        assert!(!plain.contains("off by one"));
    }
}

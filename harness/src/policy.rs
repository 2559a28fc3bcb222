//! Critique policies: decide whether the frontier step stands or gets
//! rewritten.
//!
//! Every policy consumes a frontier snapshot and returns a [`Verdict`]. The
//! argumentative policies run a defense / criticism / judgement exchange
//! through the oracle; the negation policy runs a single reductio check.

use std::fmt;

use anyhow::{Context, Result};
use tracing::{debug, warn};

use crate::core::splitter::strip_marker;
use crate::core::types::{StepState, Verdict};
use crate::oracle::{ChatOracle, Message};
use crate::prompts::PromptSet;

/// A critique strategy applied to each frontier step.
pub trait CritiquePolicy {
    fn evaluate(&self, state: &StepState) -> Result<Verdict>;
}

/// Selector for the bundled policies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PolicyKind {
    /// Accept every step unchanged.
    Direct,
    /// Defense, criticism and judgement; rejected steps are revised against
    /// the criticism.
    ArgueReview,
    /// Same exchange, but the revision prompt omits the criticism.
    ArgueNoReview,
    /// Single reductio-ad-absurdum check.
    Negation,
}

pub fn build_policy<'a>(
    kind: PolicyKind,
    oracle: &'a dyn ChatOracle,
    prompts: &'a PromptSet,
) -> Box<dyn CritiquePolicy + 'a> {
    match kind {
        PolicyKind::Direct => Box::new(DirectPolicy),
        PolicyKind::ArgueReview => Box::new(ArguePolicy {
            oracle,
            prompts,
            review: true,
        }),
        PolicyKind::ArgueNoReview => Box::new(ArguePolicy {
            oracle,
            prompts,
            review: false,
        }),
        PolicyKind::Negation => Box::new(NegationPolicy { oracle, prompts }),
    }
}

/// Accepts every step verbatim. Reproduces an unrevised chain-of-thought
/// baseline inside the same protocol.
pub struct DirectPolicy;

impl CritiquePolicy for DirectPolicy {
    fn evaluate(&self, state: &StepState) -> Result<Verdict> {
        Ok(Verdict::accept(state.step.clone()))
    }
}

/// Raised when a judgement completion contains neither verdict phrase.
#[derive(Debug)]
pub struct AmbiguousVerdictError {
    excerpt: String,
}

impl fmt::Display for AmbiguousVerdictError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "judgement contains neither \" is true\" nor \" is false\": {:?}",
            self.excerpt
        )
    }
}

impl std::error::Error for AmbiguousVerdictError {}

/// Scan a judgement completion for a verdict, case-insensitively.
///
/// " is true" anywhere wins, then " is false"; a completion with neither is
/// ambiguous. The substring match is intentionally loose to tolerate free-form
/// judgement prose.
pub fn parse_verdict(completion: &str) -> Result<bool, AmbiguousVerdictError> {
    let lowered = completion.to_lowercase();
    if lowered.contains(" is true") {
        Ok(true)
    } else if lowered.contains(" is false") {
        Ok(false)
    } else {
        let excerpt: String = completion.chars().take(120).collect();
        Err(AmbiguousVerdictError { excerpt })
    }
}

/// Three-round argumentative critique: defend, criticize, judge. A rejected
/// step is rewritten, optionally conditioned on the criticism.
pub struct ArguePolicy<'a> {
    oracle: &'a dyn ChatOracle,
    prompts: &'a PromptSet,
    review: bool,
}

impl<'a> ArguePolicy<'a> {
    fn exchange(&self, context: &str, prompt: &str) -> Result<String> {
        self.oracle
            .complete(&[Message::system(context), Message::user(prompt)])
    }
}

impl CritiquePolicy for ArguePolicy<'_> {
    fn evaluate(&self, state: &StepState) -> Result<Verdict> {
        let defense = self
            .exchange(&state.context, &self.prompts.clarify(state.col, &state.step)?)
            .context("defense completion")?;
        let criticism = self
            .exchange(
                &state.context,
                &self.prompts.criticize(state.col, &state.step)?,
            )
            .context("criticism completion")?;
        let judgement = self
            .exchange(
                &state.context,
                &self
                    .prompts
                    .judge(state.col, &state.step, &defense, &criticism)?,
            )
            .context("judgement completion")?;

        let accepted = match parse_verdict(&judgement) {
            Ok(accepted) => accepted,
            Err(err) => {
                warn!(col = state.col, %err, "ambiguous judgement, accepting step");
                true
            }
        };
        if accepted {
            debug!(col = state.col, "step judged true");
            return Ok(Verdict::accept(state.step.clone()));
        }

        let prompt = if self.review {
            self.prompts.revise(state.col, &state.step, &criticism)?
        } else {
            self.prompts.revise_unconditioned(state.col, &state.step)?
        };
        let revision = self
            .exchange(&state.context, &prompt)
            .context("revision completion")?;
        debug!(col = state.col, "step judged false, revised");
        Ok(Verdict::reject(strip_marker(&revision)))
    }
}

/// Single-shot reductio check: the step stands unless the verification
/// explicitly declares it false. Rejections are rewritten without a review.
pub struct NegationPolicy<'a> {
    oracle: &'a dyn ChatOracle,
    prompts: &'a PromptSet,
}

impl CritiquePolicy for NegationPolicy<'_> {
    fn evaluate(&self, state: &StepState) -> Result<Verdict> {
        let check = self
            .oracle
            .complete(&[
                Message::system(&state.context),
                Message::user(&self.prompts.negation_check(state.col, &state.step)?),
            ])
            .context("negation check completion")?;

        if check.to_lowercase().contains(" is true") {
            debug!(col = state.col, "reductio check passed");
            return Ok(Verdict::accept(state.step.clone()));
        }

        let revision = self
            .oracle
            .complete(&[
                Message::system(&state.context),
                Message::user(&self.prompts.revise_unconditioned(state.col, &state.step)?),
            ])
            .context("revision completion")?;
        debug!(col = state.col, "reductio check failed, revised");
        Ok(Verdict::reject(strip_marker(&revision)))
    }
}

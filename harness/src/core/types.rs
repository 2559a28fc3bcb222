//! Shared deterministic types for the revision protocol.
//!
//! These types define stable contracts between the state machine and the
//! critique policies. They should not depend on external state or I/O and
//! must remain deterministic across runs.

use serde::{Deserialize, Serialize};

/// Snapshot of the frontier handed to a critique policy.
///
/// `context` is the chain-so-far (system prompt plus every accepted step),
/// exactly what the oracle will see as prior context for all future calls.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepState {
    /// Running context: system prompt followed by accepted steps.
    pub context: String,
    /// 1-indexed column of the step under evaluation.
    pub col: u32,
    /// Step text with the leading ordinal marker removed.
    pub step: String,
    /// True when this step was produced as a policy replacement rather than
    /// by the oracle's free continuation.
    pub refined: bool,
}

/// Critique-policy decision for a single frontier step.
///
/// On accept, `advice` is the step text verbatim; on reject it is the
/// replacement text that will supersede the step in the chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Verdict {
    pub advice: String,
    pub accepted: bool,
}

impl Verdict {
    pub fn accept(step: impl Into<String>) -> Self {
        Self {
            advice: step.into(),
            accepted: true,
        }
    }

    pub fn reject(replacement: impl Into<String>) -> Self {
        Self {
            advice: replacement.into(),
            accepted: false,
        }
    }
}

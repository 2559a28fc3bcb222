//! Gold and predicted answer extraction.
//!
//! Completions are free-form text; extraction is deliberately forgiving and
//! funnels unparseable output into [`Answer::Invalid`] instead of failing the
//! instance.

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::dataset::DatasetKind;

/// Sentinel recorded for completions with no extractable answer.
pub const INVALID_ANS: &str = "[invalid]";

static GOLD_NUMBER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"#### (\-?[0-9\.,]+)").expect("static regex"));
static NUMBER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\-?[0-9\.,]+").expect("static regex"));
static OPTION_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"Opt[A-G]").expect("static regex"));
static DATE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\d{2}/\d{2}/\d{4}").expect("static regex"));

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Answer {
    Number(f64),
    Text(String),
}

impl Answer {
    pub fn invalid() -> Self {
        Self::Text(INVALID_ANS.to_string())
    }

    pub fn is_invalid(&self) -> bool {
        matches!(self, Self::Text(text) if text == INVALID_ANS)
    }

    /// Equality check: numeric answers within 1e-6, text answers by trimmed
    /// comparison. Invalid never matches anything.
    pub fn matches(&self, gold: &Answer) -> bool {
        if self.is_invalid() || gold.is_invalid() {
            return false;
        }
        match (self, gold) {
            (Self::Number(a), Self::Number(b)) => (a - b).abs() < 1e-6,
            (Self::Text(a), Self::Text(b)) => a.trim() == b.trim(),
            _ => false,
        }
    }
}

/// Extract the gold answer from the stored completion.
pub fn extract_gold(kind: DatasetKind, gold: &str) -> Answer {
    match kind {
        DatasetKind::Gsm8k => match GOLD_NUMBER_RE.captures(gold) {
            Some(caps) => parse_number(&caps[1]),
            None => Answer::invalid(),
        },
        DatasetKind::Date => {
            let tail = gold.rsplit("#### ").next().unwrap_or(gold);
            Answer::Text(tail.trim().to_string())
        }
        _ => Answer::Text(gold.trim().to_string()),
    }
}

/// Extract the predicted answer from a model completion.
pub fn extract_pred(kind: DatasetKind, completion: &str) -> Answer {
    if completion.contains(INVALID_ANS) {
        return Answer::invalid();
    }
    match kind {
        DatasetKind::Gsm8k => match NUMBER_RE.find(completion) {
            Some(found) => parse_number(found.as_str()),
            None => Answer::invalid(),
        },
        DatasetKind::Logiqa
        | DatasetKind::Aqua
        | DatasetKind::Causeeffect
        | DatasetKind::Socialqa
        | DatasetKind::Oddoneout
        | DatasetKind::Objects => match OPTION_RE.find(completion) {
            Some(found) => Answer::Text(found.as_str().to_string()),
            None => Answer::invalid(),
        },
        DatasetKind::Date => match DATE_RE.find(completion) {
            Some(found) => Answer::Text(found.as_str().to_string()),
            None => Answer::invalid(),
        },
        DatasetKind::Lastletter => Answer::Text(completion.trim().to_string()),
    }
}

/// Numbers are normalized the way the benchmarks score them: commas
/// stripped, absolute value, truncated to an integer.
fn parse_number(text: &str) -> Answer {
    let cleaned = text.replace(',', "");
    match cleaned.parse::<f64>() {
        Ok(value) => Answer::Number(value.abs().trunc()),
        Err(_) => Answer::invalid(),
    }
}

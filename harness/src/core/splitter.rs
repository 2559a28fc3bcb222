//! Splitting oracle completions into candidate reasoning steps.

use std::sync::LazyLock;

use anyhow::{Context, Result};
use regex::Regex;

/// Default step boundary: `#3.` or `3.` anchored at a line start.
const DEFAULT_BOUNDARY: &str = r"(?m)^\s*#?\d+\.\s*";

static LEADING_MARKER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*#?\d+\.\s*").expect("marker pattern should be valid"));

/// Pure splitter over a configurable step-numbering convention.
///
/// A completion like `"A\n#2. B\n#3. C"` yields `["A", "B", "C"]`: the text
/// before the first boundary is the first segment (the prompt seeds the `1.`
/// marker), each boundary token is discarded, and empty segments are dropped.
#[derive(Debug, Clone)]
pub struct StepSplitter {
    boundary: Regex,
}

impl Default for StepSplitter {
    fn default() -> Self {
        Self {
            boundary: Regex::new(DEFAULT_BOUNDARY).expect("default pattern should be valid"),
        }
    }
}

impl StepSplitter {
    /// Build a splitter with a custom boundary pattern.
    pub fn with_pattern(pattern: &str) -> Result<Self> {
        let boundary =
            Regex::new(pattern).with_context(|| format!("compile boundary pattern {pattern:?}"))?;
        Ok(Self { boundary })
    }

    /// True if `raw` contains at least one step boundary marker.
    pub fn has_boundary(&self, raw: &str) -> bool {
        self.boundary.is_match(raw)
    }

    /// Split `raw` into ordered candidate steps.
    ///
    /// If no boundary marker is present, the entire trimmed text is returned
    /// as a single segment (empty input yields no segments); the caller must
    /// treat that as "no further decomposition possible".
    pub fn split(&self, raw: &str) -> Vec<String> {
        if !self.has_boundary(raw) {
            let trimmed = raw.trim();
            if trimmed.is_empty() {
                return Vec::new();
            }
            return vec![trimmed.to_string()];
        }

        self.boundary
            .split(raw)
            .map(str::trim)
            .filter(|segment| !segment.is_empty())
            .map(str::to_string)
            .collect()
    }
}

/// Remove one leading ordinal marker (`#2.` / `2.`) from `text`.
///
/// Revision completions frequently restate the marker of the step they
/// replace; node text is stored without it.
pub fn strip_marker(text: &str) -> String {
    LEADING_MARKER.replace(text.trim(), "").trim().to_string()
}

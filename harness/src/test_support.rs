//! Deterministic fakes for exercising machine and policy logic without a
//! live completion backend.

use std::cell::RefCell;
use std::collections::VecDeque;

use anyhow::{Result, anyhow};

use crate::oracle::{ChatOracle, Message};

/// Oracle that replays a fixed queue of completions in order.
///
/// Errors when the queue is exhausted, which makes an unexpected extra call
/// fail the test instead of silently looping.
pub struct ScriptedOracle {
    responses: RefCell<VecDeque<String>>,
}

impl ScriptedOracle {
    pub fn new<I, S>(responses: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            responses: RefCell::new(responses.into_iter().map(Into::into).collect()),
        }
    }

    /// Completions not yet consumed.
    pub fn remaining(&self) -> usize {
        self.responses.borrow().len()
    }
}

impl ChatOracle for ScriptedOracle {
    fn complete(&self, _messages: &[Message]) -> Result<String> {
        self.responses
            .borrow_mut()
            .pop_front()
            .ok_or_else(|| anyhow!("scripted oracle exhausted"))
    }
}

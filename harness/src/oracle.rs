//! Chat-oracle boundary.
//!
//! The [`ChatOracle`] trait decouples the revision protocol from the actual
//! completion backend (a subprocess, an HTTP client, a scripted fake). The
//! core treats the oracle as an opaque, possibly slow, possibly failing
//! function from a message sequence to a completion string; it never retries.

use anyhow::Result;
use serde::{Deserialize, Serialize};

/// Speaker tag attached to each message in a completion request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

/// One role-tagged message in an oracle conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// Abstraction over completion backends.
///
/// Implementations block until a completion arrives or fail with an error;
/// transport retries are the implementation's concern, not the caller's.
pub trait ChatOracle {
    fn complete(&self, messages: &[Message]) -> Result<String>;
}

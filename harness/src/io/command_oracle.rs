//! Subprocess-backed chat oracle.
//!
//! The bridge command receives the full message list as JSON on stdin and
//! prints the assistant completion on stdout. Any chat backend can be wired
//! in through a small adapter script.

use std::process::Command;
use std::time::Duration;

use anyhow::{Context, Result, anyhow, bail};
use tracing::{debug, instrument};

use crate::io::process::run_command_with_timeout;
use crate::oracle::{ChatOracle, Message};

#[derive(Debug)]
pub struct CommandOracle {
    command: Vec<String>,
    timeout: Duration,
    output_limit_bytes: usize,
}

impl CommandOracle {
    pub fn new(command: Vec<String>, timeout: Duration, output_limit_bytes: usize) -> Result<Self> {
        if command.is_empty() {
            bail!("oracle command must not be empty");
        }
        Ok(Self {
            command,
            timeout,
            output_limit_bytes,
        })
    }
}

impl ChatOracle for CommandOracle {
    #[instrument(skip_all, fields(messages = messages.len()))]
    fn complete(&self, messages: &[Message]) -> Result<String> {
        let payload = serde_json::to_vec(messages).context("serialize oracle request")?;

        let mut cmd = Command::new(&self.command[0]);
        cmd.args(&self.command[1..]);
        let output = run_command_with_timeout(
            cmd,
            Some(&payload),
            self.timeout,
            self.output_limit_bytes,
        )
        .with_context(|| format!("run oracle command {:?}", self.command[0]))?;

        if output.timed_out {
            return Err(anyhow!(
                "oracle command timed out after {}s",
                self.timeout.as_secs()
            ));
        }
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(anyhow!(
                "oracle command failed with {}: {}",
                output.status,
                stderr.trim()
            ));
        }

        let completion = String::from_utf8_lossy(&output.stdout).trim().to_string();
        debug!(bytes = completion.len(), "oracle completion received");
        Ok(completion)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::oracle::Role;

    fn oracle(command: &[&str]) -> CommandOracle {
        CommandOracle::new(
            command.iter().map(ToString::to_string).collect(),
            Duration::from_secs(5),
            64 * 1024,
        )
        .expect("oracle")
    }

    #[test]
    fn empty_command_is_rejected() {
        let err = CommandOracle::new(vec![], Duration::from_secs(1), 1024).expect_err("empty");
        assert!(err.to_string().contains("must not be empty"));
    }

    #[test]
    fn passes_messages_as_json_on_stdin() {
        // `cat` as the bridge: the completion is the request payload itself.
        let oracle = oracle(&["cat"]);
        let reply = oracle
            .complete(&[Message::system("ctx"), Message::user("q")])
            .expect("complete");
        let echoed: Vec<Message> = serde_json::from_str(&reply).expect("round trip");
        assert_eq!(echoed.len(), 2);
        assert_eq!(echoed[0].role, Role::System);
        assert_eq!(echoed[1].content, "q");
    }

    #[test]
    fn stdout_is_trimmed() {
        let oracle = oracle(&["sh", "-c", "cat >/dev/null; printf '  reply \\n'"]);
        let reply = oracle.complete(&[Message::user("q")]).expect("complete");
        assert_eq!(reply, "reply");
    }

    #[test]
    fn nonzero_exit_is_an_error() {
        let oracle = oracle(&["sh", "-c", "echo boom >&2; exit 3"]);
        let err = oracle.complete(&[Message::user("q")]).expect_err("exit");
        assert!(err.to_string().contains("boom"));
    }

    #[test]
    fn roles_serialize_lowercase() {
        let json = serde_json::to_string(&Message {
            role: Role::Assistant,
            content: "hi".to_string(),
        })
        .expect("json");
        assert_eq!(json, r#"{"role":"assistant","content":"hi"}"#);
    }
}

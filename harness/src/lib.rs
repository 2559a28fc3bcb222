//! Chain-of-thought revision harness.
//!
//! This crate drives a chat-based language model through a multi-step
//! reasoning chain, challenges each step through a critique policy, and
//! records every proposed, accepted, and rejected step in an auditable
//! branch graph. The architecture enforces a strict separation:
//!
//! - **[`core`]**: Pure, deterministic logic (thought graph, step splitting).
//!   No I/O, fully testable in isolation.
//! - **[`io`]**: Side-effecting operations (subprocess oracle, run log).
//!   Isolated to enable scripted fakes in tests.
//!
//! [`machine`] orchestrates the oracle and the graph to implement the
//! revision protocol; [`policy`] decides whether each frontier step is
//! accepted or rewritten.

pub mod core;
pub mod io;
pub mod logging;
pub mod machine;
pub mod oracle;
pub mod policy;
pub mod prompts;
#[cfg(any(test, feature = "test-support"))]
pub mod test_support;

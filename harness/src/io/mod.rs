//! Side-effecting operations: subprocess oracle and run persistence.

pub mod command_oracle;
pub mod process;
pub mod run_log;

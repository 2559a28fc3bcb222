//! Pure, deterministic core logic for the revision protocol.

pub mod graph;
pub mod splitter;
pub mod types;

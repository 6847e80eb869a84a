//! Command implementations for the knitdown CLI
//!
//! Each command module handles the CLI interface and delegates to
//! knitdown-core for actual implementation.

pub mod materialize;
pub mod render;

//! CLI subcommand implementations.

pub mod replay;
pub mod snapshot;
pub mod splits;
mod util;

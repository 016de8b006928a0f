//! CLI subcommands.

pub mod containers;
pub mod list;

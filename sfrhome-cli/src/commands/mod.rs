//! CLI command implementations.

pub mod config;
pub mod fetch;
pub mod parse;
pub mod serve;

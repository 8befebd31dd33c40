//! HealthRAG command-line driver
//!
//! Thin layer over `healthrag-core`: parses arguments, resolves the
//! configuration and runs the chunk, build and search stages.

pub mod args;
pub mod commands;

pub use args::Cli;
pub use commands::execute;

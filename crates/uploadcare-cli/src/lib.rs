//! # Uploadcare CLI
//!
//! Command line access to an Uploadcare project.

pub mod commands;
pub mod config;

pub use commands::{execute, Command};
pub use config::CliConfig;

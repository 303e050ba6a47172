//! Git work report CLI library.
//!
//! This crate provides the `devreport` command-line front end.

mod cli;
pub mod commands;
mod config;

pub use cli::{Cli, Commands, RepoAction, SelectionArgs};
pub use config::Config;

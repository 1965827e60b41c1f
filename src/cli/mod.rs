//! Command-line interface

pub mod commands;
pub mod output;

use clap::{Parser, Subcommand};
use commands::{EntryCommand, ExecuteCommand, PipelineCommand, TaskCommand};
use std::ffi::OsString;

/// Content-publishing pipeline builder and local stage runner
#[derive(Debug, Parser, Clone)]
#[command(name = "bakery")]
#[command(version)]
#[command(about = "Builds CI pipelines for book production and runs single stages locally", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

/// Available commands
#[derive(Debug, Subcommand, Clone)]
pub enum Command {
    /// Run one stage against a disposable local CI
    Execute(ExecuteCommand),

    /// Print a task definition
    Task(TaskCommand),

    /// Print a pipeline plan
    Pipeline(PipelineCommand),

    /// Validate a queued book entry
    Entry(EntryCommand),
}

impl Cli {
    /// Parse CLI arguments from environment
    pub fn from_args() -> Self {
        Self::parse()
    }

    /// Parse CLI arguments from a slice
    pub fn try_parse_from<I, T>(itr: I) -> Result<Self, clap::Error>
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString> + Clone,
    {
        <Self as Parser>::try_parse_from(itr)
    }
}

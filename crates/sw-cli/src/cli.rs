//! CLI argument definitions using clap derive API

use clap::{Args, Parser, Subcommand, ValueEnum};

/// Stepwise - ordered, reversible SQL schema migrations
#[derive(Parser, Debug)]
#[command(name = "sw")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Global options
    #[command(flatten)]
    pub global: GlobalArgs,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Global arguments available to all commands
#[derive(Args, Debug, Clone)]
pub struct GlobalArgs {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Path to project directory
    #[arg(short = 'p', long, global = true, default_value = ".")]
    pub project_dir: String,

    /// Override config file path
    #[arg(short, long, global = true, env = "SW_CONFIG")]
    pub config: Option<String>,

    /// Connection to use (default: "default")
    #[arg(long, global = true, env = "SW_CONNECTION")]
    pub connection: Option<String>,
}

/// Available subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Check that the selected connection is reachable
    Check,

    /// Create the ledger table
    Init,

    /// Create a new pair of migration files
    New(NewArgs),

    /// Apply every pending migration in name order
    Apply,

    /// Roll back the most recently applied migrations
    Rollback(RollbackArgs),

    /// Clear the ledger row of a migration, including a recorded failure
    Resolve(ResolveArgs),

    /// Compare local migrations against the ledger
    Validate,

    /// Show the state of every migration
    Status(StatusArgs),
}

/// Arguments for the new command
#[derive(Args, Debug)]
pub struct NewArgs {
    /// Migration name; spaces become underscores
    pub name: String,
}

/// Arguments for the rollback command
#[derive(Args, Debug)]
pub struct RollbackArgs {
    /// Number of migrations to roll back
    #[arg(short = 'n', long, default_value_t = 1)]
    pub steps: usize,
}

/// Arguments for the resolve command
#[derive(Args, Debug)]
pub struct ResolveArgs {
    /// Migration name as recorded in the ledger
    pub name: String,
}

/// Arguments for the status command
#[derive(Args, Debug)]
pub struct StatusArgs {
    /// Output format
    #[arg(short, long, value_enum, default_value = "table")]
    pub output: StatusOutput,
}

/// Status output formats
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusOutput {
    /// Human-readable table
    Table,
    /// JSON array
    Json,
}

#[cfg(test)]
#[path = "cli_test.rs"]
mod tests;

//! Stepwise CLI - apply, roll back, and inspect SQL schema migrations

use anyhow::Result;
use clap::Parser;

mod cli;
mod commands;

use cli::{Cli, Commands};
use commands::common::ExitCode;
use commands::{apply, check, init, new, resolve, rollback, status, validate};

fn main() {
    let cli = Cli::parse();
    init_logging(cli.global.verbose);

    if let Err(err) = run(&cli) {
        if let Some(ExitCode(code)) = err.downcast_ref::<ExitCode>() {
            std::process::exit(*code);
        }
        eprintln!("Error: {err:#}");
        std::process::exit(1);
    }
}

fn run(cli: &Cli) -> Result<()> {
    match &cli.command {
        Commands::Check => check::execute(&cli.global),
        Commands::Init => init::execute(&cli.global),
        Commands::New(args) => new::execute(args, &cli.global),
        Commands::Apply => apply::execute(&cli.global),
        Commands::Rollback(args) => rollback::execute(args, &cli.global),
        Commands::Resolve(args) => resolve::execute(args, &cli.global),
        Commands::Validate => validate::execute(&cli.global),
        Commands::Status(args) => status::execute(args, &cli.global),
    }
}

/// `RUST_LOG` wins when set; otherwise `--verbose` picks debug over warn
fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .format_timestamp(None)
        .init();
}

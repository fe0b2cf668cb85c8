use super::*;
use clap::CommandFactory;

#[test]
fn verify_cli_args() {
    Cli::command().debug_assert();
}

#[test]
fn test_rollback_defaults_to_one_step() {
    let cli = Cli::try_parse_from(["sw", "rollback"]).unwrap();
    match cli.command {
        Commands::Rollback(args) => assert_eq!(args.steps, 1),
        other => panic!("unexpected command: {other:?}"),
    }
}

#[test]
fn test_global_flags_after_subcommand() {
    let cli = Cli::try_parse_from([
        "sw",
        "status",
        "--output",
        "json",
        "--project-dir",
        "/tmp/project",
        "--connection",
        "reporting",
    ])
    .unwrap();
    assert_eq!(cli.global.project_dir, "/tmp/project");
    assert_eq!(cli.global.connection.as_deref(), Some("reporting"));
    match cli.command {
        Commands::Status(args) => assert_eq!(args.output, StatusOutput::Json),
        other => panic!("unexpected command: {other:?}"),
    }
}

#[test]
fn test_new_requires_name() {
    assert!(Cli::try_parse_from(["sw", "new"]).is_err());
}

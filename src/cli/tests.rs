use super::*;
use clap::Parser as _;

#[test]
fn check_command_parses_arguments() {
    let cli = Cli::parse_from([
        "examiner", "check", "solution.ex", "student.ex", "--pec", "setup.ex", "--direct",
    ]);
    match cli.command {
        Command::Check {
            solution,
            student,
            pec,
            direct,
            ..
        } => {
            assert_eq!(solution, std::path::PathBuf::from("solution.ex"));
            assert_eq!(student, std::path::PathBuf::from("student.ex"));
            assert_eq!(pec, Some(std::path::PathBuf::from("setup.ex")));
            assert!(direct);
        }
        other => panic!("unexpected command {:?}", other),
    }
}

#[test]
fn worker_command_parses() {
    let cli = Cli::parse_from(["examiner", "worker"]);
    assert!(matches!(cli.command, Command::Worker));
}

#[test]
fn json_flag_is_global() {
    let cli = Cli::parse_from(["examiner", "worker", "--json"]);
    assert!(cli.json);
}

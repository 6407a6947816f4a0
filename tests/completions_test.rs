//! Tests for shell completion generation.

use anyhow::Result;
use clap::{CommandFactory, Parser, ValueEnum};
use clap_complete::Shell;
use instsource::cli::{Cli, Commands, CompletionsArgs};

#[test]
fn test_completions_command_parsing() -> Result<()> {
    let shells = [
        ("bash", Shell::Bash),
        ("zsh", Shell::Zsh),
        ("fish", Shell::Fish),
        ("powershell", Shell::PowerShell),
        ("elvish", Shell::Elvish),
    ];

    for (shell_str, expected_shell) in shells {
        let args = Cli::parse_from(["instsource", "completions", shell_str]);
        match args.command {
            Commands::Completions(opts) => {
                assert_eq!(opts.shell, expected_shell, "Mismatched shell for '{}'", shell_str);
            }
            _ => panic!("Expected Completions command for shell '{}'", shell_str),
        }
    }

    Ok(())
}

#[test]
fn test_completions_generation_for_every_shell() {
    let mut cmd = Cli::command();
    let mut buffer = Vec::new();

    for shell in Shell::value_variants() {
        buffer.clear();
        clap_complete::generate(*shell, &mut cmd, "instsource", &mut buffer);
        assert!(!buffer.is_empty(), "Generated completion for {:?} was empty", shell);
    }
}

#[test]
fn test_run_completions_lists_subcommands() -> Result<()> {
    let test_cases = [
        (Shell::Bash, &["instsource", "setup", "teardown", "status"] as &[_]),
        (Shell::Zsh, &["#compdef instsource", "setup", "export"]),
        (Shell::Fish, &["instsource", "validate", "completions"]),
    ];

    for (shell, patterns) in test_cases {
        let mut buffer = Vec::new();
        instsource::run_completions(&CompletionsArgs { shell }, &mut buffer);
        let output = String::from_utf8(buffer)?;

        for pattern in patterns {
            assert!(
                output.contains(pattern),
                "Pattern '{}' not found in {:?} completions",
                pattern,
                shell
            );
        }
    }

    Ok(())
}

#[test]
fn test_cli_completions_output() -> Result<()> {
    let output = std::process::Command::new(env!("CARGO_BIN_EXE_instsource"))
        .args(["completions", "bash"])
        .output()?;

    assert!(output.status.success(), "completions command failed");
    let stdout = String::from_utf8(output.stdout)?;
    assert!(stdout.contains("instsource"));
    assert!(stdout.contains("--mount-root"));

    Ok(())
}

#[test]
fn test_invalid_shell_rejected() {
    let result = Cli::try_parse_from(["instsource", "completions", "invalid-shell"]);
    assert!(result.is_err(), "Expected parsing to fail for invalid shell");
}

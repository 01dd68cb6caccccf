//! Tests for shell completion functionality.
//!
//! This module tests the completions subcommand, ensuring that:
//! - Completions can be parsed for all supported shells
//! - Generation produces output naming every subcommand
//! - The binary writes completions to stdout

use anyhow::Result;
use clap::{CommandFactory, Parser, ValueEnum};
use clap_complete::{Shell, generate};
use hydroform::cli::{Cli, Commands};

const SUBCOMMANDS: &[&str] = &[
    "provision",
    "deprovision",
    "status",
    "credentials",
    "validate",
    "check-installation",
    "completions",
];

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
        let args = Cli::parse_from(["hydroform", "completions", shell_str]);
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
fn test_completions_generation() -> Result<()> {
    let mut cmd = Cli::command();
    let mut buffer = Vec::new();

    for shell in Shell::value_variants() {
        buffer.clear();
        generate(*shell, &mut cmd, "hydroform", &mut buffer);
        assert!(!buffer.is_empty(), "Generated completion for {:?} was empty", shell);
    }

    Ok(())
}

#[test]
fn test_completion_contents_list_subcommands() -> Result<()> {
    let mut cmd = Cli::command();

    for shell in [Shell::Bash, Shell::Zsh, Shell::Fish] {
        let mut buffer = Vec::new();
        generate(shell, &mut cmd, "hydroform", &mut buffer);
        let output = String::from_utf8(buffer)?;

        for pattern in SUBCOMMANDS {
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
fn test_binary_prints_completions() -> Result<()> {
    let output = std::process::Command::new(env!("CARGO_BIN_EXE_hydroform"))
        .args(["completions", "bash"])
        .output()?;

    assert!(output.status.success(), "completions command failed");
    let stdout = String::from_utf8(output.stdout)?;
    assert!(stdout.contains("hydroform"));
    assert!(stdout.contains("deprovision"));

    Ok(())
}

#[test]
fn test_invalid_shell_rejected() {
    let result = Cli::try_parse_from(["hydroform", "completions", "tcsh"]);
    assert!(result.is_err());
}

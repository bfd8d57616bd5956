//! Command-line interface for presubmit.
//!
//! This module provides the `presubmit` CLI. A bare invocation runs the
//! full check battery; subcommands cover the glue around it:
//! - `init`: write a starter configuration
//! - `run`: run the battery (same as bare invocation)
//! - `list`: show the configured battery
//! - `validate`: validate the configuration file
//! - `config`: show configuration file location and contents
//! - `completions`: generate shell completions

mod commands;

use crate::core::error::Result;
use clap::{Parser, Subcommand};
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

/// Run build/test/lint checks before submitting a change.
#[derive(Debug, Parser)]
#[command(
    name = "presubmit",
    author,
    version,
    about = "Run build/test/lint checks before submitting a change",
    long_about = r#"
presubmit runs a fixed battery of build, test, and lint commands across a
source tree and reports aggregate pass/fail with timing.

A warm-up command primes shared build state first; if it fails, nothing
else runs. The remaining checks execute concurrently as independent
processes. Output is shown only for steps that fail; a green run prints a
single timing line and exits 0.

Checks are read from presubmit.toml (searched upward from the current
directory). Without one, a default Go battery is used.

Environment variables:
  PRESUBMIT_SKIP=1   Skip all checks
"#,
    propagate_version = true
)]
pub struct Cli {
    /// Subcommand to run.
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Enable verbose output.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress non-error output.
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Use color output.
    #[arg(long, global = true, default_value = "auto")]
    pub color: ColorChoice,
}

/// Color output choice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum ColorChoice {
    /// Always use color.
    Always,
    /// Auto-detect color support.
    #[default]
    Auto,
    /// Never use color.
    Never,
}

/// Available subcommands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Write a starter presubmit.toml with the default battery.
    #[command(visible_alias = "i")]
    Init {
        /// Overwrite existing configuration.
        #[arg(short, long)]
        force: bool,
    },

    /// Run the check battery (the default when no subcommand is given).
    #[command(visible_alias = "r")]
    Run {
        /// Emit the run report as JSON instead of human output.
        #[arg(long)]
        json: bool,
    },

    /// List the configured battery.
    #[command(visible_alias = "l")]
    List,

    /// Validate the configuration file.
    #[command(visible_alias = "v")]
    Validate,

    /// Show configuration file location and contents.
    Config {
        /// Output raw TOML.
        #[arg(long)]
        raw: bool,
    },

    /// Generate shell completions.
    Completions {
        /// Shell to generate completions for.
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}

/// Runs the CLI.
pub fn run() -> Result<ExitCode> {
    let cli = Cli::parse();

    // Set up logging
    setup_logging(cli.verbose, cli.quiet);

    // Set up color
    setup_color(cli.color);

    // If no subcommand, run the default action (same as `presubmit run`)
    match cli.command {
        Some(Commands::Init { force }) => commands::init(force),
        Some(Commands::Run { json }) => commands::run(json),
        Some(Commands::List) => commands::list(),
        Some(Commands::Validate) => commands::validate(),
        Some(Commands::Config { raw }) => commands::config(raw),
        Some(Commands::Completions { shell }) => {
            commands::completions(shell);
            Ok(ExitCode::SUCCESS)
        },
        None => commands::run(false),
    }
}

/// Sets up logging based on verbosity flags.
fn setup_logging(verbose: bool, quiet: bool) {
    let filter = if quiet {
        "error"
    } else if verbose {
        "debug"
    } else {
        "info"
    };

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

/// Sets up color output.
fn setup_color(choice: ColorChoice) {
    match choice {
        ColorChoice::Always => {
            console::set_colors_enabled(true);
            console::set_colors_enabled_stderr(true);
        },
        ColorChoice::Never => {
            console::set_colors_enabled(false);
            console::set_colors_enabled_stderr(false);
        },
        ColorChoice::Auto => {
            // Let console crate auto-detect
        },
    }
}

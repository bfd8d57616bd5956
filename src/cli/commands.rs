//! CLI command implementations.

use crate::config::{Config, CONFIG_FILE_NAME};
use crate::core::error::{Error, Result};
use crate::core::launcher;
use crate::core::orchestrator::{Orchestrator, RunReport};
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use std::io::Write;
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

/// Write a starter configuration.
pub fn init(force: bool) -> Result<ExitCode> {
    let config_path = PathBuf::from(CONFIG_FILE_NAME);

    if config_path.exists() && !force {
        eprintln!(
            "{} Configuration already exists: {}",
            style("!").yellow(),
            config_path.display()
        );
        eprintln!("  Use --force to overwrite.");
        return Ok(ExitCode::FAILURE);
    }

    std::fs::write(&config_path, Config::default_toml())
        .map_err(|e| Error::io("write config", e))?;

    eprintln!("{} Created {}", style("✓").green(), config_path.display());
    eprintln!("\nNext steps:");
    eprintln!("  1. Review and customize {CONFIG_FILE_NAME}");
    eprintln!("  2. Run: presubmit");

    Ok(ExitCode::SUCCESS)
}

/// Run the check battery.
pub fn run(json: bool) -> Result<ExitCode> {
    // Check for skip
    if std::env::var("PRESUBMIT_SKIP").ok().as_deref() == Some("1") {
        eprintln!("{} Skipping checks (PRESUBMIT_SKIP=1)", style("•").cyan());
        return Ok(ExitCode::SUCCESS);
    }

    let config = Config::load_or_default()?;
    let orchestrator = Orchestrator::new(config);

    // Spinner ticks on its own thread while the run blocks.
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.cyan} {msg}")
            .ok()
            .unwrap_or_else(ProgressStyle::default_spinner),
    );
    pb.set_message("Running presubmit checks...");
    pb.enable_steady_tick(Duration::from_millis(100));

    let report = tokio::runtime::Runtime::new()
        .map_err(|e| Error::Internal {
            message: format!("Failed to create runtime: {e}"),
        })?
        .block_on(orchestrator.run());

    pb.finish_and_clear();

    let report = report?;

    if json {
        let rendered = serde_json::to_string_pretty(&report).map_err(|e| Error::Internal {
            message: format!("Failed to serialize report: {e}"),
        })?;
        println!("{rendered}");
        return Ok(if report.success() {
            ExitCode::SUCCESS
        } else {
            ExitCode::FAILURE
        });
    }

    Ok(render_report(&report))
}

/// Renders the report: failing output verbatim, a single timing line when
/// everything passed, nothing else.
fn render_report(report: &RunReport) -> ExitCode {
    for outcome in report.failed_checks() {
        eprintln!("{} {}", style("✗").red().bold(), outcome.name);
        if !outcome.output.is_empty() {
            print!("{}", outcome.output);
        }
    }

    if report.success() {
        println!(
            "Presubmit checks succeeded in {:.3}s!",
            report.elapsed.as_secs_f64()
        );
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}

/// List the configured battery.
pub fn list() -> Result<ExitCode> {
    let config = Config::load_or_default()?;

    eprintln!("{}", style("Warm-up:").bold());
    print_step(
        "warmup",
        &config.warmup.command,
        &config.warmup.dir,
        false,
    );

    eprintln!();
    eprintln!("{}", style("Checks:").bold());
    for check in &config.checks {
        print_step(
            &check.name,
            &check.command,
            &check.dir,
            check.recovery.is_some(),
        );
    }

    Ok(ExitCode::SUCCESS)
}

/// Prints one battery entry with tool availability.
fn print_step(name: &str, command: &[String], dir: &str, has_recovery: bool) {
    let availability = match command.first() {
        Some(program) if launcher::command_exists(program) => style("found").green(),
        Some(_) if has_recovery => style("installed on demand").yellow(),
        Some(_) => style("missing").red(),
        None => style("empty command").red(),
    };

    eprintln!(
        "  {} - `{}` in {} ({})",
        style(name).cyan(),
        command.join(" "),
        dir,
        availability
    );
}

/// Validate the configuration file.
pub fn validate() -> Result<ExitCode> {
    let config = match Config::load() {
        Ok(config) => config,
        Err(Error::ConfigNotFound { path }) => {
            eprintln!(
                "{} Configuration not found: {}",
                style("!").yellow(),
                path.display()
            );
            eprintln!("  Run: presubmit init");
            return Ok(ExitCode::FAILURE);
        },
        Err(e) => {
            eprintln!("{} Failed to load configuration: {e}", style("✗").red());
            return Ok(ExitCode::FAILURE);
        },
    };

    // Structural validation already ran in load(); surface the issues a
    // run would only hit at spawn time.
    let mut warnings = 0;
    for check in &config.checks {
        let dir = config.root.join(&check.dir);
        if !dir.is_dir() {
            eprintln!(
                "{} check `{}`: working directory {} does not exist",
                style("!").yellow(),
                check.name,
                dir.display()
            );
            warnings += 1;
        }
    }

    eprintln!("{} Configuration is valid", style("✓").green());
    if warnings > 0 {
        eprintln!("  ({warnings} warning(s) above)");
    }

    Ok(ExitCode::SUCCESS)
}

/// Show configuration.
pub fn config(raw: bool) -> Result<ExitCode> {
    match Config::find_config_file() {
        Ok(path) => {
            eprintln!("Configuration file: {}", path.display());

            if raw {
                let content =
                    std::fs::read_to_string(&path).map_err(|e| Error::io("read config", e))?;
                eprintln!();
                std::io::stdout()
                    .write_all(content.as_bytes())
                    .map_err(|e| Error::io("write output", e))?;
            }

            Ok(ExitCode::SUCCESS)
        },
        Err(Error::ConfigNotFound { .. }) => {
            eprintln!("{} No configuration file found", style("!").yellow());
            eprintln!("  Run: presubmit init");
            Ok(ExitCode::FAILURE)
        },
        Err(e) => Err(e),
    }
}

/// Generate shell completions.
pub fn completions(shell: clap_complete::Shell) {
    use clap::CommandFactory;
    clap_complete::generate(
        shell,
        &mut super::Cli::command(),
        "presubmit",
        &mut std::io::stdout(),
    );
}

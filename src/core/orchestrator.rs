//! The presubmit run: warm-up, fan-out, collect.
//!
//! Three phases, no loops back. The warm-up step runs to completion first
//! and gates everything - it primes shared build state, so when it fails
//! the remaining checks would fail identically and none is started. The
//! fan-out phase launches every check before any is drained, overlapping
//! their wall-clock execution as independent OS processes. The collect
//! phase drains them in configuration order and folds the results into a
//! [`RunReport`], the structured value the CLI renders.

use crate::config::Config;
use crate::core::error::{Error, Result};
use crate::core::launcher::{self, DrainResult, RunningProcess};
use crate::core::recovery::Recovery;
use serde::Serialize;
use std::time::{Duration, Instant};

/// Per-check fold of a drain (or launch failure) into the report.
#[derive(Debug, Clone, Serialize)]
pub struct CheckOutcome {
    /// Name of the check.
    pub name: String,
    /// True iff the check ran and exited zero.
    pub succeeded: bool,
    /// Captured combined output; for a check that never started, the
    /// launch error text.
    pub output: String,
    /// Wall time from launch to exit.
    #[serde(rename = "duration_secs", serialize_with = "duration_secs")]
    pub duration: Duration,
}

impl CheckOutcome {
    fn from_drain(name: impl Into<String>, drained: DrainResult) -> Self {
        Self {
            name: name.into(),
            succeeded: drained.succeeded,
            output: drained.output,
            duration: drained.duration,
        }
    }

    /// Outcome for a check that could not be launched. The install output
    /// of a failed recovery rides along so the operator sees why.
    fn never_started(name: impl Into<String>, error: &Error) -> Self {
        let mut output = error.to_string();
        output.push('\n');
        if let Error::Install {
            output: install_output,
            ..
        } = error
        {
            output.push_str(install_output);
        }

        Self {
            name: name.into(),
            succeeded: false,
            output,
            duration: Duration::ZERO,
        }
    }
}

/// Aggregate result of one orchestrator invocation.
#[derive(Debug, Serialize)]
pub struct RunReport {
    /// Outcome of the warm-up step.
    pub warmup: CheckOutcome,
    /// Outcomes of the fan-out checks, in configuration order. Empty when
    /// the warm-up failed and the fan-out never started.
    pub checks: Vec<CheckOutcome>,
    /// Wall time of the whole run.
    #[serde(rename = "elapsed_secs", serialize_with = "duration_secs")]
    pub elapsed: Duration,
}

impl RunReport {
    /// Returns true iff the warm-up and every check succeeded.
    #[must_use]
    pub fn success(&self) -> bool {
        self.warmup.succeeded && self.checks.iter().all(|c| c.succeeded)
    }

    /// Returns the number of failed steps, warm-up included.
    #[must_use]
    pub fn failed_count(&self) -> usize {
        self.failed_checks().count()
    }

    /// Returns the failed steps in report order, warm-up first.
    pub fn failed_checks(&self) -> impl Iterator<Item = &CheckOutcome> {
        std::iter::once(&self.warmup)
            .chain(self.checks.iter())
            .filter(|c| !c.succeeded)
    }
}

fn duration_secs<S>(duration: &Duration, serializer: S) -> std::result::Result<S::Ok, S::Error>
where
    S: serde::Serializer,
{
    serializer.serialize_f64(duration.as_secs_f64())
}

/// A fan-out slot: either a live process to drain or a check that never
/// started, already folded.
#[derive(Debug)]
enum Launched {
    Running(RunningProcess),
    NeverStarted(CheckOutcome),
}

/// Runs the configured battery.
#[derive(Debug)]
pub struct Orchestrator {
    config: Config,
}

impl Orchestrator {
    /// Creates an orchestrator for the given configuration. The root
    /// directory travels inside the config; nothing is read from ambient
    /// process state during the run.
    #[must_use]
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    /// Runs warm-up, fan-out, and collect, and returns the report.
    ///
    /// Check failures are data in the report, not errors; `Err` is
    /// reserved for run-level breakage (I/O on the orchestrator's side).
    pub async fn run(&self) -> Result<RunReport> {
        let start = Instant::now();

        let warmup = self.run_warmup().await?;
        if !warmup.succeeded {
            tracing::debug!("warm-up failed, skipping all checks");
            return Ok(RunReport {
                warmup,
                checks: Vec::new(),
                elapsed: start.elapsed(),
            });
        }

        let launched = self.fan_out().await?;
        let checks = collect(launched).await?;

        Ok(RunReport {
            warmup,
            checks,
            elapsed: start.elapsed(),
        })
    }

    /// Launches the warm-up step and drains it immediately.
    async fn run_warmup(&self) -> Result<CheckOutcome> {
        let spec = self.config.warmup_spec();
        match launcher::launch(&spec) {
            Ok(process) => Ok(CheckOutcome::from_drain(spec.name, process.drain().await?)),
            Err(e) if e.is_check_scoped() => Ok(CheckOutcome::never_started(spec.name, &e)),
            Err(e) => Err(e),
        }
    }

    /// Launches every check before any is drained. The drain order (and
    /// thus reporting order) is fixed by configuration regardless of how
    /// the processes finish.
    async fn fan_out(&self) -> Result<Vec<Launched>> {
        let mut launched = Vec::with_capacity(self.config.checks.len());

        for check in &self.config.checks {
            let spec = self.config.check_spec(check);

            let attempt = match &check.recovery {
                Some(recovery) => {
                    Recovery::new(recovery.install.clone())
                        .launch(&spec)
                        .await
                },
                None => launcher::launch(&spec),
            };

            launched.push(match attempt {
                Ok(process) => Launched::Running(process),
                Err(e) if e.is_check_scoped() => {
                    Launched::NeverStarted(CheckOutcome::never_started(&check.name, &e))
                },
                Err(e) => return Err(e),
            });
        }

        Ok(launched)
    }
}

/// Drains each slot in order. Every live process is drained even when an
/// earlier one already failed - the operator sees every failure in one
/// run.
async fn collect(launched: Vec<Launched>) -> Result<Vec<CheckOutcome>> {
    let mut outcomes = Vec::with_capacity(launched.len());

    for slot in launched {
        match slot {
            Launched::Running(process) => {
                let name = process.name().to_string();
                let drained = process.drain().await?;
                outcomes.push(CheckOutcome::from_drain(name, drained));
            },
            Launched::NeverStarted(outcome) => outcomes.push(outcome),
        }
    }

    Ok(outcomes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{CheckConfig, RecoveryConfig, WarmupConfig};
    use std::path::Path;

    fn strings(parts: &[&str]) -> Vec<String> {
        parts.iter().map(ToString::to_string).collect()
    }

    fn sh(script: &str) -> Vec<String> {
        strings(&["sh", "-c", script])
    }

    fn check(name: &str, command: Vec<String>) -> CheckConfig {
        CheckConfig {
            name: name.to_string(),
            command,
            ..CheckConfig::default()
        }
    }

    fn config_in(root: &Path, warmup: Vec<String>, checks: Vec<CheckConfig>) -> Config {
        Config {
            root: root.to_path_buf(),
            warmup: WarmupConfig {
                command: warmup,
                dir: ".".to_string(),
            },
            checks,
        }
    }

    #[tokio::test]
    async fn test_all_passing_run_succeeds() {
        let temp = tempfile::TempDir::new().expect("create temp dir");
        let config = config_in(
            temp.path(),
            strings(&["true"]),
            vec![
                check("first", sh("echo quiet-pass")),
                check("second", strings(&["true"])),
            ],
        );

        let report = Orchestrator::new(config).run().await.expect("run");
        assert!(report.success());
        assert_eq!(report.checks.len(), 2);
        assert_eq!(report.failed_count(), 0);
    }

    #[tokio::test]
    async fn test_warmup_failure_skips_fan_out() {
        let temp = tempfile::TempDir::new().expect("create temp dir");
        let marker = temp.path().join("fanned-out");
        let config = config_in(
            temp.path(),
            sh("echo priming broke; exit 1"),
            vec![check("spy", sh(&format!("touch {}", marker.display())))],
        );

        let report = Orchestrator::new(config).run().await.expect("run");
        assert!(!report.success());
        assert!(report.checks.is_empty());
        assert!(report.warmup.output.contains("priming broke"));
        assert!(!marker.exists(), "no check may launch after warm-up failure");
    }

    #[tokio::test]
    async fn test_warmup_spawn_failure_is_fatal_for_run() {
        let temp = tempfile::TempDir::new().expect("create temp dir");
        let marker = temp.path().join("fanned-out");
        let config = config_in(
            temp.path(),
            strings(&["definitely_not_a_real_command_12345"]),
            vec![check("spy", sh(&format!("touch {}", marker.display())))],
        );

        let report = Orchestrator::new(config).run().await.expect("run");
        assert!(!report.success());
        assert!(!report.warmup.succeeded);
        assert!(report.checks.is_empty());
        assert!(!marker.exists());
    }

    #[tokio::test]
    async fn test_one_failure_still_drains_siblings() {
        let temp = tempfile::TempDir::new().expect("create temp dir");
        let first = temp.path().join("first-ran");
        let third = temp.path().join("third-ran");
        let config = config_in(
            temp.path(),
            strings(&["true"]),
            vec![
                check("first", sh(&format!("touch {}", first.display()))),
                check("lint", sh("echo 'FAIL: lint error line 10'; exit 1")),
                check("third", sh(&format!("touch {}", third.display()))),
            ],
        );

        let report = Orchestrator::new(config).run().await.expect("run");
        assert!(!report.success());
        assert_eq!(report.checks.len(), 3);
        assert_eq!(report.failed_count(), 1);
        assert!(first.exists());
        assert!(third.exists());

        let failed: Vec<_> = report.failed_checks().collect();
        assert_eq!(failed.len(), 1);
        assert_eq!(failed[0].name, "lint");
        assert!(failed[0].output.contains("FAIL: lint error line 10"));
    }

    #[tokio::test]
    async fn test_spawn_failure_of_one_check_does_not_stop_siblings() {
        let temp = tempfile::TempDir::new().expect("create temp dir");
        let config = config_in(
            temp.path(),
            strings(&["true"]),
            vec![
                check("missing", strings(&["definitely_not_a_real_command_12345"])),
                check("present", sh("echo still-here")),
            ],
        );

        let report = Orchestrator::new(config).run().await.expect("run");
        assert!(!report.success());
        assert_eq!(report.checks.len(), 2);
        assert!(!report.checks[0].succeeded);
        assert!(report.checks[0].output.contains("Could not start"));
        assert!(report.checks[1].succeeded);
    }

    #[tokio::test]
    async fn test_report_preserves_configuration_order() {
        let temp = tempfile::TempDir::new().expect("create temp dir");
        // The first check finishes last; drain order must still follow
        // configuration order.
        let config = config_in(
            temp.path(),
            strings(&["true"]),
            vec![
                check("slow", sh("sleep 0.4; echo slow-done")),
                check("fast", sh("echo fast-done")),
            ],
        );

        let report = Orchestrator::new(config).run().await.expect("run");
        let names: Vec<_> = report.checks.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["slow", "fast"]);
    }

    #[tokio::test]
    async fn test_checks_overlap_in_wall_clock() {
        let temp = tempfile::TempDir::new().expect("create temp dir");
        let config = config_in(
            temp.path(),
            strings(&["true"]),
            vec![
                check("sleep-a", sh("sleep 1")),
                check("sleep-b", sh("sleep 1")),
            ],
        );

        let report = Orchestrator::new(config).run().await.expect("run");
        assert!(report.success());
        // Sequential execution would take 2s or more.
        assert!(
            report.elapsed < Duration::from_millis(1900),
            "checks did not overlap: elapsed {:?}",
            report.elapsed
        );
    }

    #[tokio::test]
    async fn test_recovery_wired_check_installs_and_passes() {
        let temp = tempfile::TempDir::new().expect("create temp dir");
        let tool = temp.path().join("aux-lint").display().to_string();

        let config = config_in(
            temp.path(),
            strings(&["true"]),
            vec![CheckConfig {
                name: "aux-lint".to_string(),
                command: vec![tool.clone()],
                recovery: Some(RecoveryConfig {
                    install: sh(&format!(
                        "printf '#!/bin/sh\\nexit 0\\n' > {tool} && chmod +x {tool}"
                    )),
                }),
                ..CheckConfig::default()
            }],
        );

        let report = Orchestrator::new(config).run().await.expect("run");
        assert!(report.success(), "recovered check should pass");
    }

    #[tokio::test]
    async fn test_failed_install_reports_check_failed_with_output() {
        let temp = tempfile::TempDir::new().expect("create temp dir");
        let tool = temp.path().join("aux-lint").display().to_string();

        let config = config_in(
            temp.path(),
            strings(&["true"]),
            vec![
                CheckConfig {
                    name: "aux-lint".to_string(),
                    command: vec![tool],
                    recovery: Some(RecoveryConfig {
                        install: sh("echo registry unreachable; exit 1"),
                    }),
                    ..CheckConfig::default()
                },
                check("sibling", strings(&["true"])),
            ],
        );

        let report = Orchestrator::new(config).run().await.expect("run");
        assert!(!report.success());
        assert!(!report.checks[0].succeeded);
        assert!(report.checks[0].output.contains("registry unreachable"));
        assert!(report.checks[1].succeeded, "sibling unaffected");
    }

    #[test]
    fn test_report_success_accounting() {
        let passed = CheckOutcome {
            name: "ok".to_string(),
            succeeded: true,
            output: String::new(),
            duration: Duration::ZERO,
        };
        let failed = CheckOutcome {
            name: "bad".to_string(),
            succeeded: false,
            output: "boom\n".to_string(),
            duration: Duration::ZERO,
        };

        let report = RunReport {
            warmup: passed.clone(),
            checks: vec![passed.clone(), failed, passed],
            elapsed: Duration::from_secs(2),
        };

        assert!(!report.success());
        assert_eq!(report.failed_count(), 1);
        assert_eq!(report.failed_checks().next().map(|c| c.name.as_str()), Some("bad"));
    }

    #[test]
    fn test_report_counts_failed_warmup() {
        let report = RunReport {
            warmup: CheckOutcome {
                name: "warmup".to_string(),
                succeeded: false,
                output: "no deps\n".to_string(),
                duration: Duration::ZERO,
            },
            checks: Vec::new(),
            elapsed: Duration::ZERO,
        };

        assert!(!report.success());
        assert_eq!(report.failed_count(), 1);
    }

    #[test]
    fn test_report_serializes_durations_as_seconds() {
        let report = RunReport {
            warmup: CheckOutcome {
                name: "warmup".to_string(),
                succeeded: true,
                output: String::new(),
                duration: Duration::from_millis(250),
            },
            checks: Vec::new(),
            elapsed: Duration::from_millis(1500),
        };

        let json = serde_json::to_value(&report).expect("serialize");
        assert_eq!(json["elapsed_secs"], serde_json::json!(1.5));
        assert_eq!(json["warmup"]["duration_secs"], serde_json::json!(0.25));
    }
}

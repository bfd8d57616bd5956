//! Tool-acquisition fallback for one check.
//!
//! Most checks require tools a contributor already has. For a check whose
//! tool may be absent (an auxiliary linter), [`Recovery`] wraps the plain
//! launch: on a spawn failure it installs the tool and retries the launch
//! once. A cold environment self-heals at the cost of one synchronous
//! install; a warm one never notices.

use crate::core::error::{Error, Result};
use crate::core::launcher::{self, CheckSpec, RunningProcess};

/// Retry-once launch strategy wrapping a tool installation command.
///
/// The install command runs with no working-directory override and is
/// drained synchronously before the launch is retried.
#[derive(Debug, Clone)]
pub struct Recovery {
    install: Vec<String>,
}

impl Recovery {
    /// Creates a recovery strategy from an installation command.
    #[must_use]
    pub fn new(install: Vec<String>) -> Self {
        Self { install }
    }

    /// Attempts to launch the check, installing its tool and retrying once
    /// if the first launch cannot start.
    ///
    /// State transitions:
    /// - first launch succeeds: return the process, install never runs;
    /// - first launch raises [`Error::Spawn`]: warn, run the install
    ///   command and drain it;
    /// - install exits non-zero: [`Error::Install`] carrying its captured
    ///   output, the launch is not retried;
    /// - install succeeds: retry the launch once; a second
    ///   [`Error::Spawn`] propagates.
    pub async fn launch(&self, spec: &CheckSpec) -> Result<RunningProcess> {
        match launcher::launch(spec) {
            Ok(process) => Ok(process),
            Err(Error::Spawn { .. }) => {
                tracing::warn!(
                    tool = spec.program().unwrap_or_default(),
                    install = %self.install.join(" "),
                    "check tool not available, installing"
                );
                self.install_tool().await?;
                launcher::launch(spec)
            },
            Err(e) => Err(e),
        }
    }

    /// Runs the installation command to completion.
    async fn install_tool(&self) -> Result<()> {
        let process = launcher::launch_command("install", &self.install, None)?;
        let result = process.drain().await?;

        if result.succeeded {
            Ok(())
        } else {
            Err(Error::Install {
                command: self.install.join(" "),
                output: result.output,
            })
        }
    }
}

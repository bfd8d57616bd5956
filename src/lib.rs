//! # presubmit
//!
//! A local presubmit orchestrator: runs a fixed battery of build/test/lint
//! checks across a small multi-module source tree and reports aggregate
//! pass/fail with timing, so a change can be validated before submission.
//!
//! A run has three phases. A warm-up command primes shared build state and
//! gates everything behind it. The remaining checks are then launched all
//! at once as independent OS processes and drained one by one in
//! configuration order, so their wall-clock execution overlaps while
//! failure reporting stays deterministic. Output is captured and only
//! surfaced for steps that fail; a fully green run prints a single timing
//! line.
//!
//! One check may carry a recovery command: if its tool cannot be started,
//! the tool is installed and the launch retried once.
//!
//! ## Example
//!
//! ```rust,no_run
//! use presubmit::{Config, Orchestrator};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), presubmit::Error> {
//!     let config = Config::load_or_default()?;
//!     let report = Orchestrator::new(config).run().await?;
//!
//!     if report.success() {
//!         println!(
//!             "Presubmit checks succeeded in {:.3}s!",
//!             report.elapsed.as_secs_f64()
//!         );
//!         Ok(())
//!     } else {
//!         std::process::exit(1);
//!     }
//! }
//! ```

pub mod cli;
pub mod config;
pub mod core;

// Re-export main types for convenience
pub use crate::config::Config;
pub use crate::core::error::{Error, Result};
pub use crate::core::launcher::{CheckSpec, DrainResult, RunningProcess};
pub use crate::core::orchestrator::{CheckOutcome, Orchestrator, RunReport};
pub use crate::core::recovery::Recovery;

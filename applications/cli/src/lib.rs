//! Mastering CLI
//!
//! Library half of the `master` binary: argument parsing, layered
//! configuration and the batch runner. Kept separate from `main.rs` so the
//! integration tests can drive it without spawning a process.

pub mod args;
pub mod config;
pub mod error;
pub mod jobs;

pub use self::args::{Cli, MasteringArgs};
pub use self::config::{CliSettings, OutputSettings, DEFAULT_CONFIG_FILE, ENV_PREFIX};
pub use self::error::{CliError, Result};
pub use self::jobs::{master_file, output_path_for, plan_jobs, run_jobs, Job, JobOutcome, RunSettings};

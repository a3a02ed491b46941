//! Common test infrastructure for `aibench_report`.
//!
//! - Test logging with auto-dump on failure
//! - A harness owning a temp directory
//! - Builders for result artifacts

pub mod fixtures;
pub mod harness;
pub mod logging;

#[allow(unused_imports)]
pub use fixtures::{ArtifactBuilder, cpu_snapshot};
#[allow(unused_imports)]
pub use harness::{CliResult, TestHarness, run_cli};

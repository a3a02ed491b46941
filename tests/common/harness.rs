//! Test harness for consistent setup/teardown and auto-logging.
//!
//! `TestHarness` owns a temporary directory and a [`TestLogger`]; logs are
//! dumped to stderr if the test panics.
//!
//! ```ignore
//! let harness = TestHarness::new("results_report_pivots");
//! let dir = harness.create_dir("results");
//! harness.create_file("results/run_w4_auto.json", artifact.to_string());
//! ```

#![allow(dead_code)]

use super::logging::TestLogger;
use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::TempDir;

pub struct TestHarness {
    name: String,
    temp_dir: TempDir,
    logger: TestLogger,
}

impl TestHarness {
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let logger = TestLogger::new();
        logger.info("harness", format!("Test '{name}' started"));
        logger.info_ctx("harness", "Temp directory created", |ctx| {
            ctx.push(("path".into(), temp_dir.path().display().to_string()));
        });
        Self {
            name,
            temp_dir,
            logger,
        }
    }

    pub fn log(&self) -> &TestLogger {
        &self.logger
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn temp_dir(&self) -> &Path {
        self.temp_dir.path()
    }

    pub fn temp_path(&self, path: impl AsRef<Path>) -> PathBuf {
        self.temp_dir.path().join(path)
    }

    /// Create a file (and its parent directories) under the temp directory.
    pub fn create_file(&self, name: impl AsRef<Path>, content: impl AsRef<[u8]>) -> PathBuf {
        let path = self.temp_path(name);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).expect("Failed to create parent directories");
        }
        let content = content.as_ref();
        std::fs::write(&path, content).expect("Failed to create test file");
        self.logger.info_ctx("harness", "Created test file", |ctx| {
            ctx.push(("path".into(), path.display().to_string()));
            ctx.push(("size".into(), format!("{} bytes", content.len())));
        });
        path
    }

    pub fn create_dir(&self, name: impl AsRef<Path>) -> PathBuf {
        let path = self.temp_path(name);
        std::fs::create_dir_all(&path).expect("Failed to create test directory");
        self.logger.info_ctx("harness", "Created test directory", |ctx| {
            ctx.push(("path".into(), path.display().to_string()));
        });
        path
    }

    pub fn read_file(&self, name: impl AsRef<Path>) -> String {
        let path = self.temp_path(name);
        std::fs::read_to_string(&path).expect("Failed to read test file")
    }

    pub fn section(&self, name: &str) {
        self.logger.info("section", format!("=== {name} ==="));
    }

    pub fn dump_logs(&self) {
        eprintln!("\n=== TEST LOGS: {} ===", self.name);
        eprint!("{}", self.logger.dump());
        eprintln!("=== END LOGS ===\n");
    }
}

impl Drop for TestHarness {
    fn drop(&mut self) {
        self.logger.info_ctx("harness", "Test completing", |ctx| {
            ctx.push((
                "elapsed".into(),
                format!("{:.3}s", self.logger.elapsed().as_secs_f64()),
            ));
        });
        if std::thread::panicking() {
            self.dump_logs();
        }
    }
}

/// Captured result of one CLI invocation.
#[derive(Debug)]
pub struct CliResult {
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
}

/// Run the `aibench-report` binary with the harness temp dir as cwd.
pub fn run_cli(harness: &TestHarness, args: &[&str]) -> CliResult {
    let output = Command::new(env!("CARGO_BIN_EXE_aibench-report"))
        .args(args)
        .current_dir(harness.temp_dir())
        .env_remove("AIBENCH_REPORT_CONFIG")
        .env("RUST_LOG", "warn")
        .output()
        .expect("run aibench-report");
    let result = CliResult {
        exit_code: output.status.code().unwrap_or(-1),
        stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
        stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
    };
    harness.log().info_ctx("cli", "aibench-report finished", |ctx| {
        ctx.push(("args".into(), args.join(" ")));
        ctx.push(("exit_code".into(), result.exit_code.to_string()));
        ctx.push(("stderr".into(), result.stderr.clone()));
    });
    result
}

//! Test logging that is dumped when a test fails.
//!
//! Each entry records elapsed time, level, category and message, plus
//! optional key-value context:
//!
//! ```text
//! [   0.001s] INFO  [setup] Writing artifact
//!            path = /tmp/.../run_w4_auto.json
//! ```

#![allow(dead_code)]

use std::fmt::Write as _;
use std::sync::Mutex;
use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LogLevel {
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Debug => "DEBUG",
            Self::Info => "INFO ",
            Self::Warn => "WARN ",
            Self::Error => "ERROR",
        }
    }
}

#[derive(Debug, Clone)]
pub struct LogEntry {
    pub elapsed_ms: u64,
    pub level: LogLevel,
    pub category: String,
    pub message: String,
    pub context: Vec<(String, String)>,
}

impl LogEntry {
    pub fn format(&self) -> String {
        #[allow(clippy::cast_precision_loss)]
        let seconds = self.elapsed_ms as f64 / 1000.0;
        let mut output = format!(
            "[{seconds:>8.3}s] {} [{}] {}\n",
            self.level.as_str(),
            self.category,
            self.message
        );
        for (key, value) in &self.context {
            let _ = writeln!(output, "           {key} = {value}");
        }
        output
    }
}

/// Thread-safe in-memory log for one test.
pub struct TestLogger {
    entries: Mutex<Vec<LogEntry>>,
    start: Instant,
    min_level: LogLevel,
}

impl Default for TestLogger {
    fn default() -> Self {
        Self::new()
    }
}

impl TestLogger {
    #[must_use]
    pub fn new() -> Self {
        Self::with_min_level(LogLevel::Debug)
    }

    #[must_use]
    pub fn with_min_level(min_level: LogLevel) -> Self {
        Self {
            entries: Mutex::new(Vec::with_capacity(64)),
            start: Instant::now(),
            min_level,
        }
    }

    fn elapsed_ms(&self) -> u64 {
        u64::try_from(self.start.elapsed().as_millis()).unwrap_or(u64::MAX)
    }

    pub fn with_context<F>(&self, level: LogLevel, category: &str, message: impl Into<String>, f: F)
    where
        F: FnOnce(&mut Vec<(String, String)>),
    {
        if level < self.min_level {
            return;
        }
        let mut context = Vec::new();
        f(&mut context);
        let entry = LogEntry {
            elapsed_ms: self.elapsed_ms(),
            level,
            category: category.to_string(),
            message: message.into(),
            context,
        };
        self.entries.lock().unwrap().push(entry);
    }

    pub fn log(&self, level: LogLevel, category: &str, message: impl Into<String>) {
        self.with_context(level, category, message, |_| {});
    }

    pub fn debug(&self, category: &str, message: impl Into<String>) {
        self.log(LogLevel::Debug, category, message);
    }

    pub fn info(&self, category: &str, message: impl Into<String>) {
        self.log(LogLevel::Info, category, message);
    }

    pub fn warn(&self, category: &str, message: impl Into<String>) {
        self.log(LogLevel::Warn, category, message);
    }

    pub fn info_ctx<F>(&self, category: &str, message: impl Into<String>, f: F)
    where
        F: FnOnce(&mut Vec<(String, String)>),
    {
        self.with_context(LogLevel::Info, category, message, f);
    }

    pub fn debug_ctx<F>(&self, category: &str, message: impl Into<String>, f: F)
    where
        F: FnOnce(&mut Vec<(String, String)>),
    {
        self.with_context(LogLevel::Debug, category, message, f);
    }

    pub fn entry_count(&self) -> usize {
        self.entries.lock().unwrap().len()
    }

    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }

    /// All entries formatted as plain text.
    pub fn dump(&self) -> String {
        self.entries
            .lock()
            .unwrap()
            .iter()
            .map(LogEntry::format)
            .collect()
    }
}


//! Run artifact discovery and parsing.
//!
//! Artifacts are the JSON documents the load generator writes at the end of
//! a run. A scan lists one directory (not recursive), keeps files with the
//! artifact extension whose name contains the filter, and parses each one.
//! A file that fails to parse is skipped with a warning; the scan only fails
//! when the directory itself cannot be read.

use crate::error::{Error, Result};
use crate::sample::{RunSummary, RuntimeSample};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fs;
use std::path::{Path, PathBuf};

pub const DEFAULT_ARTIFACT_EXTENSION: &str = "json";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanOptions {
    /// Substring the file name must contain; empty matches everything.
    pub filter: String,
    /// Artifact file extension, without the dot.
    pub extension: String,
}

impl Default for ScanOptions {
    fn default() -> Self {
        Self {
            filter: String::new(),
            extension: DEFAULT_ARTIFACT_EXTENSION.to_string(),
        }
    }
}

impl ScanOptions {
    #[must_use]
    pub fn with_filter(filter: impl Into<String>) -> Self {
        Self {
            filter: filter.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn matches(&self, path: &Path) -> bool {
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            return false;
        };
        let extension_ok = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case(self.extension.trim_start_matches('.')));
        extension_ok && (self.filter.is_empty() || name.contains(&self.filter))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkippedArtifact {
    pub path: PathBuf,
    pub reason: String,
}

#[derive(Debug, Default)]
pub struct IngestOutcome {
    pub runs: Vec<RunSummary>,
    pub skipped: Vec<SkippedArtifact>,
}

impl IngestOutcome {
    /// Fail with a "no data" error when nothing parsed.
    pub fn ensure_nonempty(&self, dir: &Path) -> Result<()> {
        if self.runs.is_empty() {
            return Err(Error::empty_result_set(format!(
                "no result artifacts parsed in {} ({} skipped)",
                dir.display(),
                self.skipped.len()
            )));
        }
        Ok(())
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Wire format
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum FlagValue {
    Int(i64),
    Bool(bool),
}

impl From<FlagValue> for i64 {
    fn from(value: FlagValue) -> Self {
        match value {
            FlagValue::Int(v) => v,
            FlagValue::Bool(b) => Self::from(b),
        }
    }
}

#[derive(Debug, Deserialize)]
struct OverallRates {
    #[serde(rename = "overallOpsRate")]
    overall_ops_rate: f64,
}

#[derive(Debug, Deserialize)]
struct QuantileSet {
    q50: f64,
}

#[derive(Debug, Deserialize)]
struct OverallQuantiles {
    #[serde(rename = "AllQueries")]
    all_queries: QuantileSet,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ArtifactDocument {
    workers: u32,
    metadata_autobatching: FlagValue,
    tensor_batch_size: u64,
    overall_rates: OverallRates,
    overall_quantiles: OverallQuantiles,
    #[serde(default)]
    server_run_time_stats: Option<Map<String, Value>>,
    #[serde(default)]
    test_description: Option<String>,
    #[serde(default)]
    duration_millis: Option<i64>,
    #[serde(default)]
    limit: Option<u64>,
    #[serde(default)]
    max_rps: Option<u64>,
}

// ────────────────────────────────────────────────────────────────────────────
// Parsing
// ────────────────────────────────────────────────────────────────────────────

pub fn parse_artifact(path: &Path, text: &str) -> Result<RunSummary> {
    let doc: ArtifactDocument =
        serde_json::from_str(text).map_err(|err| Error::artifact_parse(path, err.to_string()))?;

    let runtime_samples = match &doc.server_run_time_stats {
        Some(stats) => {
            RuntimeSample::parse_series(stats).map_err(|msg| Error::artifact_parse(path, msg))?
        }
        None => Vec::new(),
    };

    Ok(RunSummary {
        source_path: path.to_path_buf(),
        workers: doc.workers,
        autobatching: doc.metadata_autobatching.into(),
        tensor_batch_size: doc.tensor_batch_size,
        overall_ops_rate: doc.overall_rates.overall_ops_rate,
        p50_latency_ms: doc.overall_quantiles.all_queries.q50,
        runtime_samples,
        test_description: doc.test_description,
        duration_millis: doc.duration_millis,
        limit: doc.limit,
        max_rps: doc.max_rps,
    })
}

/// Open, fully read and close one artifact.
pub fn load_artifact(path: &Path) -> Result<RunSummary> {
    let text = fs::read_to_string(path)
        .map_err(|err| Error::artifact_parse(path, format!("reading artifact: {err}")))?;
    parse_artifact(path, &text)
}

/// Matching artifact paths in a directory, plus entries that could not be inspected.
#[derive(Debug, Default)]
pub struct ArtifactListing {
    /// Regular files (symlinks followed), sorted by file name.
    pub paths: Vec<PathBuf>,
    pub skipped: Vec<SkippedArtifact>,
}

/// List matching artifacts in `dir`. Only failing to open `dir` itself is fatal.
pub fn list_artifacts(dir: &Path, options: &ScanOptions) -> Result<ArtifactListing> {
    let mut listing = ArtifactListing::default();
    for entry in fs::read_dir(dir)? {
        let path = match entry {
            Ok(entry) => entry.path(),
            Err(err) => {
                listing.skipped.push(SkippedArtifact {
                    path: dir.to_path_buf(),
                    reason: format!("reading directory entry: {err}"),
                });
                continue;
            }
        };
        if !options.matches(&path) {
            continue;
        }
        match fs::metadata(&path) {
            Ok(meta) if meta.is_file() => listing.paths.push(path),
            Ok(_) => {}
            Err(err) => listing.skipped.push(SkippedArtifact {
                path,
                reason: format!("inspecting artifact: {err}"),
            }),
        }
    }
    listing.paths.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
    Ok(listing)
}

fn scan_with(dir: &Path, options: &ScanOptions, keep_samples: bool) -> Result<IngestOutcome> {
    let listing = list_artifacts(dir, options)?;
    for skipped in &listing.skipped {
        tracing::warn!("Skipping artifact {}: {}", skipped.path.display(), skipped.reason);
    }
    let mut outcome = IngestOutcome {
        runs: Vec::with_capacity(listing.paths.len()),
        skipped: listing.skipped,
    };
    for path in listing.paths {
        match load_artifact(&path) {
            Ok(run) => {
                tracing::debug!(
                    path = %path.display(),
                    workers = run.workers,
                    samples = run.runtime_samples.len(),
                    "parsed result artifact"
                );
                outcome.runs.push(if keep_samples {
                    run
                } else {
                    run.without_samples()
                });
            }
            Err(err) if err.is_recoverable() => {
                tracing::warn!("Skipping artifact: {err}");
                outcome.skipped.push(SkippedArtifact {
                    path,
                    reason: err.to_string(),
                });
            }
            Err(err) => return Err(err),
        }
    }
    Ok(outcome)
}

/// Parse every matching artifact, keeping runtime samples.
pub fn scan_dir(dir: &Path, options: &ScanOptions) -> Result<IngestOutcome> {
    scan_with(dir, options, true)
}

/// Parse every matching artifact, dropping runtime samples once parsed.
pub fn scan_summaries(dir: &Path, options: &ScanOptions) -> Result<IngestOutcome> {
    scan_with(dir, options, false)
}

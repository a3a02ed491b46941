//! Configuration loading and management.
//!
//! Settings live in an optional JSON file. Resolution order for the file:
//! the explicit `--config` path (or `AIBENCH_REPORT_CONFIG`), then
//! `<cwd>/.aibench/report.json`. A missing file yields defaults. CLI flags
//! override file values via [`ReportConfig::merge`].

use crate::error::{Error, Result};
use crate::ingest::{DEFAULT_ARTIFACT_EXTENSION, ScanOptions};
use crate::report::{DEFAULT_SECONDARY_STATISTIC, NOT_AVAILABLE, RenderOptions};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const CONFIG_PATH_ENV: &str = "AIBENCH_REPORT_CONFIG";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportConfig {
    /// Substring a result file name must contain.
    #[serde(alias = "prefix")]
    pub filter: Option<String>,
    /// Result artifact extension (default `json`).
    pub extension: Option<String>,
    /// Runtime statistic shown by the server-stats report.
    #[serde(alias = "serverRuntimeStatsMetricname", alias = "serverRuntimeStatsMetricName")]
    pub statistic: Option<String>,
    /// Marker for cells without data.
    #[serde(alias = "notAvailable")]
    pub not_available: Option<String>,
}

impl ReportConfig {
    /// Project-local settings directory.
    pub fn project_dir() -> PathBuf {
        PathBuf::from(".aibench")
    }

    /// Load settings from `config_path`, or the project file under `cwd`.
    pub fn load_with_roots(config_path: Option<&Path>, cwd: &Path) -> Result<Self> {
        if let Some(path) = config_path {
            if !path.exists() {
                return Err(Error::config(format!(
                    "Settings file {} does not exist",
                    path.display()
                )));
            }
            return Self::load_from_path(path);
        }
        Self::load_from_path(&cwd.join(Self::project_dir()).join("report.json"))
    }

    fn load_from_path(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)?;
        if content.trim().is_empty() {
            return Ok(Self::default());
        }

        let config: Self = serde_json::from_str(&content).map_err(|e| {
            Error::config(format!(
                "Failed to parse settings file {}: {e}",
                path.display()
            ))
        })?;
        tracing::debug!(path = %path.display(), "loaded report settings");
        Ok(config)
    }

    /// Merge two configurations, with `other` taking precedence.
    #[must_use]
    pub fn merge(base: Self, other: Self) -> Self {
        Self {
            filter: other.filter.or(base.filter),
            extension: other.extension.or(base.extension),
            statistic: other.statistic.or(base.statistic),
            not_available: other.not_available.or(base.not_available),
        }
    }

    // === Accessor methods with defaults ===

    #[must_use]
    pub fn scan_options(&self) -> ScanOptions {
        ScanOptions {
            filter: self.filter.clone().unwrap_or_default(),
            extension: self
                .extension
                .as_deref()
                .map(str::trim)
                .filter(|ext| !ext.is_empty())
                .unwrap_or(DEFAULT_ARTIFACT_EXTENSION)
                .to_string(),
        }
    }

    #[must_use]
    pub fn statistic(&self) -> &str {
        self.statistic
            .as_deref()
            .filter(|name| !name.trim().is_empty())
            .unwrap_or(DEFAULT_SECONDARY_STATISTIC)
    }

    #[must_use]
    pub fn render_options(&self) -> RenderOptions {
        RenderOptions {
            not_available: self
                .not_available
                .clone()
                .unwrap_or_else(|| NOT_AVAILABLE.to_string()),
        }
    }
}

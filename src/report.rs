//! Report rendering: reducer selection, provenance and secondary statistics.
//!
//! Each table has one row per worker count and one column per batching
//! dimension value. A cell's measurements are reduced with `min` or `max`.
//! The first measurement equal to the reduced value is the winner, and its
//! artifact is the provenance used when a secondary runtime statistic is
//! requested. Secondary statistics are resolved lazily by re-opening the
//! winning artifact, so aggregation never holds a full timeseries.

use crate::error::{Error, Result};
use crate::ingest::{self, IngestOutcome, ScanOptions, SkippedArtifact};
use crate::pivot::{Classification, PivotCell, PivotSet, PivotTable};
use crate::sample::{RunSummary, StatValue};
use serde::Serialize;
use std::collections::HashMap;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

pub const NOT_AVAILABLE: &str = "n/a";
pub const DEFAULT_SECONDARY_STATISTIC: &str = "used_memory_human";
const SECTION_RULE: &str = "-------------------";

// ────────────────────────────────────────────────────────────────────────────
// Reduction
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Reducer {
    Min,
    Max,
}

impl Reducer {
    /// Reduced value and the index of its first occurrence.
    ///
    /// NaN never wins over a number; an all-NaN slice reduces to index 0.
    #[must_use]
    pub fn reduce(self, values: &[f64]) -> Option<(usize, f64)> {
        let mut best: Option<(usize, f64)> = None;
        for (index, &value) in values.iter().enumerate() {
            if value.is_nan() {
                continue;
            }
            let better = match best {
                None => true,
                Some((_, current)) => match self {
                    Self::Min => value < current,
                    Self::Max => value > current,
                },
            };
            if better {
                best = Some((index, value));
            }
        }
        best.or_else(|| values.first().map(|&v| (0, v)))
    }
}

/// The measurement a reducer selected, with its originating artifact.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Winner<'a> {
    pub index: usize,
    pub value: f64,
    pub source: &'a Path,
}

impl PivotCell {
    /// Reduced value of this cell and the artifact that produced it.
    #[must_use]
    pub fn best(&self, reducer: Reducer) -> Option<Winner<'_>> {
        let (index, value) = reducer.reduce(self.values())?;
        Some(Winner {
            index,
            value,
            source: self.source_at(index)?,
        })
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Secondary statistics
// ────────────────────────────────────────────────────────────────────────────

/// Point-in-time value of `statistic` from the run's last sample, first host.
pub fn resolve_last_statistic(run: &RunSummary, statistic: &str) -> Result<StatValue> {
    run.last_sample()
        .and_then(|sample| sample.first_host())
        .and_then(|host| host.counters.get(statistic))
        .ok_or_else(|| Error::missing_statistic(&run.source_path, statistic))
}

pub trait SecondaryResolver {
    fn resolve(&mut self, source: &Path, statistic: &str) -> Result<StatValue>;
}

/// Re-opens the winning artifact on every lookup.
#[derive(Debug, Clone, Copy, Default)]
pub struct FileResolver;

impl SecondaryResolver for FileResolver {
    fn resolve(&mut self, source: &Path, statistic: &str) -> Result<StatValue> {
        let run = ingest::load_artifact(source)?;
        resolve_last_statistic(&run, statistic)
    }
}

/// Memoises lookups per `(artifact, statistic)`.
#[derive(Debug, Default)]
pub struct CachedResolver<R> {
    inner: R,
    cache: HashMap<(PathBuf, String), Option<StatValue>>,
}

impl<R: SecondaryResolver> CachedResolver<R> {
    pub fn new(inner: R) -> Self {
        Self {
            inner,
            cache: HashMap::new(),
        }
    }

    pub fn into_inner(self) -> R {
        self.inner
    }
}

impl<R: SecondaryResolver> SecondaryResolver for CachedResolver<R> {
    fn resolve(&mut self, source: &Path, statistic: &str) -> Result<StatValue> {
        let key = (source.to_path_buf(), statistic.to_string());
        if let Some(cached) = self.cache.get(&key) {
            return cached
                .clone()
                .ok_or_else(|| Error::missing_statistic(source, statistic));
        }
        let resolved = self.inner.resolve(source, statistic);
        self.cache
            .insert(key, resolved.as_ref().ok().cloned());
        resolved
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Tables
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RenderedCell {
    pub text: String,
    /// Reduced measurement, if the cell had any.
    pub value: Option<f64>,
    pub winner: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RenderedRow {
    pub workers: u32,
    pub cells: Vec<RenderedCell>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RenderedTable {
    pub label: String,
    pub metric_axis: Vec<i64>,
    pub rows: Vec<RenderedRow>,
}

impl RenderedTable {
    #[must_use]
    pub fn header(&self) -> String {
        let columns: Vec<String> = self
            .metric_axis
            .iter()
            .map(|value| format!("{} {value}", self.label))
            .collect();
        format!("Workers,{}", columns.join(","))
    }

    pub fn write_csv<W: Write>(&self, out: &mut W) -> io::Result<()> {
        writeln!(out, "{}", self.header())?;
        for row in &self.rows {
            let mut line = format!("{} workers", row.workers);
            for cell in &row.cells {
                line.push(',');
                line.push_str(&cell.text);
            }
            writeln!(out, "{line}")?;
        }
        Ok(())
    }
}

fn render_with<F>(
    worker_axis: &[u32],
    pivot: &PivotTable,
    reducer: Reducer,
    not_available: &str,
    mut cell_text: F,
) -> RenderedTable
where
    F: FnMut(&Winner<'_>) -> String,
{
    let metric_axis = pivot.metric_axis();
    let rows = worker_axis
        .iter()
        .map(|&workers| RenderedRow {
            workers,
            cells: metric_axis
                .iter()
                .map(|&dimension| {
                    match pivot
                        .cell(workers, dimension)
                        .and_then(|cell| cell.best(reducer))
                    {
                        Some(winner) => RenderedCell {
                            text: cell_text(&winner),
                            value: Some(winner.value),
                            winner: Some(winner.source.to_path_buf()),
                        },
                        None => RenderedCell {
                            text: not_available.to_string(),
                            value: None,
                            winner: None,
                        },
                    }
                })
                .collect(),
        })
        .collect();

    RenderedTable {
        label: pivot.classification.label().to_string(),
        metric_axis,
        rows,
    }
}

/// Reduced metric value per cell, fixed three decimals.
#[must_use]
pub fn render_metric_table(
    worker_axis: &[u32],
    pivot: &PivotTable,
    reducer: Reducer,
    not_available: &str,
) -> RenderedTable {
    render_with(worker_axis, pivot, reducer, not_available, |winner| {
        format!("{:.3}", winner.value)
    })
}

/// Named statistic from each winning artifact's last runtime sample.
pub fn render_secondary_table(
    worker_axis: &[u32],
    pivot: &PivotTable,
    reducer: Reducer,
    statistic: &str,
    resolver: &mut dyn SecondaryResolver,
    not_available: &str,
) -> RenderedTable {
    render_with(worker_axis, pivot, reducer, not_available, |winner| {
        match resolver.resolve(winner.source, statistic) {
            Ok(value) => value.to_string(),
            Err(err) => {
                tracing::warn!("{err}");
                not_available.to_string()
            }
        }
    })
}

// ────────────────────────────────────────────────────────────────────────────
// Reports
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportKind {
    Results,
    ServerStats,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReportSection {
    /// Lines printed before the table.
    pub preamble: Vec<String>,
    pub classification: Classification,
    /// `None` when no run matched `classification`.
    pub table: Option<RenderedTable>,
}

impl ReportSection {
    fn new(
        preamble: Vec<String>,
        pivot: &PivotTable,
        render: impl FnOnce(&PivotTable) -> RenderedTable,
    ) -> Self {
        let table = (!pivot.is_empty()).then(|| render(pivot));
        Self {
            preamble,
            classification: pivot.classification,
            table,
        }
    }

    /// Line printed in place of the table when the section has no data.
    #[must_use]
    pub fn no_data_line(&self) -> String {
        format!(
            "No data: no run matched the {} classification",
            self.classification.label()
        )
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Report {
    pub generated_at: String,
    pub kind: ReportKind,
    pub runs_parsed: usize,
    /// Scalar results and metadata of every parsed run, in ingestion order.
    pub runs: Vec<RunSummary>,
    pub skipped: Vec<SkippedArtifact>,
    pub sections: Vec<ReportSection>,
}

impl Report {
    pub fn write_text<W: Write>(&self, out: &mut W) -> io::Result<()> {
        for section in &self.sections {
            for line in &section.preamble {
                writeln!(out, "{line}")?;
            }
            match &section.table {
                Some(table) => table.write_csv(out)?,
                None => writeln!(out, "{}", section.no_data_line())?,
            }
            writeln!(out)?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderOptions {
    pub not_available: String,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            not_available: NOT_AVAILABLE.to_string(),
        }
    }
}

fn ensure_reportable(pivots: &PivotSet) -> Result<()> {
    if pivots.is_empty() {
        return Err(Error::empty_result_set(
            "no run matched the auto-batching or tensor-batching classification",
        ));
    }
    for pivot in [&pivots.auto_throughput, &pivots.tensor_throughput] {
        if pivot.is_empty() {
            tracing::warn!(
                "no run matched the {} classification; its tables are omitted",
                pivot.classification.label()
            );
        }
    }
    Ok(())
}

fn report_shell(kind: ReportKind, outcome: &IngestOutcome) -> Report {
    Report {
        generated_at: chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Secs, true),
        kind,
        runs_parsed: outcome.runs.len(),
        runs: outcome
            .runs
            .iter()
            .map(|run| run.clone().without_samples())
            .collect(),
        skipped: outcome.skipped.clone(),
        sections: Vec::new(),
    }
}

/// Throughput (max) and p50 latency (min) for both batching pivots.
pub fn build_results_report(outcome: &IngestOutcome, options: &RenderOptions) -> Result<Report> {
    let pivots = PivotSet::build(&outcome.runs);
    ensure_reportable(&pivots)?;
    let axis = &pivots.worker_axis;
    let na = options.not_available.as_str();
    let metric = |reducer| move |pivot: &PivotTable| render_metric_table(axis, pivot, reducer, na);

    let mut report = report_shell(ReportKind::Results, outcome);
    report.sections = vec![
        ReportSection::new(
            vec![
                SECTION_RULE.to_string(),
                "## Auto-batching overall throughput (inferences/sec) ((higher is better))"
                    .to_string(),
            ],
            &pivots.auto_throughput,
            metric(Reducer::Max),
        ),
        ReportSection::new(
            vec![
                "## Auto-batching p50 latency results (latency in ms including RTT) ((lower is better))"
                    .to_string(),
            ],
            &pivots.auto_latency,
            metric(Reducer::Min),
        ),
        ReportSection::new(
            vec![
                SECTION_RULE.to_string(),
                "## Tensor-batching overall throughput (inferences/sec) ((higher is better))"
                    .to_string(),
            ],
            &pivots.tensor_throughput,
            metric(Reducer::Max),
        ),
        ReportSection::new(
            vec![
                "## Tensor-batching p50 latency results (latency in ms including RTT) ((lower is better))"
                    .to_string(),
            ],
            &pivots.tensor_latency,
            metric(Reducer::Min),
        ),
    ];
    Ok(report)
}

/// `statistic` from the highest-throughput run of every cell.
pub fn build_server_stats_report(
    outcome: &IngestOutcome,
    statistic: &str,
    resolver: &mut dyn SecondaryResolver,
    options: &RenderOptions,
) -> Result<Report> {
    let pivots = PivotSet::build(&outcome.runs);
    ensure_reportable(&pivots)?;
    let axis = &pivots.worker_axis;
    let na = options.not_available.as_str();

    let mut report = report_shell(ReportKind::ServerStats, outcome);
    let auto = ReportSection::new(
        vec![
            SECTION_RULE.to_string(),
            "Using the Overall inferences/sec to decide which result is the best per test variation"
                .to_string(),
            SECTION_RULE.to_string(),
            format!("## Auto-batching {statistic} variation"),
        ],
        &pivots.auto_throughput,
        |pivot| render_secondary_table(axis, pivot, Reducer::Max, statistic, resolver, na),
    );
    let tensor = ReportSection::new(
        vec![
            SECTION_RULE.to_string(),
            format!("## Tensor-batching {statistic} variation"),
        ],
        &pivots.tensor_throughput,
        |pivot| render_secondary_table(axis, pivot, Reducer::Max, statistic, resolver, na),
    );
    report.sections = vec![auto, tensor];
    Ok(report)
}

/// Scan `dir` and build the results report.
pub fn results_report(dir: &Path, scan: &ScanOptions, options: &RenderOptions) -> Result<Report> {
    let outcome = ingest::scan_summaries(dir, scan)?;
    outcome.ensure_nonempty(dir)?;
    build_results_report(&outcome, options)
}

/// Scan `dir` and build the server-stats report, re-opening winning artifacts.
pub fn server_stats_report(
    dir: &Path,
    scan: &ScanOptions,
    statistic: &str,
    options: &RenderOptions,
) -> Result<Report> {
    let outcome = ingest::scan_summaries(dir, scan)?;
    outcome.ensure_nonempty(dir)?;
    let mut resolver = CachedResolver::new(FileResolver);
    build_server_stats_report(&outcome, statistic, &mut resolver, options)
}

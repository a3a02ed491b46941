//! Pivot aggregation of runs over (worker count × batching dimension).
//!
//! A sweep varies two knobs independently. Auto-batching runs fix the tensor
//! batch size to 1 and vary the autobatching setting; tensor-batching runs
//! disable autobatching and vary the tensor batch size. A run can land in
//! both pivots, one, or neither.

use crate::sample::RunSummary;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Classification {
    AutoBatching,
    TensorBatching,
}

impl Classification {
    #[must_use]
    pub const fn matches(self, run: &RunSummary) -> bool {
        match self {
            Self::AutoBatching => run.tensor_batch_size == 1,
            Self::TensorBatching => !run.autobatching_enabled(),
        }
    }

    /// Column key for `run` within this pivot.
    #[must_use]
    pub fn dimension(self, run: &RunSummary) -> i64 {
        match self {
            Self::AutoBatching => run.autobatching,
            Self::TensorBatching => i64::try_from(run.tensor_batch_size).unwrap_or(i64::MAX),
        }
    }

    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::AutoBatching => "Auto-batching",
            Self::TensorBatching => "Tensor-batching",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MetricSelector {
    OverallOpsRate,
    P50LatencyMs,
}

impl MetricSelector {
    #[must_use]
    pub const fn value(self, run: &RunSummary) -> f64 {
        match self {
            Self::OverallOpsRate => run.overall_ops_rate,
            Self::P50LatencyMs => run.p50_latency_ms,
        }
    }
}

/// Repeated measurements for one `(workers, dimension)` bucket.
///
/// `values[i]` was produced by the artifact at `source_refs[i]`; both
/// sequences only grow through [`PivotCell::push`].
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PivotCell {
    values: Vec<f64>,
    source_refs: Vec<PathBuf>,
}

impl PivotCell {
    pub fn push(&mut self, value: f64, source: impl Into<PathBuf>) {
        self.values.push(value);
        self.source_refs.push(source.into());
    }

    #[must_use]
    pub fn values(&self) -> &[f64] {
        &self.values
    }

    #[must_use]
    pub fn source_refs(&self) -> &[PathBuf] {
        &self.source_refs
    }

    #[must_use]
    pub fn source_at(&self, index: usize) -> Option<&Path> {
        self.source_refs.get(index).map(PathBuf::as_path)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PivotTable {
    pub classification: Classification,
    pub metric: MetricSelector,
    metric_axis: BTreeSet<i64>,
    cells: BTreeMap<u32, BTreeMap<i64, PivotCell>>,
}

impl PivotTable {
    #[must_use]
    pub const fn new(classification: Classification, metric: MetricSelector) -> Self {
        Self {
            classification,
            metric,
            metric_axis: BTreeSet::new(),
            cells: BTreeMap::new(),
        }
    }

    pub fn build<'a>(
        runs: impl IntoIterator<Item = &'a RunSummary>,
        classification: Classification,
        metric: MetricSelector,
    ) -> Self {
        let mut table = Self::new(classification, metric);
        for run in runs {
            table.insert(run);
        }
        table
    }

    /// Append `run` if it matches this table's classification.
    pub fn insert(&mut self, run: &RunSummary) -> bool {
        if !self.classification.matches(run) {
            return false;
        }
        let dimension = self.classification.dimension(run);
        self.metric_axis.insert(dimension);
        self.cells
            .entry(run.workers)
            .or_default()
            .entry(dimension)
            .or_default()
            .push(self.metric.value(run), &run.source_path);
        true
    }

    /// Distinct worker counts, ascending.
    #[must_use]
    pub fn worker_axis(&self) -> Vec<u32> {
        self.cells.keys().copied().collect()
    }

    /// Distinct dimension values, ascending.
    #[must_use]
    pub fn metric_axis(&self) -> Vec<i64> {
        self.metric_axis.iter().copied().collect()
    }

    #[must_use]
    pub fn cell(&self, workers: u32, dimension: i64) -> Option<&PivotCell> {
        self.cells.get(&workers)?.get(&dimension)
    }

    #[must_use]
    pub const fn table(&self) -> &BTreeMap<u32, BTreeMap<i64, PivotCell>> {
        &self.cells
    }

    /// Total measurements across all cells.
    #[must_use]
    pub fn run_count(&self) -> usize {
        self.cells
            .values()
            .flat_map(BTreeMap::values)
            .map(PivotCell::len)
            .sum()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }
}

/// The four pivots of a sweep report, sharing one worker axis.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PivotSet {
    pub worker_axis: Vec<u32>,
    pub auto_throughput: PivotTable,
    pub auto_latency: PivotTable,
    pub tensor_throughput: PivotTable,
    pub tensor_latency: PivotTable,
}

impl PivotSet {
    #[must_use]
    pub fn build(runs: &[RunSummary]) -> Self {
        use Classification::{AutoBatching, TensorBatching};
        use MetricSelector::{OverallOpsRate, P50LatencyMs};

        let auto_throughput = PivotTable::build(runs, AutoBatching, OverallOpsRate);
        let auto_latency = PivotTable::build(runs, AutoBatching, P50LatencyMs);
        let tensor_throughput = PivotTable::build(runs, TensorBatching, OverallOpsRate);
        let tensor_latency = PivotTable::build(runs, TensorBatching, P50LatencyMs);

        let worker_axis: BTreeSet<u32> = auto_throughput
            .worker_axis()
            .into_iter()
            .chain(tensor_throughput.worker_axis())
            .collect();

        Self {
            worker_axis: worker_axis.into_iter().collect(),
            auto_throughput,
            auto_latency,
            tensor_throughput,
            tensor_latency,
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.worker_axis.is_empty()
    }
}

//! Cumulative CPU counter → per-interval utilisation.
//!
//! Each consecutive pair of runtime samples yields one row. Counters are
//! summed across hosts, differenced, and normalised by the interval length:
//!
//! - `total_pct`: whole process (`self` sys + user), in `[0, #CORES*100]`
//! - `main_thread_pct`: main thread sys + user
//! - `background_thread_pct`: the first background worker thread
//! - `backend_pct`: `total_pct - main_thread_pct`, the residual attributed to
//!   backend execution. Counter skew can make it negative; it is never clamped.

use crate::error::{Error, Result};
use crate::sample::RuntimeSample;
use serde::Serialize;
use std::io::Write;

const NANOS_PER_SECOND: f64 = 1e9;

pub const CPU_TABLE_HEADER: &str = "timeframe,total_pct [0,#CORES],main_thread_pct [0,100],background thread [0,100],backend_pct";

pub const SINGLE_BACKGROUND_THREAD_NOTICE: &str = "Warning! This report attributes CPU among main thread, background thread and backend to locate the first bottleneck.\n\
Only the first background worker thread (bthread_n1) is collected; setups with more background threads are under-reported.";

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CpuUtilizationRow {
    /// Seconds since the first sample of the series.
    pub elapsed_seconds: f64,
    pub total_pct: f64,
    pub main_thread_pct: f64,
    pub background_thread_pct: f64,
    pub backend_pct: f64,
}

/// Lazy pairwise pass over a sample series.
///
/// Yields `samples.len() - 1` items. Every item is a pure function of the
/// slice, so a clone replays the same pass.
#[derive(Debug, Clone)]
pub struct CpuDeltas<'a> {
    samples: &'a [RuntimeSample],
    next: usize,
}

#[must_use]
pub const fn cpu_deltas(samples: &[RuntimeSample]) -> CpuDeltas<'_> {
    CpuDeltas { samples, next: 1 }
}

impl Iterator for CpuDeltas<'_> {
    type Item = Result<CpuUtilizationRow>;

    fn next(&mut self) -> Option<Self::Item> {
        let cur = self.samples.get(self.next)?;
        let prev = &self.samples[self.next - 1];
        let first = &self.samples[0];
        self.next += 1;
        Some(utilization(first, prev, cur))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.samples.len().saturating_sub(self.next);
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for CpuDeltas<'_> {}

#[allow(clippy::cast_precision_loss)]
fn nanos_to_seconds(later: u64, earlier: u64) -> f64 {
    if later >= earlier {
        (later - earlier) as f64 / NANOS_PER_SECOND
    } else {
        -((earlier - later) as f64 / NANOS_PER_SECOND)
    }
}

fn utilization(
    first: &RuntimeSample,
    prev: &RuntimeSample,
    cur: &RuntimeSample,
) -> Result<CpuUtilizationRow> {
    let interval = nanos_to_seconds(cur.timestamp, prev.timestamp);
    if interval <= 0.0 || !interval.is_finite() {
        return Err(Error::DegenerateInterval {
            previous: prev.timestamp,
            current: cur.timestamp,
        });
    }

    let delta = cur.aggregate_cpu()? - prev.aggregate_cpu()?;
    let pct = |seconds: f64| seconds / interval * 100.0;

    let main_thread_pct = pct(delta.main_thread());
    let total_pct = pct(delta.process_total());

    Ok(CpuUtilizationRow {
        elapsed_seconds: nanos_to_seconds(cur.timestamp, first.timestamp),
        total_pct,
        main_thread_pct,
        background_thread_pct: pct(delta.background_thread_total),
        backend_pct: total_pct - main_thread_pct,
    })
}

/// Outcome of a full pass: good rows plus the intervals that were dropped.
#[derive(Debug, Default)]
pub struct CpuAttribution {
    pub rows: Vec<CpuUtilizationRow>,
    pub skipped: Vec<Error>,
}

/// Run the pass to completion, omitting intervals that cannot be computed.
#[must_use]
pub fn attribute_cpu(samples: &[RuntimeSample]) -> CpuAttribution {
    let mut out = CpuAttribution::default();
    for item in cpu_deltas(samples) {
        match item {
            Ok(row) => out.rows.push(row),
            Err(err) => {
                tracing::warn!("skipping CPU interval: {err}");
                out.skipped.push(err);
            }
        }
    }
    out
}

/// Floats use Rust's shortest round-trip form (`2.0`, `1e-7`, `1e16`), so
/// exponents carry no zero padding or sign for positive powers.
pub fn render_cpu_table<W: Write>(rows: &[CpuUtilizationRow], out: &mut W) -> std::io::Result<()> {
    writeln!(out, "{CPU_TABLE_HEADER}")?;
    for row in rows {
        writeln!(
            out,
            "{:?},{:?},{:?},{:?},{:?}",
            row.elapsed_seconds,
            row.total_pct,
            row.main_thread_pct,
            row.background_thread_pct,
            row.backend_pct
        )?;
    }
    Ok(())
}

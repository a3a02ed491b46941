//! aibench-report: derived reports from inference benchmark result artifacts
//!
//! The load generator writes one JSON artifact per run. This crate turns a
//! directory of them into:
//! - pivot tables of throughput and p50 latency over worker count × batching
//!   setup ([`pivot`], [`report`])
//! - a runtime statistic pulled from each configuration's best run
//! - per-interval CPU attribution across main thread, background thread and
//!   backend from one run's runtime counters ([`cpu_delta`])
//!
//! Nothing here runs benchmarks; artifacts are read-only inputs.

#![forbid(unsafe_code)]
#![allow(
    clippy::must_use_candidate,
    clippy::doc_markdown,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc,
    clippy::module_name_repetitions
)]

pub mod cli;
pub mod config;
pub mod cpu_delta;
pub mod error;
pub mod ingest;
pub mod pivot;
pub mod report;
pub mod sample;

pub use error::{Error, Result as ReportResult};

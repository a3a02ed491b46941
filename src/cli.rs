//! CLI argument parsing using Clap.

use crate::config::{CONFIG_PATH_ENV, ReportConfig};
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// Performance tables and CPU attribution from benchmark result artifacts
#[derive(Parser, Debug)]
#[command(name = "aibench-report")]
#[command(version, about, long_about = None)]
#[command(after_help = "Examples:
  aibench-report results --dir ./results                        Throughput/latency pivots
  aibench-report results --dir ./results --filter redisai       Only files containing 'redisai'
  aibench-report server-stats --dir ./results --statistic used_memory_human
  aibench-report cpu --artifact ./results/run_w8_auto.json       CPU attribution timeline
")]
pub struct Cli {
    /// Settings file (JSON)
    #[arg(long, global = true, env = CONFIG_PATH_ENV)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Inputs shared by the sweep reports.
#[derive(Args, Debug, Clone)]
pub struct SweepArgs {
    /// Directory holding result artifacts
    #[arg(long)]
    pub dir: PathBuf,

    /// Only use files whose name contains this substring
    #[arg(long, alias = "prefix")]
    pub filter: Option<String>,

    /// Also write the report as JSON to this path
    #[arg(long)]
    pub json_out: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Throughput and p50 latency per worker count and batching setup
    Results {
        #[command(flatten)]
        sweep: SweepArgs,
    },

    /// A runtime statistic from the best-throughput run of each configuration
    ServerStats {
        #[command(flatten)]
        sweep: SweepArgs,

        /// Statistic read from the winning run's last runtime sample
        #[arg(long, alias = "server-runtime-stats-metricname")]
        statistic: Option<String>,
    },

    /// Per-interval CPU attribution for one artifact
    Cpu {
        /// Result artifact to analyse
        #[arg(long)]
        artifact: PathBuf,

        /// Also write the rows as JSON to this path
        #[arg(long)]
        json_out: Option<PathBuf>,
    },
}

impl Commands {
    /// Settings given on the command line, for merging over the settings file.
    pub fn overrides(&self) -> ReportConfig {
        match self {
            Self::Results { sweep } => ReportConfig {
                filter: sweep.filter.clone(),
                ..ReportConfig::default()
            },
            Self::ServerStats { sweep, statistic } => ReportConfig {
                filter: sweep.filter.clone(),
                statistic: statistic.clone(),
                ..ReportConfig::default()
            },
            Self::Cpu { .. } => ReportConfig::default(),
        }
    }
}

//! aibench-report CLI

#![forbid(unsafe_code)]

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use aibench_report::cli::{self, Commands, SweepArgs};
use aibench_report::config::ReportConfig;
use aibench_report::cpu_delta::{self, SINGLE_BACKGROUND_THREAD_NOTICE};
use aibench_report::ingest;
use aibench_report::report::{self, Report};
use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

fn main() {
    if let Err(err) = main_impl() {
        eprintln!("Error: {err:#}");
        std::process::exit(1);
    }
}

fn main_impl() -> Result<()> {
    let cli = cli::Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_target(false)
        .with_writer(io::stderr)
        .init();

    let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
    let settings = ReportConfig::load_with_roots(cli.config.as_deref(), &cwd)
        .context("loading report settings")?;
    let config = ReportConfig::merge(settings, cli.command.overrides());

    match &cli.command {
        Commands::Results { sweep } => {
            let report = report::results_report(
                &sweep.dir,
                &config.scan_options(),
                &config.render_options(),
            )?;
            emit_report(&report, sweep)
        }
        Commands::ServerStats { sweep, .. } => {
            let report = report::server_stats_report(
                &sweep.dir,
                &config.scan_options(),
                config.statistic(),
                &config.render_options(),
            )?;
            emit_report(&report, sweep)
        }
        Commands::Cpu { artifact, json_out } => run_cpu(artifact, json_out.as_deref()),
    }
}

fn emit_report(report: &Report, sweep: &SweepArgs) -> Result<()> {
    let stdout = io::stdout();
    let mut out = stdout.lock();
    report.write_text(&mut out).context("writing report")?;
    out.flush().context("writing report")?;

    if let Some(path) = &sweep.json_out {
        write_json(path, report)?;
    }

    eprintln!(
        "Parsed {} result artifacts from {} ({} skipped)",
        report.runs_parsed,
        sweep.dir.display(),
        report.skipped.len()
    );
    Ok(())
}

fn run_cpu(artifact: &Path, json_out: Option<&Path>) -> Result<()> {
    let run = ingest::load_artifact(artifact)?;
    eprintln!("{SINGLE_BACKGROUND_THREAD_NOTICE}");

    let attribution = cpu_delta::attribute_cpu(&run.runtime_samples);
    if attribution.rows.is_empty() {
        return Err(aibench_report::Error::empty_result_set(format!(
            "no CPU interval could be computed from {} ({} runtime samples, {} intervals skipped)",
            artifact.display(),
            run.runtime_samples.len(),
            attribution.skipped.len()
        ))
        .into());
    }

    let stdout = io::stdout();
    let mut out = stdout.lock();
    cpu_delta::render_cpu_table(&attribution.rows, &mut out).context("writing CPU table")?;
    out.flush().context("writing CPU table")?;

    if let Some(path) = json_out {
        write_json(path, &attribution.rows)?;
    }
    Ok(())
}

fn write_json<T: serde::Serialize + ?Sized>(path: &Path, value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value).context("serializing report")?;
    fs::write(path, json).with_context(|| format!("writing output to {}", path.display()))?;
    Ok(())
}

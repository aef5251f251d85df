//! `trace_profile`: replay a recorded input trace headlessly and check it against thresholds.

use anyhow::{Context, Result};
use clap::Parser;
use race_engine::frameworks::config;
use race_engine::interface_adapters::profile::TraceProfile;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

#[derive(Parser, Debug)]
#[command(name = "trace_profile", about = "Replay a trace profile and check its expectations")]
struct Cli {
    /// Profile TOML naming the trace, the track and the expectations
    #[arg(long)]
    profile: PathBuf,
    /// Track used when the profile does not name one
    #[arg(long)]
    track: Option<PathBuf>,
    /// Also write the JSON report to this file
    #[arg(long)]
    output: Option<PathBuf>,
}

fn main() -> ExitCode {
    // Logs go to stderr so stdout stays pure JSON.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    match run(Cli::parse()) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::from(1),
        Err(e) => {
            eprintln!("Error: {e:#}");
            ExitCode::from(2)
        }
    }
}

fn run(cli: Cli) -> Result<bool> {
    let profile = TraceProfile::load(&cli.profile)?;
    let base_dir = cli.profile.parent().unwrap_or(Path::new("."));
    let default_track = cli.track.unwrap_or_else(config::track_path);

    let report = profile.run(base_dir, &default_track)?;

    let json = serde_json::to_string_pretty(&report)?;
    println!("{json}");
    if let Some(output) = cli.output {
        std::fs::write(&output, &json)
            .with_context(|| format!("failed to write report {}", output.display()))?;
    }

    for failure in &report.failures {
        eprintln!("FAIL: {failure}");
    }
    Ok(report.passed())
}

//! Command-line interface for replcheck
//!
//! # Usage Examples
//!
//! ## RDB Phase
//! ```bash
//! # Wait for Enter once the engine is in its RDB phase, seed 20 keys,
//! # sleep up to two minutes, then verify
//! replcheck rdb-phase --config config.yaml
//!
//! # Unattended: start seeding immediately, poll a marker key for convergence
//! replcheck rdb-phase --config config.yaml --no-wait --sync marker --settle 5m
//!
//! # Keep a JSON report and remove the test keys afterwards
//! replcheck rdb-phase --report rdb.json --cleanup
//! ```
//!
//! ## Streams
//! ```bash
//! replcheck stream --config config.yaml --settle 5s
//! ```
//!
//! ## Key Presence
//! ```bash
//! replcheck keys --config config.yaml --prefix "user:"
//! ```
//!
//! ## Config Resolution
//! `--config` wins when given. Otherwise `$REPLCHECK_CONFIG`, then
//! `./config.yaml`, then (with `--discover-process NAME`) the `--config`
//! argument of a running process whose command line mentions NAME.
//!
//! ## Exit Codes
//! - 0: verification passed
//! - 1: verification found failures
//! - 2: fatal setup, generation or convergence error
//! - 130: interrupted

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use replcheck::config::{
    self, discover_from_processes, resolve_config_path, ConfigSource, HarnessConfig,
};
use replcheck::exit::{RunOutcome, EXIT_FATAL};
use replcheck::harness::RdbPhaseRun;
use replcheck::render::{render_key_scan, render_summary};
use replcheck::streams::run_stream_suite;
use replcheck::{settle_gate, PhaseOpts, DEFAULT_RECORD_COUNT};
use replcheck_core::KvStore;
use replcheck_generator::SeedGenerator;
use replcheck_phase::{ManualGate, NoopGate, PhaseGate, DEFAULT_SETTLE};
use replcheck_redis::RedisStore;
use replcheck_verify::{scan_missing_keys, RunReport, Summary, Verdict};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

/// Settle bound for the stream suite, applied after every scenario.
const STREAM_SETTLE: Duration = Duration::from_secs(2);

#[derive(Parser)]
#[command(name = "replcheck")]
#[command(about = "Verify that a replication engine copies a key-value store faithfully")]
#[command(long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Args, Clone, Debug)]
struct ConnectOpts {
    /// Path to the replication engine's YAML config
    #[arg(short = 'c', long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Find the config by inspecting the command line of a running process
    /// with this name (Linux only)
    #[arg(long, value_name = "NAME")]
    discover_process: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Seed keys during the RDB phase and verify them after convergence
    RdbPhase {
        #[command(flatten)]
        connect: ConnectOpts,

        #[command(flatten)]
        phase: PhaseOpts,

        /// Number of test keys to write
        #[arg(long, default_value_t = DEFAULT_RECORD_COUNT)]
        count: u64,

        /// Delay between writes (e.g. "100ms", "1s")
        #[arg(long, value_parser = config::parse_duration, default_value = "100ms")]
        pacing: Duration,

        /// Start writing immediately instead of waiting for Enter
        #[arg(long)]
        no_wait: bool,

        /// Keep leftover test keys instead of deleting them before seeding
        #[arg(long)]
        no_pre_clean: bool,

        /// Delete the test keys from both stores after verification
        #[arg(long)]
        cleanup: bool,

        /// Write the summary as JSON to this file
        #[arg(long, value_name = "PATH")]
        report: Option<PathBuf>,
    },

    /// Run the stream replication scenarios
    Stream {
        #[command(flatten)]
        connect: ConnectOpts,

        #[command(flatten)]
        phase: PhaseOpts,

        /// Write the summary as JSON to this file
        #[arg(long, value_name = "PATH")]
        report: Option<PathBuf>,
    },

    /// List keys present on the source but absent on the target
    Keys {
        #[command(flatten)]
        connect: ConnectOpts,

        /// Only compare keys with this prefix
        #[arg(long, default_value = "")]
        prefix: String,
    },
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    let code = tokio::select! {
        result = run(cli) => match result {
            Ok(outcome) => outcome.exit_code(),
            Err(e) => {
                eprintln!("Error: {e:#}");
                EXIT_FATAL
            }
        },
        _ = interrupted() => {
            warn!("Interrupted before a verdict was reached");
            RunOutcome::Interrupted.exit_code()
        }
    };
    std::process::exit(code);
}

/// Resolves on Ctrl-C. Never resolves if the handler cannot be installed.
async fn interrupted() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Could not listen for Ctrl-C: {e}");
        std::future::pending::<()>().await;
    }
}

async fn run(cli: Cli) -> anyhow::Result<RunOutcome> {
    match cli.command {
        Commands::RdbPhase {
            connect,
            phase,
            count,
            pacing,
            no_wait,
            no_pre_clean,
            cleanup,
            report,
        } => {
            let (source, target) = connect_stores(&connect).await?;

            let operator = ManualGate::stdin(
                "Start the replication engine, then press Enter once it has entered the RDB phase...",
            );
            let start_gate: &dyn PhaseGate = if no_wait { &NoopGate } else { &operator };
            let settle = settle_gate(
                &operator,
                phase.sync,
                phase.settle_or(DEFAULT_SETTLE),
                phase.settle_interval,
                source.clone(),
                target.clone(),
                &phase.prefix,
            );

            let rdb = RdbPhaseRun {
                source: source.as_ref(),
                target: target.as_ref(),
                start_gate,
                settle_gate: settle.as_ref(),
                generator: SeedGenerator::new(phase.prefix.clone(), count).with_pacing(pacing),
                pre_clean: !no_pre_clean,
            };
            let summary = rdb.run().await?;
            let outcome = finish("rdb-phase", "RDB phase results", &summary, report.as_deref())?;

            if cleanup {
                if let Err(e) = rdb.cleanup().await {
                    warn!("Cleanup failed: {e:#}");
                }
            }
            Ok(outcome)
        }
        Commands::Stream {
            connect,
            phase,
            report,
        } => {
            let (source, target) = connect_stores(&connect).await?;
            let operator = ManualGate::stdin("Press Enter to continue...");
            let gate = settle_gate(
                &operator,
                phase.sync,
                phase.settle_or(STREAM_SETTLE),
                phase.settle_interval,
                source.clone(),
                target.clone(),
                &phase.prefix,
            );

            let summary =
                run_stream_suite(source.as_ref(), target.as_ref(), gate.as_ref(), &phase.prefix)
                    .await?;
            finish("stream", "Stream replication results", &summary, report.as_deref())
        }
        Commands::Keys { connect, prefix } => {
            let (source, target) = connect_stores(&connect).await?;
            let report = scan_missing_keys(source.as_ref(), target.as_ref(), &prefix)
                .await
                .context("Key scan failed")?;

            let mut stdout = std::io::stdout().lock();
            render_key_scan(&report, &mut stdout).context("Failed to write key scan")?;

            let verdict = if report.is_consistent() {
                Verdict::Pass
            } else {
                Verdict::Fail
            };
            Ok(verdict.into())
        }
    }
}

async fn connect_stores(
    opts: &ConnectOpts,
) -> anyhow::Result<(Arc<dyn KvStore>, Arc<dyn KvStore>)> {
    let mut sources = Vec::new();
    match &opts.config {
        Some(path) => sources.push(ConfigSource::Explicit(path.clone())),
        None => {
            sources.push(ConfigSource::env_default());
            if let Some(name) = &opts.discover_process {
                let process = name.clone();
                sources.push(ConfigSource::discovery(name.clone(), move || {
                    discover_from_processes(&process)
                }));
            }
        }
    }

    let path = resolve_config_path(&sources)?;
    let config = HarnessConfig::from_file(&path)
        .with_context(|| format!("Failed to load config from {}", path.display()))?;

    let source = RedisStore::connect(
        "source",
        &config.source.addr,
        config::password(&config.source.password),
    )
    .await
    .with_context(|| format!("Failed to connect to source at {}", config.source.addr))?;

    let target = RedisStore::connect(
        format!("target ({})", config.target.store_type),
        &config.target.addr,
        config::password(&config.target.password),
    )
    .await
    .with_context(|| format!("Failed to connect to target at {}", config.target.addr))?;

    let source: Arc<dyn KvStore> = Arc::new(source);
    let target: Arc<dyn KvStore> = Arc::new(target);
    Ok((source, target))
}

/// Render the summary, write the optional JSON report, and map the verdict.
fn finish(
    suite: &str,
    title: &str,
    summary: &Summary,
    report: Option<&Path>,
) -> anyhow::Result<RunOutcome> {
    let mut stdout = std::io::stdout().lock();
    render_summary(title, summary, &mut stdout).context("Failed to write summary")?;

    if let Some(path) = report {
        match RunReport::new(suite, summary.clone()).write_json(path) {
            Ok(()) => info!("Report written to {}", path.display()),
            Err(e) => warn!("Could not write report: {e}"),
        }
    }
    Ok(summary.verdict().into())
}

//! TierPlace CLI - Storage-Tier Placement for HPC Jobs
//!
//! Evaluates job placements and inspects fast-tier contention from the shell.

use anyhow::Context;
use chrono::Utc;
use clap::Parser;
use tierplace::config::{CliArgs, Commands, LogFormat, OutputFormat, TierConfig};
use tierplace::estimate::{cluster_wait, hps_wait, TierLedger};
use tierplace::placement::{JobDescriptor, Placement, PlacementEngine};
use tierplace::queue::{JsonFileQueue, QueueSnapshot, QueueSource, SnapshotOrigin, SqueueQueue};
use tracing_subscriber::EnvFilter;

fn main() {
    let args = CliArgs::parse();

    init_logging(args.verbose, args.log_format);

    if let Err(e) = run(args) {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

fn init_logging(verbose: u8, format: LogFormat) {
    // RUST_LOG wins over -v
    let default_level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr);

    match format {
        LogFormat::Text => builder.init(),
        LogFormat::Json => builder.json().init(),
    }
}

fn run(args: CliArgs) -> anyhow::Result<()> {
    let config = TierConfig::from_cli(&args).context("invalid configuration")?;

    let source: Box<dyn QueueSource + Send + Sync> = match &args.queue_file {
        Some(path) => Box::new(JsonFileQueue::new(path)),
        None => Box::new(
            SqueueQueue::new()
                .with_program(&args.squeue)
                .with_fallback_time_limit(config.default_time_limit()),
        ),
    };

    match &args.command {
        Commands::Place {
            time_limit,
            burst_buffer,
            environment,
        } => cmd_place(config, source, *time_limit, burst_buffer.clone(), environment, args.output),
        Commands::Queue => cmd_queue(&config, source.as_ref(), args.output),
        Commands::Config => cmd_config(&config),
    }
}

fn cmd_place(
    config: TierConfig,
    source: Box<dyn QueueSource + Send + Sync>,
    time_limit: Option<u64>,
    burst_buffer: Option<String>,
    environment: &[String],
    output: OutputFormat,
) -> anyhow::Result<()> {
    let mut job = JobDescriptor {
        time_limit_minutes: time_limit,
        environment: environment.to_vec(),
        burst_buffer,
    };

    let engine = PlacementEngine::new(config, source);
    let placement = engine.place(&mut job);

    match output {
        OutputFormat::Json => {
            let report = serde_json::json!({
                "placement": placement,
                "job": job,
            });
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        OutputFormat::Text => print_placement(&placement, &job, engine.config()),
    }

    Ok(())
}

fn print_placement(placement: &Placement, job: &JobDescriptor, config: &TierConfig) {
    let decision = &placement.decision;

    println!("=== Placement ===");
    println!("Tier:            {} ({})", decision.tier, config.path(decision.tier).display());
    println!("Reason:          {:?}", decision.reason);
    match &placement.storage_request {
        Some(request) => println!("Request:         {}", request),
        None => println!("Request:         none"),
    }
    if let Some(origin) = &placement.snapshot_origin {
        println!("Queue:           {}", describe_origin(origin));
    }
    println!(
        "Time limit:      {}",
        humantime::format_duration(placement.requested_time_limit)
    );

    if let (Some(lps), Some(hps)) = (decision.lps_time, decision.hps_time) {
        println!();
        println!("Expected wait:   {}", humantime::format_duration(decision.expected_wait));
        if let Some(wait) = decision.hps_wait {
            println!("HPS wait:        {}", wait);
        }
        println!("LPS completion:  {}", humantime::format_duration(lps));
        println!("HPS completion:  {}", hps);
    }

    println!();
    println!("=== Job ===");
    match job.time_limit_minutes {
        Some(minutes) => println!("Time limit:      {} min", minutes),
        None => println!("Time limit:      unset"),
    }
    println!("Burst buffer:    {}", job.burst_buffer.as_deref().unwrap_or("none"));
    for entry in &job.environment {
        println!("Env:             {}", entry);
    }
}

fn cmd_queue(config: &TierConfig, source: &dyn QueueSource, output: OutputFormat) -> anyhow::Result<()> {
    let snapshot = QueueSnapshot::capture(source, Utc::now());
    let ledger = TierLedger::from_snapshot(&snapshot, &config.hps);
    let wait = cluster_wait(&snapshot);

    match output {
        OutputFormat::Json => {
            let report = serde_json::json!({
                "source": source.name(),
                "snapshot": snapshot,
                "hps": {
                    "total_capacity": ledger.total_capacity(),
                    "committed": ledger.committed(),
                    "remaining": ledger.remaining(),
                    "residency_secs": ledger.total_residency().as_secs_f64(),
                },
                "cluster_wait_secs": wait.as_secs_f64(),
            });
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        OutputFormat::Text => {
            println!("=== Queue ({}) ===", source.name());
            println!("Origin:          {}", describe_origin(snapshot.origin()));
            println!("Jobs:            {}", snapshot.len());
            println!("HPS holders:     {}", snapshot.fast_tier_holders().count());
            println!();
            println!("=== HPS ===");
            println!("Capacity:        {} MiB", ledger.total_capacity());
            println!("Committed:       {} MiB", ledger.committed());
            println!("Remaining:       {} MiB", ledger.remaining());
            println!("Wait (full):     {}", hps_wait(&ledger, ledger.total_capacity()));
            println!();
            println!("Cluster wait:    {}", humantime::format_duration(wait));
        }
    }

    Ok(())
}

fn cmd_config(config: &TierConfig) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(config)?);
    Ok(())
}

fn describe_origin(origin: &SnapshotOrigin) -> String {
    match origin {
        SnapshotOrigin::Live => "live".to_string(),
        SnapshotOrigin::Empty => "empty".to_string(),
        SnapshotOrigin::Unreachable(reason) => format!("unreachable ({})", reason),
    }
}

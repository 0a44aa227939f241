//! rotxor: keyed XOR stream transform, stdin to stdout, in parallel.

#![deny(unsafe_code)]

mod exit_code;

use std::fs;
use std::io;
use std::num::NonZeroUsize;
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Instant;

use anyhow::{Context, Result};
use clap::Parser;
use rotxor_core::error::{KeyError, PipelineError};
use rotxor_core::{DEFAULT_BLOCK_SIZE, KeyMaterial, PipelineOptions, run_pipeline};
use tracing_subscriber::EnvFilter;

/// Keyed XOR stream transform: reads stdin, writes stdout, preserves order.
///
/// The transform is self-inverse, so encrypting and decrypting are the same
/// invocation with the same key file.
#[derive(Parser)]
#[command(name = "rotxor", version)]
#[command(after_help = "EXAMPLES:
    # Scramble a file
    rotxor -k secret.key < plain.bin > scrambled.bin

    # The same command restores it
    rotxor -k secret.key < scrambled.bin > plain.bin

    # Eight workers, 64 KiB blocks
    rotxor -k secret.key -n 8 -b 65536 < plain.bin > scrambled.bin
")]
struct Cli {
    /// Key file, read as raw bytes (must not be empty)
    #[arg(short = 'k', long, value_name = "FILE")]
    key_file: PathBuf,

    /// Worker thread count [default: available parallelism]
    #[arg(short = 'n', long = "threads", value_name = "COUNT")]
    threads: Option<usize>,

    /// Block size in bytes handed to each worker per claim
    #[arg(short = 'b', long, value_name = "BYTES", default_value_t = DEFAULT_BLOCK_SIZE)]
    block_size: usize,

    /// Increase log verbosity (-v, -vv, -vvv); logs go to stderr
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Log errors only
    #[arg(short, long)]
    quiet: bool,
}

fn main() -> ExitCode {
    match run() {
        Ok(()) => ExitCode::from(exit_code::SUCCESS),
        Err(e) => {
            eprintln!("Error: {e:#}");
            ExitCode::from(categorize_error(&e))
        }
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();
    setup_tracing(cli.verbose, cli.quiet);

    let key_bytes = fs::read(&cli.key_file)
        .with_context(|| format!("failed to read key file {}", cli.key_file.display()))?;
    let key = KeyMaterial::new(key_bytes)
        .with_context(|| format!("unusable key file {}", cli.key_file.display()))?;

    let options = PipelineOptions {
        worker_count: cli.threads.unwrap_or_else(default_worker_count),
        block_size: cli.block_size,
    };
    tracing::info!(
        workers = options.worker_count,
        block_size = options.block_size,
        key_file = %cli.key_file.display(),
        key_len = key.len(),
        "starting transform"
    );

    let started = Instant::now();
    let report = run_pipeline(io::stdin(), io::stdout(), &key, &options)
        .context("stream transform failed")?;

    tracing::info!(
        bytes = report.bytes,
        blocks = report.blocks,
        write_waits = report.write_waits,
        elapsed_secs = started.elapsed().as_secs_f64(),
        "transform complete"
    );
    Ok(())
}

/// One worker per available core, falling back to a single worker when the
/// parallelism query fails.
fn default_worker_count() -> usize {
    std::thread::available_parallelism().map_or(1, NonZeroUsize::get)
}

/// Logs go to stderr; stdout belongs to the transformed stream.
fn setup_tracing(verbose: u8, quiet: bool) {
    let default_filter = if quiet {
        "error"
    } else {
        match verbose {
            0 => "warn",
            1 => "info",
            2 => "debug",
            _ => "trace",
        }
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)),
        )
        .with_writer(io::stderr)
        .init();
}

/// Maps the error chain to an exit code by downcast, not message matching.
fn categorize_error(e: &anyhow::Error) -> u8 {
    for cause in e.chain() {
        if cause.downcast_ref::<KeyError>().is_some() {
            return exit_code::CONFIG;
        }
        if let Some(pipeline) = cause.downcast_ref::<PipelineError>() {
            return match pipeline {
                PipelineError::InvalidWorkerCount | PipelineError::InvalidBlockSize => {
                    exit_code::CONFIG
                }
                PipelineError::Read { .. } | PipelineError::Write { .. } => exit_code::IO,
                PipelineError::CursorOvertaken { .. } | PipelineError::Aborted => {
                    exit_code::FAILURE
                }
            };
        }
        if cause.downcast_ref::<io::Error>().is_some() {
            return exit_code::IO;
        }
    }
    exit_code::FAILURE
}

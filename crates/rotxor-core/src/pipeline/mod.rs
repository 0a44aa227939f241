//! Parallel, order-preserving stream transformation.
//!
//! A run wires one shared source and one shared sink to a pool of identical
//! workers. Each worker loops: claim the next block and its stream offset,
//! derive the key stream at that offset, XOR in place, then submit the
//! block to the sink, which holds it until every earlier byte has been
//! written. Workers never exchange blocks with each other, so the scheme
//! needs no queues and no central dispatcher; the two cursors are the whole
//! coordination surface.
//!
//! The first fatal error aborts the run: the failing worker wakes everyone
//! parked on the sink, the others drain out with [`PipelineError::Aborted`],
//! and the original cause is what the caller sees.

mod coordinator;
mod metrics;
mod worker;

use std::io::{self, Read, Write};
use std::thread;

use thiserror::Error;
use tracing::{debug, instrument};

use crate::keystream::KeyMaterial;
use coordinator::{SharedSink, SharedSource};
use metrics::PipelineMetrics;
use worker::WorkerShared;

/// Default bytes per claimed block.
pub const DEFAULT_BLOCK_SIZE: usize = 4096;

/// Tuning knobs for a pipeline run.
#[derive(Debug, Clone)]
pub struct PipelineOptions {
    /// Worker count, including the invoking thread. The default is a single
    /// worker; callers that want throughput should pass the machine's
    /// available parallelism.
    pub worker_count: usize,
    /// Bytes claimed per unit of work.
    pub block_size: usize,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            worker_count: 1,
            block_size: DEFAULT_BLOCK_SIZE,
        }
    }
}

/// Fatal pipeline outcomes.
#[derive(Error, Debug)]
pub enum PipelineError {
    /// Zero workers can make no progress at all.
    #[error("invalid worker count 0 (need at least one worker)")]
    InvalidWorkerCount,

    /// Zero-byte blocks would claim nothing and never advance the stream.
    #[error("invalid block size 0 (need at least one byte per block)")]
    InvalidBlockSize,

    /// The input failed for a reason other than a clean end of stream.
    #[error("input read failed at offset {offset}: {source}")]
    Read {
        offset: u64,
        #[source]
        source: io::Error,
    },

    /// The output rejected an in-order block.
    #[error("output write failed at offset {offset}: {source}")]
    Write {
        offset: u64,
        #[source]
        source: io::Error,
    },

    /// The write cursor moved past a block that was never written. This is
    /// an internal ordering violation; the output can no longer line up.
    #[error("write cursor at {cursor} already passed block offset {offset}")]
    CursorOvertaken { cursor: u64, offset: u64 },

    /// Another worker hit the fatal error first; this one just stood down.
    /// [`run_pipeline`] reports the original cause when it has one.
    #[error("pipeline aborted after a fatal error on another worker")]
    Aborted,
}

/// Summary of a completed run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PipelineReport {
    /// Total bytes transformed; input consumed equals output written.
    pub bytes: u64,
    /// Blocks claimed from the input.
    pub blocks: u64,
    /// Times a worker parked because an earlier block was still unwritten.
    pub write_waits: u64,
}

/// Transforms `input` into `output` with `options.worker_count` workers.
///
/// The output is byte-for-byte identical to a single-threaded pass for
/// every worker count and block size, because key material is addressed by
/// absolute offset and the sink refuses to write out of order. The call
/// blocks until the input is drained and the output flushed.
///
/// Both streams are taken by value; pass `&mut` references to keep them.
/// The invoking thread does a full worker's share, so `worker_count == 1`
/// spawns no threads at all.
#[instrument(
    level = "debug",
    name = "pipeline",
    skip_all,
    fields(
        workers = options.worker_count,
        block_size = options.block_size,
        key_len = key.len(),
    )
)]
pub fn run_pipeline<R, W>(
    input: R,
    output: W,
    key: &KeyMaterial,
    options: &PipelineOptions,
) -> Result<PipelineReport, PipelineError>
where
    R: Read + Send,
    W: Write + Send,
{
    if options.worker_count == 0 {
        return Err(PipelineError::InvalidWorkerCount);
    }
    if options.block_size == 0 {
        return Err(PipelineError::InvalidBlockSize);
    }

    let source = SharedSource::new(input);
    let sink = SharedSink::new(output);
    let metrics = PipelineMetrics::new();
    let make_shared = || WorkerShared {
        source: &source,
        sink: &sink,
        key,
        metrics: &metrics,
        block_size: options.block_size,
    };

    let outcome = thread::scope(|scope| {
        let spawned: Vec<_> = (1..options.worker_count)
            .map(|index| {
                let shared = make_shared();
                scope.spawn(move || worker::run(&shared, index))
            })
            .collect();

        // The invoking thread doubles as worker 0.
        let mut fatal = None;
        let mut aborted = false;
        let mut note = |result: Result<(), PipelineError>| match result {
            Ok(()) => {}
            Err(PipelineError::Aborted) => aborted = true,
            Err(err) => {
                if fatal.is_none() {
                    fatal = Some(err);
                }
            }
        };
        note(worker::run(&make_shared(), 0));
        for handle in spawned {
            match handle.join() {
                Ok(result) => note(result),
                Err(panic) => std::panic::resume_unwind(panic),
            }
        }
        match fatal {
            Some(err) => Err(err),
            None if aborted => Err(PipelineError::Aborted),
            None => Ok(()),
        }
    });

    if let Err(err) = outcome {
        // Keep the completed prefix visible on the output for diagnosis.
        let _ = sink.finish();
        return Err(err);
    }

    let bytes = sink.finish()?;
    let snapshot = metrics.snapshot();
    debug!(
        bytes,
        blocks = snapshot.blocks_claimed,
        write_waits = snapshot.write_waits,
        "pipeline complete"
    );
    Ok(PipelineReport {
        bytes,
        blocks: snapshot.blocks_claimed,
        write_waits: snapshot.write_waits,
    })
}

//! The per-worker block loop: claim, seek, transform, submit.

use std::io::{Read, Write};

use tracing::debug;

use super::PipelineError;
use super::coordinator::{SharedSink, SharedSource};
use super::metrics::PipelineMetrics;
use crate::cipher;
use crate::keystream::{KeyMaterial, KeyStream};

/// Everything a worker borrows from the pipeline run that spawned it.
pub(crate) struct WorkerShared<'a, R, W> {
    pub source: &'a SharedSource<R>,
    pub sink: &'a SharedSink<W>,
    pub key: &'a KeyMaterial,
    pub metrics: &'a PipelineMetrics,
    pub block_size: usize,
}

/// Runs one worker until the input drains or a fatal error surfaces.
///
/// The block buffer and key stream are allocated once and reused across
/// claims. Re-deriving the stream at each claim's absolute offset is what
/// makes the claim arrival order irrelevant to the output bytes.
pub(crate) fn run<R: Read, W: Write>(
    shared: &WorkerShared<'_, R, W>,
    worker: usize,
) -> Result<(), PipelineError> {
    let mut block = vec![0u8; shared.block_size];
    let mut keystream = KeyStream::new(shared.key);
    let mut blocks = 0u64;
    debug!(worker, "worker started");
    loop {
        let claim = match shared.source.claim(&mut block, shared.metrics) {
            Ok(Some(claim)) => claim,
            Ok(None) => break,
            Err(err) => {
                // A failed read flips no flag on its own; wake any parked
                // writers before bailing out.
                shared.sink.abort();
                return Err(err);
            }
        };
        keystream.seek(shared.key, claim.offset);
        cipher::apply(&mut keystream, &mut block[..claim.len]);
        shared
            .sink
            .submit(claim.offset, &block[..claim.len], shared.metrics)?;
        blocks += 1;
    }
    debug!(worker, blocks, "worker drained the input");
    Ok(())
}

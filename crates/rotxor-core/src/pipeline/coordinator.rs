//! The two guarded cursors that keep parallel block I/O in stream order.
//!
//! Reads and writes both go through a single mutex-protected cursor each.
//! Claiming a block is one read-and-advance under the read lock, which makes
//! claims contiguous and non-overlapping across any number of workers.
//! Writes are serialized by offset: a worker whose block is not next in the
//! stream parks on a condvar until the write cursor reaches it. A fatal
//! error on either side flips an abort flag and wakes every parked worker,
//! so nobody is left waiting on a cursor that will never advance.

use std::io::{self, Read, Write};
use std::sync::{Condvar, Mutex, PoisonError};

use tracing::{trace, warn};

use super::PipelineError;
use super::metrics::PipelineMetrics;

/// A byte range handed to exactly one worker by the read cursor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Claim {
    /// Absolute stream offset of the first byte.
    pub offset: u64,
    /// Valid bytes read into the worker's buffer; `1..=buf.len()`.
    pub len: usize,
}

/// A poisoned cursor lock means a worker panicked mid-operation and the run
/// is already lost; surface it as the shared abort path.
fn poisoned<G>(_: PoisonError<G>) -> PipelineError {
    PipelineError::Aborted
}

/// Read side: the input stream behind a claim-and-advance cursor.
pub(crate) struct SharedSource<R> {
    state: Mutex<SourceState<R>>,
}

struct SourceState<R> {
    reader: R,
    /// Next unclaimed input offset.
    offset: u64,
}

impl<R: Read> SharedSource<R> {
    pub fn new(reader: R) -> Self {
        Self {
            state: Mutex::new(SourceState { reader, offset: 0 }),
        }
    }

    /// Claims the next block of up to `buf.len()` bytes.
    ///
    /// Returns `Ok(None)` on a clean end of stream, now and on every later
    /// call. The read happens under the cursor lock so the offset snapshot
    /// and the advance are one atomic step; a short read simply yields a
    /// short claim.
    pub fn claim(
        &self,
        buf: &mut [u8],
        metrics: &PipelineMetrics,
    ) -> Result<Option<Claim>, PipelineError> {
        let mut state = self.state.lock().map_err(poisoned)?;
        let offset = state.offset;
        let len = match read_retrying(&mut state.reader, buf) {
            Ok(0) => {
                trace!(offset, "input drained");
                return Ok(None);
            }
            Ok(n) => n,
            Err(source) => {
                warn!(offset, error = %source, "input read failed");
                return Err(PipelineError::Read { offset, source });
            }
        };
        state.offset += len as u64;
        metrics.record_claim(len as u64);
        trace!(offset, len, "claimed block");
        Ok(Some(Claim { offset, len }))
    }
}

/// One `read` call, retried only when the OS interrupts it.
fn read_retrying<R: Read>(reader: &mut R, buf: &mut [u8]) -> io::Result<usize> {
    loop {
        match reader.read(buf) {
            Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
            other => return other,
        }
    }
}

/// Write side: the output stream behind an in-order cursor plus the condvar
/// that parks out-of-order completions.
pub(crate) struct SharedSink<W> {
    state: Mutex<SinkState<W>>,
    advanced: Condvar,
}

struct SinkState<W> {
    writer: W,
    /// Next offset that must be written.
    offset: u64,
    /// Set on the first fatal error anywhere in the pipeline; parked
    /// writers check it instead of waiting forever.
    aborted: bool,
}

impl<W: Write> SharedSink<W> {
    pub fn new(writer: W) -> Self {
        Self {
            state: Mutex::new(SinkState {
                writer,
                offset: 0,
                aborted: false,
            }),
            advanced: Condvar::new(),
        }
    }

    /// Writes `block` at `offset`, parking until the write cursor gets there.
    ///
    /// Wakeups can be spurious, so the cursor condition is re-tested on
    /// every pass. On success the cursor advances past the block and all
    /// parked writers are woken to re-check.
    pub fn submit(
        &self,
        offset: u64,
        block: &[u8],
        metrics: &PipelineMetrics,
    ) -> Result<(), PipelineError> {
        let mut state = self.state.lock().map_err(poisoned)?;
        while !state.aborted && state.offset < offset {
            trace!(cursor = state.offset, offset, "waiting for earlier block");
            metrics.record_write_wait();
            state = self.advanced.wait(state).map_err(poisoned)?;
        }
        if state.aborted {
            return Err(PipelineError::Aborted);
        }
        if state.offset != offset {
            // The cursor only passes an unwritten offset if ordering broke.
            let cursor = state.offset;
            warn!(cursor, offset, "write cursor already past this block");
            self.abort_locked(&mut state);
            return Err(PipelineError::CursorOvertaken { cursor, offset });
        }
        if let Err(source) = state.writer.write_all(block) {
            warn!(offset, len = block.len(), error = %source, "output write failed");
            self.abort_locked(&mut state);
            return Err(PipelineError::Write { offset, source });
        }
        state.offset += block.len() as u64;
        metrics.record_write(block.len() as u64);
        trace!(offset, len = block.len(), "block written");
        self.advanced.notify_all();
        Ok(())
    }

    /// Flips the abort flag and wakes every parked writer. Called by
    /// whichever worker hits the first fatal error, read side included.
    pub fn abort(&self) {
        // On poison the flag still needs to be set; the bool and the
        // condvar do not depend on the writer's internal consistency.
        let mut state = self
            .state
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        self.abort_locked(&mut state);
    }

    fn abort_locked(&self, state: &mut SinkState<W>) {
        state.aborted = true;
        self.advanced.notify_all();
    }

    /// Flushes the writer once the pipeline has drained; returns the final
    /// cursor position, which is the total number of bytes written.
    pub fn finish(&self) -> Result<u64, PipelineError> {
        let mut state = self.state.lock().map_err(poisoned)?;
        let offset = state.offset;
        if let Err(source) = state.writer.flush() {
            return Err(PipelineError::Write { offset, source });
        }
        Ok(offset)
    }
}

//! Keyed, position-dependent XOR transform for byte streams.
//!
//! The transform is self-inverse and embarrassingly parallel: every output
//! byte depends only on the input byte at the same offset and on key material
//! derived from that offset. [`run_pipeline`] exploits this with a pool of
//! workers that read and write a single pair of streams through guarded
//! cursors, so the output leaves in exact stream order no matter which worker
//! finishes first.
//!
//! This is obfuscation, not cryptography. Do not reach for it where a real
//! cipher is required.

pub mod cipher;
pub mod error;
pub mod keystream;
pub mod pipeline;

pub use keystream::{KeyMaterial, KeyStream};
pub use pipeline::{DEFAULT_BLOCK_SIZE, PipelineOptions, PipelineReport, run_pipeline};

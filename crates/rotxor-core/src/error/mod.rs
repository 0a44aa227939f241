//! Error types, re-exported in one place so callers can match on the whole
//! taxonomy without chasing module paths.

pub use crate::keystream::KeyError;
pub use crate::pipeline::PipelineError;

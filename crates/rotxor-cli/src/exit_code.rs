//! Process exit codes, kept distinct so scripts can tell a bad invocation
//! from a mid-stream failure.

/// Clean run: the input drained and the output flushed.
pub const SUCCESS: u8 = 0;

/// Unclassified failure.
pub const FAILURE: u8 = 1;

/// The configuration was rejected before any byte moved: empty key, zero
/// workers, zero block size.
pub const CONFIG: u8 = 2;

/// An I/O operation failed: reading the key file, reading stdin, or
/// writing stdout.
pub const IO: u8 = 3;

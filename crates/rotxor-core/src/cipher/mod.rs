//! The XOR transform itself.
//!
//! XOR with the same key stream is its own inverse, so encrypt and decrypt
//! are one operation.

use crate::keystream::KeyStream;

/// XORs `block` in place against the next `block.len()` bytes of the key
/// stream.
///
/// The caller positions the stream; combined with [`KeyStream::at_offset`]
/// this transforms any slice of the input independently of the rest.
pub fn apply(keystream: &mut KeyStream, block: &mut [u8]) {
    for byte in &mut *block {
        *byte ^= keystream.next_byte();
    }
}

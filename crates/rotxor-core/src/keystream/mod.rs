//! Key scheduling: the rotating key and position-addressed key streams.
//!
//! The key is treated as one continuous bit sequence, most significant bit
//! of byte 0 first. Each time a key stream exhausts the key it rotates the
//! whole sequence left by one bit, so the schedule only repeats after
//! `8 * key_len` rotations. Because the rotation count and the byte index
//! are both pure functions of the absolute stream offset, a key stream can
//! be derived at any offset in `O(key_len)` without replaying the bytes in
//! between. That derivation is what lets workers transform blocks of the
//! stream in any order.

use std::fmt;

use thiserror::Error;
use zeroize::Zeroizing;

/// Errors produced when loading key material.
#[derive(Error, Debug)]
pub enum KeyError {
    /// The key source held no bytes at all.
    #[error("key material is empty (need at least one key byte)")]
    Empty,
}

/// The base key as loaded from its source.
///
/// Wipes itself from memory on drop and never prints its bytes through
/// `Debug`. The contained sequence is guaranteed non-empty.
pub struct KeyMaterial {
    bytes: Zeroizing<Vec<u8>>,
}

impl KeyMaterial {
    /// Takes ownership of the raw key bytes.
    ///
    /// An empty key would make every derived stream undefined, so it is
    /// rejected here rather than checked again on every hot-path call.
    pub fn new(bytes: Vec<u8>) -> Result<Self, KeyError> {
        if bytes.is_empty() {
            return Err(KeyError::Empty);
        }
        Ok(Self {
            bytes: Zeroizing::new(bytes),
        })
    }

    /// Key length in bytes.
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Always false; empty key material cannot be constructed.
    pub fn is_empty(&self) -> bool {
        false
    }
}

impl fmt::Debug for KeyMaterial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyMaterial")
            .field("len", &self.bytes.len())
            .field("bytes", &"[REDACTED]")
            .finish()
    }
}

/// Rotates `key` left by `bits` positions, treating the slice as a single
/// bit sequence with the most significant bit of `key[0]` first.
///
/// Rotating by any multiple of `8 * key.len()` is the identity. Empty
/// slices are left untouched.
pub fn rotate_left(key: &mut [u8], bits: u64) {
    if key.is_empty() {
        return;
    }
    let len = key.len();
    // Split into a whole-byte rotation and a sub-byte carry pass so the
    // shift amounts stay in range for arbitrary `bits`.
    let byte_shift = ((bits / 8) % len as u64) as usize;
    let bit_shift = (bits % 8) as u32;
    key.rotate_left(byte_shift);
    if bit_shift > 0 {
        let first = key[0];
        for i in 0..len - 1 {
            key[i] = (key[i] << bit_shift) | (key[i + 1] >> (8 - bit_shift));
        }
        key[len - 1] = (key[len - 1] << bit_shift) | (first >> (8 - bit_shift));
    }
}

/// A cursor over the infinite key byte sequence.
///
/// Holds a working copy of the key at its current rotation plus an index
/// into it. [`KeyStream::seek`] repositions the cursor to an arbitrary
/// stream offset without stepping through the intervening bytes.
pub struct KeyStream {
    working: Zeroizing<Vec<u8>>,
    index: usize,
}

impl KeyStream {
    /// A stream positioned at offset zero.
    pub fn new(base: &KeyMaterial) -> Self {
        Self {
            working: Zeroizing::new(base.bytes.to_vec()),
            index: 0,
        }
    }

    /// A stream positioned at `offset`, equivalent to `new` followed by
    /// `offset` calls to [`KeyStream::next_byte`].
    pub fn at_offset(base: &KeyMaterial, offset: u64) -> Self {
        let mut stream = Self::new(base);
        stream.seek(base, offset);
        stream
    }

    /// Repositions this stream at an absolute offset, reusing its buffer.
    ///
    /// The byte at offset `k` belongs to rotation `k / key_len` of the base
    /// key, at index `k % key_len`; both are computed directly rather than
    /// replayed, so a seek costs `O(key_len)` regardless of distance or
    /// direction.
    pub fn seek(&mut self, base: &KeyMaterial, offset: u64) {
        self.working.resize(base.bytes.len(), 0);
        self.working.copy_from_slice(&base.bytes);
        let len = base.bytes.len() as u64;
        rotate_left(&mut self.working, offset / len);
        self.index = (offset % len) as usize;
    }

    /// The key byte at the current offset; advances the cursor by one.
    #[inline]
    pub fn next_byte(&mut self) -> u8 {
        let byte = self.working[self.index];
        self.index += 1;
        if self.index == self.working.len() {
            self.index = 0;
            rotate_left(&mut self.working, 1);
        }
        byte
    }
}

impl fmt::Debug for KeyStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyStream")
            .field("index", &self.index)
            .field("working", &"[REDACTED]")
            .finish()
    }
}

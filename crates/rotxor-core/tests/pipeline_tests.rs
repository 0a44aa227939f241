//! End-to-end pipeline tests over in-memory streams.
//!
//! The contract under test: for every worker count and block size, the
//! pipeline's output is byte-for-byte the output of a sequential
//! byte-at-a-time pass with the rotating key.

use std::io::{self, Cursor, Read};

use rand::{RngCore, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rotxor_core::error::PipelineError;
use rotxor_core::{KeyMaterial, PipelineOptions, run_pipeline};

/// Runs the pipeline over `input` and returns the transformed bytes.
fn transform(input: &[u8], key: &[u8], workers: usize, block_size: usize) -> Vec<u8> {
    let key = KeyMaterial::new(key.to_vec()).expect("non-empty key");
    let options = PipelineOptions {
        worker_count: workers,
        block_size,
    };
    let mut output = Vec::new();
    let report = run_pipeline(Cursor::new(input), &mut output, &key, &options)
        .expect("pipeline run failed");
    assert_eq!(report.bytes, input.len() as u64);
    assert_eq!(output.len(), input.len());
    output
}

/// Independent byte-at-a-time reference: XOR against the key, rotating the
/// whole key left by one bit each time it is exhausted.
fn sequential_reference(input: &[u8], key: &[u8]) -> Vec<u8> {
    fn rotate_one_bit(key: &mut [u8]) {
        let carry = key[0] >> 7;
        for i in 0..key.len() - 1 {
            key[i] = (key[i] << 1) | (key[i + 1] >> 7);
        }
        let last = key.len() - 1;
        key[last] = (key[last] << 1) | carry;
    }

    let mut working = key.to_vec();
    let mut index = 0;
    input
        .iter()
        .map(|&byte| {
            let out = byte ^ working[index];
            index += 1;
            if index == working.len() {
                index = 0;
                rotate_one_bit(&mut working);
            }
            out
        })
        .collect()
}

fn seeded_bytes(len: usize, seed: u64) -> Vec<u8> {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let mut data = vec![0u8; len];
    rng.fill_bytes(&mut data);
    data
}

#[test]
fn known_vector_with_two_workers() {
    // Key [0xff, 0x00], two 2-byte blocks; the second block sees the key's
    // one-bit rotation [0xfe, 0x01].
    let output = transform(&[0x0f, 0xf0, 0x0f, 0xf0], &[0xff, 0x00], 2, 2);
    assert_eq!(output, vec![0xf0, 0xf0, 0xf1, 0xf1]);
}

#[test]
fn empty_input_produces_empty_output() {
    let key = KeyMaterial::new(vec![0x42]).unwrap();
    let mut output = Vec::new();
    let report = run_pipeline(
        Cursor::new(Vec::new()),
        &mut output,
        &key,
        &PipelineOptions::default(),
    )
    .unwrap();
    assert!(output.is_empty());
    assert_eq!(report.bytes, 0);
    assert_eq!(report.blocks, 0);
}

#[test]
fn input_shorter_than_one_block() {
    let data = seeded_bytes(100, 1);
    let output = transform(&data, &[0x13, 0x37], 4, 4096);
    assert_eq!(output, sequential_reference(&data, &[0x13, 0x37]));
}

#[test]
fn tail_block_may_be_short() {
    // 100 = 14 * 7 + 2, so the last claim is a 2-byte block.
    let data = seeded_bytes(100, 2);
    let output = transform(&data, &[0xaa, 0xbb, 0xcc], 2, 7);
    assert_eq!(output, sequential_reference(&data, &[0xaa, 0xbb, 0xcc]));
}

#[test]
fn matches_sequential_reference_across_configurations() {
    let data = seeded_bytes(8_009, 3);
    let key = [0x87, 0xde, 0x2e, 0x87, 0x6a, 0xd7, 0xdc, 0xcf, 0xc8];
    let expected = sequential_reference(&data, &key);
    for workers in [1usize, 2, 8] {
        for block_size in [1usize, 9, 90, 4096] {
            let output = transform(&data, &key, workers, block_size);
            assert_eq!(
                output, expected,
                "{workers} workers, {block_size}-byte blocks"
            );
        }
    }
}

#[test]
fn worker_count_does_not_change_output() {
    let data = seeded_bytes(50_000, 4);
    let key = [0x01, 0x80, 0x7f];
    let single = transform(&data, &key, 1, 512);
    for workers in [2usize, 3, 8] {
        assert_eq!(transform(&data, &key, workers, 512), single);
    }
}

#[test]
fn transforming_twice_restores_the_input() {
    let data = seeded_bytes(30_000, 5);
    let key = [0xde, 0xad, 0xbe, 0xef, 0x01];
    let scrambled = transform(&data, &key, 8, 64);
    assert_ne!(scrambled, data);
    assert_eq!(transform(&scrambled, &key, 8, 64), data);
}

#[test]
fn roundtrip_with_different_block_sizes_per_direction() {
    // The transform depends only on absolute offsets, so the two passes do
    // not need matching block sizes or worker counts.
    let data = seeded_bytes(10_240, 6);
    let key = [0x55, 0xaa];
    let scrambled = transform(&data, &key, 8, 37);
    assert_eq!(transform(&scrambled, &key, 3, 4096), data);
}

#[test]
fn report_counts_blocks() {
    let data = seeded_bytes(100, 7);
    let key = KeyMaterial::new(vec![0x11]).unwrap();
    let options = PipelineOptions {
        worker_count: 2,
        block_size: 7,
    };
    let mut output = Vec::new();
    let report = run_pipeline(Cursor::new(&data[..]), &mut output, &key, &options).unwrap();
    assert_eq!(report.bytes, 100);
    assert_eq!(report.blocks, 15);
}

#[test]
fn short_reads_only_shorten_claims() {
    /// Serves at most three bytes per read call, whatever the buffer size.
    struct Stutter {
        inner: Cursor<Vec<u8>>,
    }
    impl Read for Stutter {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            let cap = buf.len().min(3);
            self.inner.read(&mut buf[..cap])
        }
    }

    let data = seeded_bytes(1_000, 8);
    let key = KeyMaterial::new(vec![0x3c, 0xa5, 0x99]).unwrap();
    let options = PipelineOptions {
        worker_count: 4,
        block_size: 256,
    };
    let mut output = Vec::new();
    let report = run_pipeline(
        Stutter {
            inner: Cursor::new(data.clone()),
        },
        &mut output,
        &key,
        &options,
    )
    .unwrap();
    assert_eq!(output, sequential_reference(&data, &[0x3c, 0xa5, 0x99]));
    // Every claim was cut short at three bytes.
    assert!(report.blocks >= 334);
}

#[test]
fn zero_workers_are_rejected() {
    let key = KeyMaterial::new(vec![0x01]).unwrap();
    let options = PipelineOptions {
        worker_count: 0,
        block_size: 4096,
    };
    let err = run_pipeline(Cursor::new(vec![1u8]), Vec::new(), &key, &options).unwrap_err();
    assert!(matches!(err, PipelineError::InvalidWorkerCount));
}

#[test]
fn zero_block_size_is_rejected() {
    let key = KeyMaterial::new(vec![0x01]).unwrap();
    let options = PipelineOptions {
        worker_count: 2,
        block_size: 0,
    };
    let err = run_pipeline(Cursor::new(vec![1u8]), Vec::new(), &key, &options).unwrap_err();
    assert!(matches!(err, PipelineError::InvalidBlockSize));
}

#[test]
fn reader_failure_stops_the_whole_run() {
    /// Serves `remaining` bytes, then fails every read.
    struct FailAfter {
        remaining: usize,
    }
    impl Read for FailAfter {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            if self.remaining == 0 {
                return Err(io::Error::other("injected read failure"));
            }
            let n = self.remaining.min(buf.len());
            buf[..n].fill(0x5a);
            self.remaining -= n;
            Ok(n)
        }
    }

    let key = KeyMaterial::new(vec![0x77]).unwrap();
    let options = PipelineOptions {
        worker_count: 4,
        block_size: 4,
    };
    let err = run_pipeline(
        FailAfter { remaining: 8 },
        Vec::new(),
        &key,
        &options,
    )
    .unwrap_err();
    assert!(matches!(err, PipelineError::Read { offset: 8, .. }));
}

#[test]
fn writer_failure_stops_the_whole_run() {
    struct RejectAll;
    impl io::Write for RejectAll {
        fn write(&mut self, _: &[u8]) -> io::Result<usize> {
            Err(io::Error::other("injected write failure"))
        }
        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    let data = seeded_bytes(1_000, 9);
    let key = KeyMaterial::new(vec![0x77]).unwrap();
    let options = PipelineOptions {
        worker_count: 4,
        block_size: 64,
    };
    let err = run_pipeline(Cursor::new(data), RejectAll, &key, &options).unwrap_err();
    assert!(matches!(err, PipelineError::Write { offset: 0, .. }));
}

//! Fuzz target for the whole pipeline: transforming twice with the same key
//! must restore the input for any worker count and block size.

#![no_main]

use std::io::Cursor;

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use rotxor_core::{KeyMaterial, PipelineOptions, run_pipeline};

#[derive(Arbitrary, Debug)]
struct Input {
    data: Vec<u8>,
    key: Vec<u8>,
    workers: u8,
    block_size: u16,
}

fuzz_target!(|input: Input| {
    if input.key.is_empty() || input.key.len() > 64 || input.data.len() > 1 << 16 {
        return;
    }

    let key = KeyMaterial::new(input.key).expect("non-empty key");
    let options = PipelineOptions {
        worker_count: usize::from(input.workers % 4) + 1,
        block_size: usize::from(input.block_size % 512) + 1,
    };

    let mut scrambled = Vec::new();
    let report = run_pipeline(Cursor::new(&input.data[..]), &mut scrambled, &key, &options)
        .expect("forward pass");
    assert_eq!(report.bytes, input.data.len() as u64);

    let mut restored = Vec::new();
    run_pipeline(Cursor::new(&scrambled[..]), &mut restored, &key, &options)
        .expect("backward pass");
    assert_eq!(restored, input.data);
});

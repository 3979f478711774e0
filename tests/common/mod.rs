//! Common fixtures for the integration tests
//!
//! Most tests run against the `Tiny` preset (2 tiles, 4 compute units,
//! 4 lanes, vector banks of 16 words, weight bank of 32 words) so the full
//! contents of every bank can be checked by hand.

#![allow(dead_code)]

use npuforge::{AcceleratorContext, ArchParams, ArchPreset, Cell, MemoryBank, TensorData};
pub use serial_test::serial;

pub fn tiny_arch() -> ArchParams {
    ArchParams::from_preset(ArchPreset::Tiny)
}

pub fn tiny_context() -> AcceleratorContext {
    npuforge::init_logging_default();
    AcceleratorContext::new(tiny_arch()).expect("tiny preset is valid")
}

pub fn reference_context() -> AcceleratorContext {
    npuforge::init_logging_default();
    AcceleratorContext::new(ArchParams::default()).expect("reference preset is valid")
}

/// Nonzero values 1..=127 repeating, so padding zeros are distinguishable
pub fn ramp(len: usize) -> Vec<i8> {
    (0..len).map(|i| (i % 127) as i8 + 1).collect()
}

pub fn ramp_matrix(rows: usize, cols: usize) -> TensorData {
    TensorData::matrix(rows, cols, ramp(rows * cols)).expect("ramp has rows * cols values")
}

/// Assert that a bank's descriptors partition it into well-formed runs
pub fn assert_partition(bank: &MemoryBank) {
    let cells = bank.cells();
    let mut idx = 0;
    while idx < cells.len() {
        match cells[idx] {
            Cell::Free => idx += 1,
            Cell::Header { length } => {
                assert!(length >= 1, "{}: empty run at {}", bank.id(), idx);
                assert!(
                    idx + length <= cells.len(),
                    "{}: run at {} overruns the bank",
                    bank.id(),
                    idx
                );
                for offset in idx + 1..idx + length {
                    assert_eq!(
                        cells[offset],
                        Cell::Continuation,
                        "{}: broken run at {}",
                        bank.id(),
                        offset
                    );
                }
                idx += length;
            }
            Cell::Continuation => panic!("{}: orphan continuation at {}", bank.id(), idx),
        }
    }
}

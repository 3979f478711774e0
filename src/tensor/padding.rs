//! Hardware padding rules
//!
//! Tensors are padded so that every memory word is completely filled:
//! - Primary-vector tensors span all tiles, so their length is rounded to
//!   `tiles × lanes`
//! - Auxiliary vectors and matrix rows use two regimes. Short extents
//!   (`len < 0.3 × compute_units × lanes`) are rounded to a fine granule of
//!   `compute_units × lanes / 10`; longer extents are rounded to
//!   `compute_units`
//! - Matrix columns are rounded to `tiles × lanes`
//!
//! The fine granule and the threshold are fractional. Both are evaluated in
//! integer arithmetic scaled by 10, and a fine-regime result is truncated
//! toward zero exactly like the hardware tables it mirrors.
//!
//! Padded extents return `None` when they do not fit in a `usize`.

use crate::arch::ArchParams;

/// Ceiling division
pub fn ceil_div(value: usize, divisor: usize) -> usize {
    debug_assert!(divisor > 0);
    value.div_ceil(divisor)
}

/// Round `value` up to the next multiple of `multiple`
pub fn round_up(value: usize, multiple: usize) -> Option<usize> {
    ceil_div(value, multiple).checked_mul(multiple)
}

/// Whether `len` falls into the fine-granularity regime
///
/// `len < compute_units × lanes × 0.3`, i.e. `10 × len < 3 × compute_units × lanes`.
pub fn is_fine_regime(len: usize, compute_units: usize, lanes: usize) -> bool {
    let threshold = compute_units
        .checked_mul(lanes)
        .and_then(|span| span.checked_mul(3));
    match (len.checked_mul(10), threshold) {
        (Some(scaled), Some(threshold)) => scaled < threshold,
        (None, _) => false,
        (Some(_), None) => true,
    }
}

/// Two-regime padding shared by auxiliary vectors and matrix rows
pub fn pad_two_regime(len: usize, compute_units: usize, lanes: usize) -> Option<usize> {
    if is_fine_regime(len, compute_units, lanes) {
        // ceil(len / (N / 10)) * N / 10, with N = compute_units × lanes
        let span = compute_units.checked_mul(lanes)?;
        let scaled = len.checked_mul(10)?;
        Some(ceil_div(scaled, span).checked_mul(span)? / 10)
    } else {
        round_up(len, compute_units)
    }
}

/// Padded length of a vector in the primary (tiled) vector bank
pub fn pad_primary_vector(len: usize, arch: &ArchParams) -> Option<usize> {
    round_up(len, arch.vector_word_width())
}

/// Padded length of a vector in a single-array auxiliary bank
pub fn pad_auxiliary_vector(len: usize, arch: &ArchParams) -> Option<usize> {
    pad_two_regime(len, arch.compute_units, arch.lanes)
}

/// Padded row count of a weight matrix
///
/// The two-regime result is aligned to `compute_units` so every row group
/// spans all compute units.
pub fn pad_matrix_rows(rows: usize, arch: &ArchParams) -> Option<usize> {
    round_up(
        pad_two_regime(rows, arch.compute_units, arch.lanes)?,
        arch.compute_units,
    )
}

/// Padded column count of a weight matrix
pub fn pad_matrix_cols(cols: usize, arch: &ArchParams) -> Option<usize> {
    round_up(cols, arch.vector_word_width())
}

/// Words occupied by a padded primary vector
pub fn primary_vector_words(padded_len: usize, arch: &ArchParams) -> usize {
    padded_len / arch.tiles / arch.lanes
}

/// Words occupied by a padded auxiliary vector
pub fn auxiliary_vector_words(padded_len: usize, arch: &ArchParams) -> usize {
    ceil_div(padded_len, arch.lanes)
}

/// Words occupied by a padded matrix
pub fn matrix_words(padded_rows: usize, padded_cols: usize, arch: &ArchParams) -> usize {
    (padded_cols / arch.tiles / arch.lanes) * (padded_rows / arch.compute_units)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arch::ArchPreset;

    fn tiny() -> ArchParams {
        ArchParams::from_preset(ArchPreset::Tiny)
    }

    #[test]
    fn test_round_up() {
        assert_eq!(round_up(0, 8), Some(0));
        assert_eq!(round_up(1, 8), Some(8));
        assert_eq!(round_up(8, 8), Some(8));
        assert_eq!(round_up(9, 8), Some(16));
    }

    #[test]
    fn test_primary_vector() {
        let arch = tiny();
        assert_eq!(pad_primary_vector(10, &arch), Some(16));
        assert_eq!(primary_vector_words(16, &arch), 2);
        assert_eq!(pad_primary_vector(8, &arch), Some(8));
        assert_eq!(pad_primary_vector(1, &arch), Some(8));
    }

    #[test]
    fn test_threshold_is_strict() {
        // compute_units × lanes = 40, threshold 12
        assert!(is_fine_regime(11, 4, 10));
        assert!(!is_fine_regime(12, 4, 10));
        // compute_units × lanes = 16, threshold 4.8
        assert!(is_fine_regime(4, 4, 4));
        assert!(!is_fine_regime(5, 4, 4));
    }

    #[test]
    fn test_two_regime_fine_granule() {
        // granule 4 (= 40 / 10)
        assert_eq!(pad_two_regime(1, 4, 10), Some(4));
        assert_eq!(pad_two_regime(5, 4, 10), Some(8));
        assert_eq!(pad_two_regime(11, 4, 10), Some(12));
        // coarse: multiples of compute_units
        assert_eq!(pad_two_regime(12, 4, 10), Some(12));
        assert_eq!(pad_two_regime(13, 4, 10), Some(16));
    }

    #[test]
    fn test_two_regime_fractional_granule_truncates() {
        // granule 1.6: ceil(len / 1.6) * 1.6 truncated
        assert_eq!(pad_two_regime(1, 4, 4), Some(1));
        assert_eq!(pad_two_regime(2, 4, 4), Some(3));
        assert_eq!(pad_two_regime(3, 4, 4), Some(3));
        assert_eq!(pad_two_regime(4, 4, 4), Some(4));
        assert_eq!(pad_two_regime(5, 4, 4), Some(8));
    }

    #[test]
    fn test_reference_arch_granules() {
        let arch = ArchParams::default();
        // 40 × 40 = 1600 elements per tile word: threshold 480, granule 160
        assert_eq!(pad_auxiliary_vector(100, &arch), Some(160));
        assert_eq!(pad_auxiliary_vector(479, &arch), Some(480));
        assert_eq!(pad_auxiliary_vector(480, &arch), Some(480));
        assert_eq!(pad_auxiliary_vector(481, &arch), Some(520));
        assert_eq!(pad_matrix_cols(1000, &arch), Some(1120));
    }

    #[test]
    fn test_matrix_rows_align_to_compute_units() {
        let arch = tiny();
        assert_eq!(pad_matrix_rows(1, &arch), Some(4));
        assert_eq!(pad_matrix_rows(3, &arch), Some(4));
        assert_eq!(pad_matrix_rows(4, &arch), Some(4));
        assert_eq!(pad_matrix_rows(5, &arch), Some(8));
        assert_eq!(matrix_words(8, 16, &arch), 4);
    }

    #[test]
    fn test_auxiliary_words() {
        let arch = tiny();
        assert_eq!(auxiliary_vector_words(3, &arch), 1);
        assert_eq!(auxiliary_vector_words(8, &arch), 2);
        assert_eq!(auxiliary_vector_words(9, &arch), 3);
    }

    #[test]
    fn test_overflow_is_none() {
        let arch = tiny();
        assert_eq!(round_up(usize::MAX - 2, 8), None);
        assert!(!is_fine_regime(usize::MAX / 2, 4, 4));
        assert_eq!(pad_primary_vector(usize::MAX, &arch), None);
        assert_eq!(pad_auxiliary_vector(usize::MAX, &arch), None);
        assert_eq!(pad_matrix_rows(usize::MAX - 1, &arch), None);
        assert_eq!(pad_matrix_cols(usize::MAX, &arch), None);
        // Large but representable
        assert_eq!(pad_primary_vector(1 << 33, &arch), Some(1 << 33));
    }
}

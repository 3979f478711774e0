//! Writing padded tensors into physical storage and reading them back

use super::mapping::{MatrixLayout, VectorLayout};
use crate::arch::ArchParams;
use crate::error::{ForgeResult, NpuForgeError};
use crate::invalid_argument;
use crate::storage::PhysicalStorage;
use crate::tensor::TensorDescriptor;

/// Write every padded element of an allocated matrix into weight storage
///
/// The mapping covers the footprint exactly once, so padding cells receive
/// the zeros of the padded payload.
pub fn place_matrix(
    storage: &mut PhysicalStorage,
    desc: &TensorDescriptor,
    arch: &ArchParams,
) -> ForgeResult<()> {
    let layout = MatrixLayout::of(desc, arch).ok_or_else(|| {
        invalid_argument!("'{}' is not an allocated matrix", desc.name())
    })?;

    let array = storage.array_mut(desc.bank());
    let padded = desc.padded_payload();
    for row in 0..layout.padded_rows {
        for col in 0..layout.padded_cols {
            let coord = layout.coord(row, col);
            let value = padded[row * layout.padded_cols + col];
            if !array.set(&coord.as_index(), value) {
                return Err(out_of_bank(desc, coord.slot));
            }
        }
    }

    tracing::trace!(
        tensor = desc.name(),
        cells = layout.footprint(),
        "Placed matrix"
    );
    Ok(())
}

/// Write an allocated vector into its bank's storage
///
/// In single-array banks the lanes of the last word beyond the padded length
/// are zeroed as well.
pub fn place_vector(
    storage: &mut PhysicalStorage,
    desc: &TensorDescriptor,
    arch: &ArchParams,
) -> ForgeResult<()> {
    let layout = VectorLayout::of(desc, arch).ok_or_else(|| {
        invalid_argument!("'{}' is not an allocated vector", desc.name())
    })?;

    let array = storage.array_mut(desc.bank());
    let padded = desc.padded_payload();
    for i in 0..layout.footprint() {
        let coord = layout.coord(i);
        let value = padded.get(i).copied().unwrap_or(0);
        let written = match layout {
            VectorLayout::Tiled { .. } => array.set(&[coord.tile, coord.slot, coord.lane], value),
            VectorLayout::Flat { .. } => array.set(&[coord.slot, coord.lane], value),
        };
        if !written {
            return Err(out_of_bank(desc, coord.slot));
        }
    }

    tracing::trace!(
        tensor = desc.name(),
        cells = layout.footprint(),
        "Placed vector"
    );
    Ok(())
}

/// Read an allocated matrix back in padded row-major order
pub fn gather_matrix(
    storage: &PhysicalStorage,
    desc: &TensorDescriptor,
    arch: &ArchParams,
) -> ForgeResult<Vec<i8>> {
    let layout = MatrixLayout::of(desc, arch).ok_or_else(|| {
        invalid_argument!("'{}' is not an allocated matrix", desc.name())
    })?;

    let array = storage.array(desc.bank());
    let mut out = Vec::with_capacity(layout.padded_rows * layout.padded_cols);
    for row in 0..layout.padded_rows {
        for col in 0..layout.padded_cols {
            let coord = layout.coord(row, col);
            let value = array
                .get(&coord.as_index())
                .ok_or_else(|| out_of_bank(desc, coord.slot))?;
            out.push(value);
        }
    }
    Ok(out)
}

/// Read an allocated vector back in padded order
pub fn gather_vector(
    storage: &PhysicalStorage,
    desc: &TensorDescriptor,
    arch: &ArchParams,
) -> ForgeResult<Vec<i8>> {
    let layout = VectorLayout::of(desc, arch).ok_or_else(|| {
        invalid_argument!("'{}' is not an allocated vector", desc.name())
    })?;

    let array = storage.array(desc.bank());
    let len = desc.padded_payload().len();
    let mut out = Vec::with_capacity(len);
    for i in 0..len {
        let coord = layout.coord(i);
        let value = match layout {
            VectorLayout::Tiled { .. } => array.get(&[coord.tile, coord.slot, coord.lane]),
            VectorLayout::Flat { .. } => array.get(&[coord.slot, coord.lane]),
        };
        out.push(value.ok_or_else(|| out_of_bank(desc, coord.slot))?);
    }
    Ok(out)
}

fn out_of_bank(desc: &TensorDescriptor, slot: usize) -> NpuForgeError {
    tracing::error!(tensor = desc.name(), bank = %desc.bank(), slot, "Placement outside bank");
    NpuForgeError::InternalInconsistency {
        bank: desc.bank(),
        offset: slot,
        detail: format!("tensor '{}' maps outside its bank", desc.name()),
    }
}

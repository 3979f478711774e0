//! Logical-to-physical coordinate mappings
//!
//! A padded matrix is cut into `tiles` column blocks of `tile_cols` columns.
//! Row `r` is served by compute unit `r mod compute_units`; each group of
//! `compute_units` rows occupies `tile_cols / lanes` consecutive words:
//!
//! ```text
//! tile = col / tile_cols
//! unit = row mod compute_units
//! slot = base + (col mod tile_cols) / lanes + (row / compute_units) * (tile_cols / lanes)
//! lane = col mod lanes
//! ```
//!
//! Vectors in the primary bank use the same column split across tiles.
//! Auxiliary banks have a single array, so a vector simply fills consecutive
//! words lane by lane.

use crate::arch::ArchParams;
use crate::tensor::{TensorDescriptor, TensorShape};

/// A cell of the 4-D weight storage
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PhysicalCoord {
    pub tile: usize,
    pub unit: usize,
    pub slot: usize,
    pub lane: usize,
}

impl PhysicalCoord {
    pub fn as_index(&self) -> [usize; 4] {
        [self.tile, self.unit, self.slot, self.lane]
    }
}

/// A cell of vector storage; `tile` is always 0 for single-array banks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct VectorCoord {
    pub tile: usize,
    pub slot: usize,
    pub lane: usize,
}

/// Placement geometry of one padded matrix
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MatrixLayout {
    pub tiles: usize,
    pub compute_units: usize,
    pub lanes: usize,
    pub padded_rows: usize,
    pub padded_cols: usize,
    pub base: usize,
}

impl MatrixLayout {
    /// Geometry of an allocated matrix descriptor
    pub fn of(desc: &TensorDescriptor, arch: &ArchParams) -> Option<Self> {
        match (desc.padded_shape(), desc.base_address()) {
            (TensorShape::Matrix { rows, cols }, Some(base)) => Some(Self {
                tiles: arch.tiles,
                compute_units: arch.compute_units,
                lanes: arch.lanes,
                padded_rows: rows,
                padded_cols: cols,
                base,
            }),
            _ => None,
        }
    }

    pub fn tile_cols(&self) -> usize {
        self.padded_cols / self.tiles
    }

    /// Words per compute-unit row group
    pub fn words_per_row_group(&self) -> usize {
        self.tile_cols() / self.lanes
    }

    pub fn word_count(&self) -> usize {
        self.words_per_row_group() * (self.padded_rows / self.compute_units)
    }

    /// Physical cells covered: tiles × compute_units × word_count × lanes
    pub fn footprint(&self) -> usize {
        self.tiles * self.compute_units * self.word_count() * self.lanes
    }

    pub fn coord(&self, row: usize, col: usize) -> PhysicalCoord {
        let tile_cols = self.tile_cols();
        PhysicalCoord {
            tile: col / tile_cols,
            unit: row % self.compute_units,
            slot: self.base
                + (col % tile_cols) / self.lanes
                + (row / self.compute_units) * self.words_per_row_group(),
            lane: col % self.lanes,
        }
    }
}

/// Placement geometry of one padded vector
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VectorLayout {
    /// Split across tiles of the primary vector bank
    Tiled {
        tiles: usize,
        lanes: usize,
        padded_len: usize,
        base: usize,
    },
    /// Consecutive words of a single-array bank
    Flat {
        lanes: usize,
        word_count: usize,
        base: usize,
    },
}

impl VectorLayout {
    /// Geometry of an allocated vector descriptor
    pub fn of(desc: &TensorDescriptor, arch: &ArchParams) -> Option<Self> {
        let (len, base) = match (desc.padded_shape(), desc.base_address()) {
            (TensorShape::Vector { len }, Some(base)) => (len, base),
            _ => return None,
        };
        if desc.bank().is_primary_vector() {
            Some(VectorLayout::Tiled {
                tiles: arch.tiles,
                lanes: arch.lanes,
                padded_len: len,
                base,
            })
        } else {
            Some(VectorLayout::Flat {
                lanes: arch.lanes,
                word_count: desc.word_count(),
                base,
            })
        }
    }

    /// Elements covered by the vector's words (including trailing zero lanes)
    pub fn footprint(&self) -> usize {
        match *self {
            VectorLayout::Tiled { padded_len, .. } => padded_len,
            VectorLayout::Flat {
                lanes, word_count, ..
            } => lanes * word_count,
        }
    }

    pub fn coord(&self, i: usize) -> VectorCoord {
        match *self {
            VectorLayout::Tiled {
                tiles,
                lanes,
                padded_len,
                base,
            } => {
                let tile_len = padded_len / tiles;
                VectorCoord {
                    tile: i / tile_len,
                    slot: base + (i % tile_len) / lanes,
                    lane: i % lanes,
                }
            }
            VectorLayout::Flat { lanes, base, .. } => VectorCoord {
                tile: 0,
                slot: base + i / lanes,
                lane: i % lanes,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn layout(base: usize) -> MatrixLayout {
        MatrixLayout {
            tiles: 2,
            compute_units: 4,
            lanes: 4,
            padded_rows: 8,
            padded_cols: 16,
            base,
        }
    }

    #[test]
    fn test_matrix_coord_examples() {
        let l = layout(3);
        assert_eq!(l.tile_cols(), 8);
        assert_eq!(l.words_per_row_group(), 2);
        assert_eq!(l.word_count(), 4);

        assert_eq!(
            l.coord(0, 0),
            PhysicalCoord { tile: 0, unit: 0, slot: 3, lane: 0 }
        );
        // Second tile, second word within the tile, row group 1
        assert_eq!(
            l.coord(5, 14),
            PhysicalCoord { tile: 1, unit: 1, slot: 3 + 1 + 2, lane: 2 }
        );
        assert_eq!(
            l.coord(7, 15),
            PhysicalCoord { tile: 1, unit: 3, slot: 3 + 3, lane: 3 }
        );
    }

    #[test]
    fn test_matrix_mapping_is_bijective() {
        let l = layout(5);
        let mut seen = HashSet::new();
        for row in 0..l.padded_rows {
            for col in 0..l.padded_cols {
                let c = l.coord(row, col);
                assert!(c.slot >= 5 && c.slot < 5 + l.word_count());
                assert!(seen.insert(c), "duplicate cell for ({}, {})", row, col);
            }
        }
        assert_eq!(seen.len(), l.footprint());
    }

    #[test]
    fn test_tiled_vector_coords() {
        let v = VectorLayout::Tiled {
            tiles: 2,
            lanes: 4,
            padded_len: 16,
            base: 1,
        };
        assert_eq!(v.coord(0), VectorCoord { tile: 0, slot: 1, lane: 0 });
        assert_eq!(v.coord(5), VectorCoord { tile: 0, slot: 2, lane: 1 });
        assert_eq!(v.coord(8), VectorCoord { tile: 1, slot: 1, lane: 0 });
        assert_eq!(v.coord(15), VectorCoord { tile: 1, slot: 2, lane: 3 });
    }

    #[test]
    fn test_flat_vector_coords() {
        let v = VectorLayout::Flat {
            lanes: 4,
            word_count: 3,
            base: 2,
        };
        assert_eq!(v.footprint(), 12);
        assert_eq!(v.coord(0), VectorCoord { tile: 0, slot: 2, lane: 0 });
        assert_eq!(v.coord(9), VectorCoord { tile: 0, slot: 4, lane: 1 });
    }
}

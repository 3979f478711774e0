//! Tensor placement into physical storage
//!
//! [`mapping`] holds the pure coordinate functions; [`place`] applies them to
//! a context's [`PhysicalStorage`](crate::storage::PhysicalStorage).

pub mod mapping;
pub mod place;

pub use mapping::{MatrixLayout, PhysicalCoord, VectorCoord, VectorLayout};
pub use place::{gather_matrix, gather_vector, place_matrix, place_vector};

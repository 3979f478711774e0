//! Tensor descriptors, payloads and padding rules

pub mod data;
pub mod descriptor;
pub mod padding;

pub use data::TensorData;
pub use descriptor::{AllocationState, TensorDescriptor, TensorShape};

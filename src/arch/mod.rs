//! Accelerator architecture parameters
//!
//! The compiler is parameterised by a handful of hardware dimensions that are
//! fixed for the whole compilation session. This module contains the
//! [`ArchParams`] type, a few presets, and JSON loading/saving so the values
//! can be supplied by whatever front end drives the compiler.

pub mod params;

pub use params::{ArchParams, ArchPreset, ARCH_FILE_ENV};

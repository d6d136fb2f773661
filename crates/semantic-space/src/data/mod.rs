// src/data/mod.rs
//! Data handling modules for the semantic space viewer.
//!
//! This module provides:
//! - The labeled-point dataset (built-in table or JSON file).
//! - The data structures for GPU buffers.

pub mod dataset;
pub mod types;

// Re-export commonly used types for convenience.
pub use self::dataset::{Dataset, DatasetError};
pub use self::types::{FrameUniform, LabeledPoint, LineVertex, MarkerInstance, MeshVertex, Rgb};

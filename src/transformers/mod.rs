//! # Transformer Implementations
//!
//! The submodules contain the DataFrame transformers used by the preparation pipeline.

pub mod categorical_encoding;
pub mod column_pruning;
pub mod scaling;

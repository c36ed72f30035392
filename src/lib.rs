//! # Dataset Preparer
//!
//! Turns a raw tabular classification dataset into scaled train/test artifacts:
//! load a CSV file, encode the categorical target, prune identifier columns, split rows with
//! class-ratio preservation, standardize features with statistics fitted on the training rows
//! only, and write the results to disk.
//!
//! The stages are DataFrame [`pipeline::Transformer`]s built on Apache DataFusion, orchestrated
//! by [`preparer::DatasetPreparer`].

pub mod exceptions;
pub mod loader;
pub mod logging;
pub mod persistence;
pub mod pipeline;
pub mod preparer;
pub mod schema;
pub mod settings;
pub mod split;
pub mod transformers;

pub use exceptions::{PreparerError, PreparerResult};
pub use preparer::{prepare_dataset, DatasetPreparer, PreparedDataset};
pub use settings::{OutputFormat, PreparerConfig};

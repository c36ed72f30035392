//! ## Custom Errors for Dataset Preparer
//!
//! This module defines the error type shared by every stage of the preparation pipeline.
//! It uses the `thiserror` crate to derive the `Error` trait.
//!
//! The variants fall into three groups:
//!
//! - **I/O boundary**: [`PreparerError::FileNotFound`] and [`PreparerError::MalformedInput`]
//!   are raised by the loader, plus wrapped I/O, DataFusion, Arrow and Parquet errors.
//! - **Data contract**: [`PreparerError::MissingColumn`], [`PreparerError::InvalidLabel`] and
//!   [`PreparerError::InvalidParameter`] report inputs the pipeline refuses to process.
//! - **Stage failures**: [`PreparerError::SplitError`] when a stratified split is infeasible and
//!   [`PreparerError::FitNotCalled`] when a stateful transformer is used before fitting.
//!
//! ### Example
//!
//! ```rust
//! use dataset_preparer::exceptions::{PreparerError, PreparerResult};
//!
//! fn split_rows() -> PreparerResult<()> {
//!     Err(PreparerError::SplitError("class '1' has a single member".into()))
//! }
//! ```

use thiserror::Error;

/// Errors raised while preparing a dataset.
#[derive(Debug, Error)]
pub enum PreparerError {
    /// Wraps underlying I/O errors.
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// Wraps errors from DataFusion.
    #[error("DataFusion error: {0}")]
    DataFusionError(#[from] datafusion::error::DataFusionError),

    /// Wraps errors from Arrow.
    #[error("Arrow error: {0}")]
    ArrowError(#[from] arrow::error::ArrowError),

    /// Wraps errors from Parquet.
    #[error("Parquet error: {0}")]
    ParquetError(#[from] parquet::errors::ParquetError),

    /// The input path does not exist.
    #[error("File not found: {0}")]
    FileNotFound(String),

    /// The input exists but could not be read as a delimited table with a header row.
    #[error("Malformed input: {0}")]
    MalformedInput(String),

    /// Indicates that the specified column does not exist in the DataFrame.
    #[error("Missing column: {0}")]
    MissingColumn(String),

    /// Indicates that an invalid parameter was provided (e.g., unsupported value or incorrect data type).
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    /// The target column holds a value that cannot be mapped to a class label.
    #[error("Invalid label: {0}")]
    InvalidLabel(String),

    /// A stratified split cannot be produced for the requested test size.
    #[error("Split error: {0}")]
    SplitError(String),

    /// Indicates the transform method was called before calling fit for a stateful transformer.
    #[error("Transform called before fit for stateful transformer")]
    FitNotCalled,
}

/// A convenient result type for Dataset Preparer operations.
pub type PreparerResult<T> = std::result::Result<T, PreparerError>;

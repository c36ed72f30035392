//! ## Preparer Settings
//!
//! [`PreparerConfig`] gathers every knob of a preparation run. The defaults reproduce the
//! breast cancer layout: `breast_cancer_dataset/data.csv` in, a 20% stratified test split
//! seeded with 42, and four CSV files under `preprocessing/breast_cancer_dataset_preprocessed`.

use crate::exceptions::{PreparerError, PreparerResult};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

pub const DEFAULT_INPUT_PATH: &str = "breast_cancer_dataset/data.csv";
pub const DEFAULT_OUTPUT_DIR: &str = "preprocessing/breast_cancer_dataset_preprocessed";
pub const DEFAULT_TEST_SIZE: f64 = 0.2;
pub const DEFAULT_RANDOM_STATE: u64 = 42;
pub const DEFAULT_TARGET_COLUMN: &str = "diagnosis";
pub const DEFAULT_DROP_COLUMNS: [&str; 2] = ["id", "Unnamed: 32"];

/// File format used for the written artifacts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    #[default]
    Csv,
    Parquet,
}

impl OutputFormat {
    /// File extension, without the leading dot.
    pub fn extension(&self) -> &'static str {
        match self {
            OutputFormat::Csv => "csv",
            OutputFormat::Parquet => "parquet",
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

impl FromStr for OutputFormat {
    type Err = PreparerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "csv" => Ok(OutputFormat::Csv),
            "parquet" => Ok(OutputFormat::Parquet),
            other => Err(PreparerError::InvalidParameter(format!(
                "Unsupported output format '{}' (expected 'csv' or 'parquet')",
                other
            ))),
        }
    }
}

/// Configuration of a single preparation run.
#[derive(Debug, Clone, PartialEq)]
pub struct PreparerConfig {
    pub input_path: PathBuf,
    pub output_dir: PathBuf,
    /// Fraction of rows reserved for the test subset, strictly between 0 and 1.
    pub test_size: f64,
    /// Seed controlling the split.
    pub random_state: u64,
    pub target_column: String,
    /// Columns removed before splitting; absent names are ignored.
    pub drop_columns: Vec<String>,
    pub output_format: OutputFormat,
    /// Also write the fitted scaling statistics next to the datasets.
    pub save_scaling_model: bool,
}

impl Default for PreparerConfig {
    fn default() -> Self {
        Self {
            input_path: PathBuf::from(DEFAULT_INPUT_PATH),
            output_dir: PathBuf::from(DEFAULT_OUTPUT_DIR),
            test_size: DEFAULT_TEST_SIZE,
            random_state: DEFAULT_RANDOM_STATE,
            target_column: DEFAULT_TARGET_COLUMN.to_string(),
            drop_columns: DEFAULT_DROP_COLUMNS.iter().map(|c| c.to_string()).collect(),
            output_format: OutputFormat::default(),
            save_scaling_model: false,
        }
    }
}

impl PreparerConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_input_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.input_path = path.into();
        self
    }

    pub fn with_output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.output_dir = dir.into();
        self
    }

    pub fn with_test_size(mut self, test_size: f64) -> Self {
        self.test_size = test_size;
        self
    }

    pub fn with_random_state(mut self, random_state: u64) -> Self {
        self.random_state = random_state;
        self
    }

    pub fn with_target_column(mut self, target: impl Into<String>) -> Self {
        self.target_column = target.into();
        self
    }

    pub fn with_drop_columns(mut self, columns: Vec<String>) -> Self {
        self.drop_columns = columns;
        self
    }

    pub fn with_output_format(mut self, format: OutputFormat) -> Self {
        self.output_format = format;
        self
    }

    pub fn with_save_scaling_model(mut self, save: bool) -> Self {
        self.save_scaling_model = save;
        self
    }

    /// Checks the parameters that do not depend on the data.
    pub fn validate(&self) -> PreparerResult<()> {
        if !(self.test_size > 0.0 && self.test_size < 1.0) {
            return Err(PreparerError::InvalidParameter(format!(
                "test_size must lie strictly between 0 and 1, got {}",
                self.test_size
            )));
        }
        if self.target_column.trim().is_empty() {
            return Err(PreparerError::InvalidParameter(
                "target_column must not be empty".to_string(),
            ));
        }
        if self.drop_columns.contains(&self.target_column) {
            return Err(PreparerError::InvalidParameter(format!(
                "target column '{}' is also listed for dropping",
                self.target_column
            )));
        }
        Ok(())
    }
}

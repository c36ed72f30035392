//! Prepares the breast cancer dataset for training.
//!
//! ```sh
//! prepare-dataset --input breast_cancer_dataset/data.csv --test-size 0.2 --random-state 42
//! ```
//!
//! Any failure is logged and returned from `main`, so the process exits with a non-zero status.

use clap::Parser;
use dataset_preparer::logging;
use dataset_preparer::settings::{
    OutputFormat, PreparerConfig, DEFAULT_DROP_COLUMNS, DEFAULT_INPUT_PATH, DEFAULT_OUTPUT_DIR,
    DEFAULT_RANDOM_STATE, DEFAULT_TARGET_COLUMN, DEFAULT_TEST_SIZE,
};
use dataset_preparer::DatasetPreparer;
use std::error::Error;
use std::path::PathBuf;
use tracing::{error, info, Level};

#[derive(Parser, Debug)]
#[command(author, version, about = "Encode, split and standardize a tabular classification dataset")]
struct Args {
    /// Input CSV file with a header row
    #[arg(long, default_value = DEFAULT_INPUT_PATH)]
    input: PathBuf,

    /// Directory receiving the prepared files
    #[arg(long, default_value = DEFAULT_OUTPUT_DIR)]
    output_dir: PathBuf,

    /// Fraction of rows reserved for the test subset
    #[arg(long, default_value_t = DEFAULT_TEST_SIZE)]
    test_size: f64,

    /// Seed controlling the split
    #[arg(long, default_value_t = DEFAULT_RANDOM_STATE)]
    random_state: u64,

    /// Name of the label column
    #[arg(long, default_value = DEFAULT_TARGET_COLUMN)]
    target: String,

    /// Columns to drop before splitting (repeatable)
    #[arg(long = "drop", value_name = "COLUMN")]
    drop_columns: Vec<String>,

    /// Output format: csv or parquet
    #[arg(long, default_value = "csv")]
    format: OutputFormat,

    /// Also write the fitted scaling statistics
    #[arg(long)]
    save_scaler: bool,

    /// Log debug details
    #[arg(short, long, conflicts_with = "quiet")]
    verbose: bool,

    /// Only log warnings and errors
    #[arg(short, long)]
    quiet: bool,
}

impl Args {
    fn into_config(self) -> PreparerConfig {
        let drop_columns = if self.drop_columns.is_empty() {
            DEFAULT_DROP_COLUMNS.iter().map(|c| c.to_string()).collect()
        } else {
            self.drop_columns
        };
        PreparerConfig::new()
            .with_input_path(self.input)
            .with_output_dir(self.output_dir)
            .with_test_size(self.test_size)
            .with_random_state(self.random_state)
            .with_target_column(self.target)
            .with_drop_columns(drop_columns)
            .with_output_format(self.format)
            .with_save_scaling_model(self.save_scaler)
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    let args = Args::parse();
    let level = if args.verbose || logging::debug_requested() {
        Level::DEBUG
    } else if args.quiet {
        Level::WARN
    } else {
        Level::INFO
    };
    logging::init(level);

    info!("Starting dataset preparation");
    let preparer = DatasetPreparer::new(args.into_config());
    match preparer.run().await {
        Ok(prepared) => {
            info!(
                "Done: {} train rows, {} test rows, {} files written",
                prepared.x_train.num_rows(),
                prepared.x_test.num_rows(),
                prepared.written.len()
            );
            Ok(())
        }
        Err(e) => {
            error!("Preparation failed: {}", e);
            Err(e.into())
        }
    }
}

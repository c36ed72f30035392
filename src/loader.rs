//! ## CSV Loader
//!
//! Reads a comma-delimited table with a header row into an in-memory DataFrame.
//!
//! The file is parsed exactly once: the rows are collected into Arrow batches and re-registered
//! with the session, so later stages never touch the file again. Failures are reported with an
//! `error!` diagnostic and then returned to the caller:
//!
//! - [`PreparerError::FileNotFound`] when the path does not exist,
//! - [`PreparerError::MalformedInput`] for any other read or parse failure.

use crate::exceptions::{PreparerError, PreparerResult};
use datafusion::prelude::{CsvReadOptions, DataFrame, SessionContext};
use std::path::Path;
use tracing::{debug, error, info};

/// Loads the CSV file at `path` into a DataFrame backed by memory.
pub async fn load_csv(ctx: &SessionContext, path: impl AsRef<Path>) -> PreparerResult<DataFrame> {
    let path = path.as_ref();
    let path_str = path.display().to_string();
    info!("Reading '{}'", path_str);

    if !path.is_file() {
        error!("File '{}' not found. Check the path and file name.", path_str);
        return Err(PreparerError::FileNotFound(path_str));
    }

    read_into_memory(ctx, path).await.map_err(|e| {
        error!("Failed to read '{}': {}", path_str, e);
        e
    })
}

async fn read_into_memory(ctx: &SessionContext, path: &Path) -> PreparerResult<DataFrame> {
    let path_str = path.display().to_string();
    // A single-file listing table only picks up files whose extension matches the options.
    let extension = path
        .extension()
        .map(|ext| format!(".{}", ext.to_string_lossy()))
        .unwrap_or_default();
    let options = CsvReadOptions::new()
        .has_header(true)
        .delimiter(b',')
        .file_extension(&extension);

    let lazy = ctx
        .read_csv(path.to_string_lossy().to_string(), options)
        .await
        .map_err(|e| malformed(&path_str, e))?;
    let batches = lazy.collect().await.map_err(|e| malformed(&path_str, e))?;

    let rows: usize = batches.iter().map(|batch| batch.num_rows()).sum();
    if rows == 0 {
        return Err(PreparerError::MalformedInput(format!(
            "'{}' contains no data rows",
            path_str
        )));
    }
    let columns = batches[0].num_columns();
    info!("File '{}' read: {} rows, {} columns", path_str, rows, columns);
    debug!("Inferred schema: {:?}", batches[0].schema());

    Ok(ctx.read_batches(batches)?)
}

fn malformed(path: &str, e: impl std::fmt::Display) -> PreparerError {
    PreparerError::MalformedInput(format!("could not parse '{}': {}", path, e))
}

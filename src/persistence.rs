//! ## Artifact Persistence
//!
//! Writes the prepared subsets to an output directory under fixed names:
//! `X_train_scaled`, `X_test_scaled`, `y_train` and `y_test`, each with the extension of the
//! chosen [`OutputFormat`].
//!
//! The directory is created if needed and existing files are replaced. Every file is first
//! written to a `.tmp` sibling; the temporaries are renamed into place only after all of them
//! were written, so a failed write never leaves a partial set of fresh artifacts behind.
//!
//! The final renames are not one atomic step. If a rename fails after earlier ones succeeded,
//! the already renamed files hold the new contents, the others keep whatever was there
//! before, and the remaining temporaries are removed. The error is returned either way.
//!
//! CSV feature files carry a header row; CSV label files hold a single headerless column of
//! integers. Rows are written in the order they were produced.

use crate::exceptions::PreparerResult;
use crate::settings::OutputFormat;
use arrow::csv::WriterBuilder;
use arrow::record_batch::RecordBatch;
use parquet::arrow::ArrowWriter;
use std::fs::{self, File};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

pub const X_TRAIN_FILE: &str = "X_train_scaled";
pub const X_TEST_FILE: &str = "X_test_scaled";
pub const Y_TRAIN_FILE: &str = "y_train";
pub const Y_TEST_FILE: &str = "y_test";
pub const SCALER_FILE: &str = "scaler_params";

/// One table to be written.
#[derive(Debug, Clone, Copy)]
pub struct Artifact<'a> {
    pub name: &'a str,
    pub batch: &'a RecordBatch,
    /// Whether CSV output starts with a header row.
    pub header: bool,
}

impl<'a> Artifact<'a> {
    pub fn features(name: &'a str, batch: &'a RecordBatch) -> Self {
        Self {
            name,
            batch,
            header: true,
        }
    }

    pub fn labels(name: &'a str, batch: &'a RecordBatch) -> Self {
        Self {
            name,
            batch,
            header: false,
        }
    }
}

/// Path of the artifact `name` inside `dir`.
pub fn artifact_path(dir: &Path, name: &str, format: OutputFormat) -> PathBuf {
    dir.join(format!("{}.{}", name, format.extension()))
}

fn write_batch(path: &Path, artifact: &Artifact<'_>, format: OutputFormat) -> PreparerResult<()> {
    let file = File::create(path)?;
    match format {
        OutputFormat::Csv => {
            let mut writer = WriterBuilder::new()
                .with_header(artifact.header)
                .build(file);
            writer.write(artifact.batch)?;
        }
        OutputFormat::Parquet => {
            let mut writer = ArrowWriter::try_new(file, artifact.batch.schema(), None)?;
            writer.write(artifact.batch)?;
            writer.close()?;
        }
    }
    Ok(())
}

/// Writes all `artifacts` into `dir`, replacing existing files. Returns the final paths.
pub fn write_artifacts(
    dir: &Path,
    format: OutputFormat,
    artifacts: &[Artifact<'_>],
) -> PreparerResult<Vec<PathBuf>> {
    fs::create_dir_all(dir)?;

    let mut staged: Vec<(PathBuf, PathBuf)> = Vec::with_capacity(artifacts.len());
    for artifact in artifacts {
        let target = artifact_path(dir, artifact.name, format);
        let tmp = target.with_extension(format!("{}.tmp", format.extension()));
        if let Err(e) = write_batch(&tmp, artifact, format) {
            // The failed file may exist half-written.
            staged.push((tmp, target));
            discard(&staged);
            return Err(e);
        }
        debug!(
            "Staged '{}' ({} rows)",
            tmp.display(),
            artifact.batch.num_rows()
        );
        staged.push((tmp, target));
    }

    let mut written = Vec::with_capacity(staged.len());
    for (i, (tmp, target)) in staged.iter().enumerate() {
        if let Err(e) = fs::rename(tmp, target) {
            discard(&staged[i..]);
            return Err(e.into());
        }
        written.push(target.clone());
    }
    info!(
        "Wrote {} file(s) to '{}'",
        written.len(),
        dir.display()
    );
    Ok(written)
}

fn discard(staged: &[(PathBuf, PathBuf)]) {
    for (tmp, _) in staged {
        if tmp.is_file() {
            if let Err(e) = fs::remove_file(tmp) {
                warn!("Could not remove '{}': {}", tmp.display(), e);
            }
        }
    }
}

//! ## Stratified Train/Test Split
//!
//! Partitions rows into a training and a test subset while keeping each class's share of
//! rows as close to the full dataset as integer counts allow.
//!
//! For `n` rows and test fraction `t`, the test subset has `ceil(t * n)` rows and the training
//! subset the rest. Per-class counts are apportioned by largest remainder, training first and
//! then test from the members each class has left. Every random choice (remainder ties,
//! member order, final row order) comes from a `StdRng` seeded with `random_state`, so a split
//! is fully reproducible.

use crate::exceptions::{PreparerError, PreparerResult};
use crate::pipeline::materialize;
use arrow::array::{Array, ArrayRef, Int64Array, UInt32Array};
use arrow::compute::{cast, take_record_batch};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use datafusion::prelude::DataFrame;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, info};

/// Row positions of the two subsets, in output order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SplitIndices {
    pub train: Vec<usize>,
    pub test: Vec<usize>,
}

/// Features and labels of both subsets. Row `i` of a feature batch belongs to row `i` of the
/// matching label batch.
#[derive(Debug, Clone)]
pub struct TrainTestSplit {
    pub x_train: RecordBatch,
    pub x_test: RecordBatch,
    pub y_train: RecordBatch,
    pub y_test: RecordBatch,
}

/// Splits `n_draws` items across classes in proportion to `class_counts`.
///
/// Each class first gets the floor of its exact share; the leftover items go to the classes
/// with the largest fractional remainders. Equal remainders are resolved with `rng`.
pub fn approximate_mode(class_counts: &[usize], n_draws: usize, rng: &mut StdRng) -> Vec<usize> {
    let total: usize = class_counts.iter().sum();
    if total == 0 {
        return vec![0; class_counts.len()];
    }
    let continuous: Vec<f64> = class_counts
        .iter()
        .map(|&count| count as f64 / total as f64 * n_draws as f64)
        .collect();
    let mut floored: Vec<usize> = continuous.iter().map(|c| c.floor() as usize).collect();
    let mut need_to_add = n_draws.saturating_sub(floored.iter().sum());

    if need_to_add > 0 {
        let remainders: Vec<f64> = continuous
            .iter()
            .zip(&floored)
            .map(|(c, &f)| c - f as f64)
            .collect();
        let mut levels = remainders.clone();
        levels.sort_by(|a, b| b.total_cmp(a));
        levels.dedup();
        for level in levels {
            let mut tied: Vec<usize> = (0..remainders.len())
                .filter(|&i| remainders[i] == level)
                .collect();
            tied.shuffle(rng);
            let add_now = tied.len().min(need_to_add);
            for &i in &tied[..add_now] {
                floored[i] += 1;
            }
            need_to_add -= add_now;
            if need_to_add == 0 {
                break;
            }
        }
    }
    floored
}

/// Seeded stratified splitter.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StratifiedSplit {
    pub test_size: f64,
    pub random_state: u64,
}

impl StratifiedSplit {
    pub fn new(test_size: f64, random_state: u64) -> Self {
        Self {
            test_size,
            random_state,
        }
    }

    /// Test and train row counts for `n_samples` rows.
    pub fn subset_sizes(&self, n_samples: usize) -> PreparerResult<(usize, usize)> {
        if !(self.test_size > 0.0 && self.test_size < 1.0) {
            return Err(PreparerError::InvalidParameter(format!(
                "test_size must lie strictly between 0 and 1, got {}",
                self.test_size
            )));
        }
        let n_test = (self.test_size * n_samples as f64).ceil() as usize;
        let n_train = n_samples.saturating_sub(n_test);
        if n_train == 0 || n_test == 0 {
            return Err(PreparerError::SplitError(format!(
                "test_size {} on {} rows leaves an empty subset",
                self.test_size, n_samples
            )));
        }
        Ok((n_train, n_test))
    }

    /// Computes train and test row positions for `labels`.
    pub fn split_indices(&self, labels: &[i64]) -> PreparerResult<SplitIndices> {
        if labels.is_empty() {
            return Err(PreparerError::SplitError("no rows to split".to_string()));
        }
        let (n_train, n_test) = self.subset_sizes(labels.len())?;

        let mut members: BTreeMap<i64, Vec<usize>> = BTreeMap::new();
        for (row, &label) in labels.iter().enumerate() {
            members.entry(label).or_default().push(row);
        }
        if let Some((label, rows)) = members.iter().find(|(_, rows)| rows.len() < 2) {
            return Err(PreparerError::SplitError(format!(
                "class {} has {} member(s); stratification needs at least 2 per class",
                label,
                rows.len()
            )));
        }
        let n_classes = members.len();
        if n_train < n_classes || n_test < n_classes {
            return Err(PreparerError::SplitError(format!(
                "train size {} and test size {} must each be at least the number of classes ({})",
                n_train, n_test, n_classes
            )));
        }

        let mut rng = StdRng::seed_from_u64(self.random_state);
        let class_counts: Vec<usize> = members.values().map(|rows| rows.len()).collect();
        let train_counts = approximate_mode(&class_counts, n_train, &mut rng);
        let remaining: Vec<usize> = class_counts
            .iter()
            .zip(&train_counts)
            .map(|(total, train)| total - train)
            .collect();
        let test_counts = approximate_mode(&remaining, n_test, &mut rng);

        let mut train = Vec::with_capacity(n_train);
        let mut test = Vec::with_capacity(n_test);
        for (k, rows) in members.values().enumerate() {
            let mut shuffled = rows.clone();
            shuffled.shuffle(&mut rng);
            let (n_i, t_i) = (train_counts[k], test_counts[k]);
            train.extend_from_slice(&shuffled[..n_i]);
            test.extend_from_slice(&shuffled[n_i..n_i + t_i]);
        }
        train.shuffle(&mut rng);
        test.shuffle(&mut rng);

        debug!(
            "Class counts {:?}: train {:?}, test {:?}",
            class_counts, train_counts, test_counts
        );
        Ok(SplitIndices { train, test })
    }

    /// Materializes `df` and splits it into features and the `target` label column.
    pub async fn split(&self, df: DataFrame, target: &str) -> PreparerResult<TrainTestSplit> {
        let batch = materialize(df).await?;
        let target_idx = batch.schema().index_of(target).map_err(|_| {
            PreparerError::MissingColumn(format!("Target column '{}' not found", target))
        })?;
        let labels = label_values(batch.column(target_idx), target)?;
        let indices = self.split_indices(&labels)?;

        let feature_idx: Vec<usize> = (0..batch.num_columns())
            .filter(|&i| i != target_idx)
            .collect();
        let features = batch.project(&feature_idx)?;
        let label_schema = Arc::new(Schema::new(vec![Field::new(
            target,
            DataType::Int64,
            false,
        )]));
        let label_array: ArrayRef = Arc::new(Int64Array::from(labels));
        let label_batch = RecordBatch::try_new(label_schema, vec![label_array])?;

        let train_idx = to_take_indices(&indices.train)?;
        let test_idx = to_take_indices(&indices.test)?;
        let split = TrainTestSplit {
            x_train: take_record_batch(&features, &train_idx)?,
            x_test: take_record_batch(&features, &test_idx)?,
            y_train: take_record_batch(&label_batch, &train_idx)?,
            y_test: take_record_batch(&label_batch, &test_idx)?,
        };
        info!(
            "Split {} rows into {} train and {} test rows",
            batch.num_rows(),
            split.x_train.num_rows(),
            split.x_test.num_rows()
        );
        Ok(split)
    }
}

/// Reads the label column as non-null Int64 values.
fn label_values(column: &ArrayRef, target: &str) -> PreparerResult<Vec<i64>> {
    let as_int = cast(column, &DataType::Int64)?;
    let array = as_int
        .as_any()
        .downcast_ref::<Int64Array>()
        .ok_or_else(|| {
            PreparerError::InvalidLabel(format!("column '{}' is not integer-valued", target))
        })?;
    if array.null_count() > 0 {
        return Err(PreparerError::InvalidLabel(format!(
            "column '{}' has {} missing label(s)",
            target,
            array.null_count()
        )));
    }
    Ok(array.values().to_vec())
}

fn to_take_indices(rows: &[usize]) -> PreparerResult<UInt32Array> {
    let values = rows
        .iter()
        .map(|&row| {
            u32::try_from(row).map_err(|_| {
                PreparerError::SplitError(format!("row index {} exceeds u32 range", row))
            })
        })
        .collect::<PreparerResult<Vec<u32>>>()?;
    Ok(UInt32Array::from(values))
}

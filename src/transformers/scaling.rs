//! # Standard Scaling
//!
//! [`StandardScaler`] learns a per-column mean and population standard deviation on one
//! DataFrame and rescales any DataFrame with those statistics: `(x - mean) / scale`.
//!
//! Fitting only ever looks at the DataFrame passed to `fit`; applying the scaler to other data
//! never updates the [`ScalingModel`].
//!
//! A column whose standard deviation is zero, negligible relative to its mean, or not finite
//! gets a scale of 1.0, so a constant training column maps to 0.0 instead of NaN.

use crate::exceptions::{PreparerError, PreparerResult};
use crate::impl_transformer;
use arrow::array::{ArrayRef, Float64Array, StringArray};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use datafusion::dataframe::DataFrame;
use datafusion::functions_aggregate::expr_fn::{avg, count, stddev_pop};
use datafusion::scalar::ScalarValue;
use datafusion_expr::{cast, ident, lit, Expr};
use std::sync::Arc;
use tracing::debug;

/// Fitted statistics of one feature column.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureStats {
    pub name: String,
    pub mean: f64,
    pub std_dev: f64,
}

impl FeatureStats {
    /// Divisor applied during transformation.
    pub fn scale(&self) -> f64 {
        let negligible = 10.0 * f64::EPSILON * self.mean.abs();
        if !self.std_dev.is_finite() || self.std_dev == 0.0 || self.std_dev < negligible {
            1.0
        } else {
            self.std_dev
        }
    }
}

/// Per-feature (mean, standard deviation) pairs learned from training rows.
#[derive(Debug, Clone, PartialEq)]
pub struct ScalingModel {
    pub features: Vec<FeatureStats>,
    /// Number of rows the statistics were computed from.
    pub n_samples: usize,
}

impl ScalingModel {
    pub fn get(&self, name: &str) -> Option<&FeatureStats> {
        self.features.iter().find(|stats| stats.name == name)
    }

    /// Tabular form with columns `feature`, `mean` and `scale`, one row per feature.
    pub fn to_record_batch(&self) -> PreparerResult<RecordBatch> {
        let schema = Arc::new(Schema::new(vec![
            Field::new("feature", DataType::Utf8, false),
            Field::new("mean", DataType::Float64, false),
            Field::new("scale", DataType::Float64, false),
        ]));
        let names: ArrayRef = Arc::new(StringArray::from_iter_values(
            self.features.iter().map(|s| s.name.as_str()),
        ));
        let means: ArrayRef = Arc::new(Float64Array::from_iter_values(
            self.features.iter().map(|s| s.mean),
        ));
        let scales: ArrayRef = Arc::new(Float64Array::from_iter_values(
            self.features.iter().map(|s| s.scale()),
        ));
        Ok(RecordBatch::try_new(schema, vec![names, means, scales])?)
    }
}

fn scalar_to_f64(scalar: ScalarValue, what: &str, col_name: &str) -> PreparerResult<f64> {
    match scalar {
        ScalarValue::Float64(Some(val)) => Ok(val),
        other => Err(PreparerError::InvalidParameter(format!(
            "Failed to compute {} for column '{}' (got {:?})",
            what, col_name, other
        ))),
    }
}

/// Standardizes numeric columns to zero mean and unit variance.
pub struct StandardScaler {
    pub columns: Vec<String>,
    model: Option<ScalingModel>,
}

impl StandardScaler {
    pub fn new(columns: Vec<String>) -> Self {
        Self {
            columns,
            model: None,
        }
    }

    /// The fitted statistics, if `fit` has run.
    pub fn model(&self) -> Option<&ScalingModel> {
        self.model.as_ref()
    }

    /// Consumes the scaler, returning its fitted statistics.
    pub fn into_model(self) -> Option<ScalingModel> {
        self.model
    }

    fn validate(&self, df: &DataFrame) -> PreparerResult<()> {
        for col_name in &self.columns {
            let field = df
                .schema()
                .field_with_unqualified_name(col_name)
                .map_err(|_| {
                    PreparerError::MissingColumn(format!("Column '{}' not found", col_name))
                })?;
            if !field.data_type().is_numeric() {
                return Err(PreparerError::InvalidParameter(format!(
                    "StandardScaler requires column '{}' to be numeric, found {}",
                    col_name,
                    field.data_type()
                )));
            }
        }
        Ok(())
    }

    /// Computes mean and population standard deviation of every target column in one pass.
    pub async fn fit(&mut self, df: &DataFrame) -> PreparerResult<()> {
        self.validate(df)?;
        if self.columns.is_empty() {
            return Err(PreparerError::InvalidParameter(
                "StandardScaler needs at least one column".to_string(),
            ));
        }
        let mut aggs = vec![count(lit(1)).alias("n_samples")];
        for (i, col_name) in self.columns.iter().enumerate() {
            let value = cast(ident(col_name), DataType::Float64);
            aggs.push(avg(value.clone()).alias(format!("mean_{}", i)));
            aggs.push(stddev_pop(value).alias(format!("std_{}", i)));
        }
        let batches = df.clone().aggregate(vec![], aggs)?.collect().await?;
        let batch = batches
            .first()
            .filter(|batch| batch.num_rows() > 0)
            .ok_or_else(|| {
                PreparerError::InvalidParameter("Cannot fit scaler: no rows".to_string())
            })?;

        let n_samples = match ScalarValue::try_from_array(batch.column(0), 0)? {
            ScalarValue::Int64(Some(n)) => n as usize,
            _ => 0,
        };
        if n_samples == 0 {
            return Err(PreparerError::InvalidParameter(
                "Cannot fit scaler on an empty DataFrame".to_string(),
            ));
        }

        let mut features = Vec::with_capacity(self.columns.len());
        for (i, col_name) in self.columns.iter().enumerate() {
            let mean = ScalarValue::try_from_array(batch.column(1 + 2 * i), 0)?;
            let std_dev = ScalarValue::try_from_array(batch.column(2 + 2 * i), 0)?;
            features.push(FeatureStats {
                name: col_name.clone(),
                mean: scalar_to_f64(mean, "mean", col_name)?,
                std_dev: scalar_to_f64(std_dev, "standard deviation", col_name)?,
            });
        }
        debug!(
            "Fitted scaling statistics for {} columns on {} rows",
            features.len(),
            n_samples
        );
        self.model = Some(ScalingModel {
            features,
            n_samples,
        });
        Ok(())
    }

    /// Rescales the target columns; other columns pass through. Output columns are Float64.
    pub fn transform(&self, df: DataFrame) -> PreparerResult<DataFrame> {
        let model = self.model.as_ref().ok_or(PreparerError::FitNotCalled)?;
        self.validate(&df)?;
        let exprs: Vec<Expr> = df
            .schema()
            .fields()
            .iter()
            .map(|field| {
                let name = field.name();
                match model.get(name) {
                    Some(stats) => ((cast(ident(name), DataType::Float64) - lit(stats.mean))
                        / lit(stats.scale()))
                    .alias(name),
                    None => ident(name),
                }
            })
            .collect();
        df.select(exprs).map_err(PreparerError::from)
    }

    fn inherent_is_stateful(&self) -> bool {
        true
    }
}

impl_transformer!(StandardScaler);

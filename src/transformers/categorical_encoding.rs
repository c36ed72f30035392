//! # Label Encoding
//!
//! [`LabelEncoder`] turns the categorical target column into integer class labels.
//!
//! - Text columns are mapped through a fixed category table (by default `"M"` → 1 and
//!   `"B"` → 0). `fit` scans the distinct values first and fails with
//!   [`PreparerError::InvalidLabel`] if any value (or a null) has no mapping.
//! - Numeric columns are already encoded; they are only cast to Int64, so encoding an
//!   encoded table changes nothing. Their values must be codes of the table (0 or 1 by
//!   default).
//!
//! The encoder is stateful: `transform` returns [`PreparerError::FitNotCalled`] until `fit`
//! has checked the column.

use crate::exceptions::{PreparerError, PreparerResult};
use crate::impl_transformer;
use crate::schema::is_text_type;
use arrow::array::{Array, Float64Array, StringArray};
use arrow::datatypes::DataType;
use datafusion::logical_expr::{cast, ident, lit, Case as DFCase, Expr};
use datafusion::prelude::*;
use datafusion::scalar::ScalarValue;
use std::collections::BTreeSet;
use tracing::debug;

/// Category table used for the breast cancer diagnosis column.
pub fn diagnosis_mapping() -> Vec<(String, i64)> {
    vec![("M".to_string(), 1), ("B".to_string(), 0)]
}

/// Builds `CASE WHEN col = cat THEN code ... ELSE NULL END` for the given table.
fn build_case_expr(col_name: &str, mapping: &[(String, i64)]) -> Expr {
    let when_then_expr = mapping
        .iter()
        .map(|(cat, code)| {
            (
                Box::new(ident(col_name).eq(lit(cat.clone()))),
                Box::new(lit(*code)),
            )
        })
        .collect();
    Expr::Case(DFCase {
        expr: None,
        when_then_expr,
        else_expr: Some(Box::new(lit(ScalarValue::Int64(None)))),
    })
}

/// Distinct values of a text column; `None` stands for null.
async fn extract_distinct_values(
    df: &DataFrame,
    col_name: &str,
) -> PreparerResult<BTreeSet<Option<String>>> {
    let distinct_df = df
        .clone()
        .select(vec![cast(ident(col_name), DataType::Utf8).alias(col_name)])?
        .distinct()?;
    let batches = distinct_df.collect().await?;
    let mut values = BTreeSet::new();
    for batch in batches {
        let array = batch
            .column(0)
            .as_any()
            .downcast_ref::<StringArray>()
            .ok_or_else(|| {
                PreparerError::InvalidParameter(format!(
                    "Expected Utf8 array for column {}",
                    col_name
                ))
            })?;
        for i in 0..array.len() {
            if array.is_null(i) {
                values.insert(None);
            } else {
                values.insert(Some(array.value(i).to_string()));
            }
        }
    }
    Ok(values)
}

/// Distinct values of a numeric column as Float64; `None` stands for null.
async fn extract_distinct_numbers(
    df: &DataFrame,
    col_name: &str,
) -> PreparerResult<Vec<Option<f64>>> {
    let distinct_df = df
        .clone()
        .select(vec![cast(ident(col_name), DataType::Float64).alias(col_name)])?
        .distinct()?;
    let batches = distinct_df.collect().await?;
    let mut values = Vec::new();
    for batch in batches {
        let array = batch
            .column(0)
            .as_any()
            .downcast_ref::<Float64Array>()
            .ok_or_else(|| {
                PreparerError::InvalidParameter(format!(
                    "Expected Float64 array for column {}",
                    col_name
                ))
            })?;
        for i in 0..array.len() {
            if array.is_null(i) {
                values.push(None);
            } else {
                values.push(Some(array.value(i)));
            }
        }
    }
    Ok(values)
}

/// Maps a categorical target column to Int64 class labels.
pub struct LabelEncoder {
    pub column: String,
    pub mapping: Vec<(String, i64)>,
    /// Column type checked by `fit`.
    fitted_type: Option<DataType>,
}

impl LabelEncoder {
    /// Encoder for `column` using the diagnosis table (`M` → 1, `B` → 0).
    pub fn new(column: impl Into<String>) -> Self {
        Self::with_mapping(column, diagnosis_mapping())
    }

    pub fn with_mapping(column: impl Into<String>, mapping: Vec<(String, i64)>) -> Self {
        Self {
            column: column.into(),
            mapping,
            fitted_type: None,
        }
    }

    fn column_type(&self, df: &DataFrame) -> PreparerResult<DataType> {
        let field = df
            .schema()
            .field_with_unqualified_name(&self.column)
            .map_err(|_| {
                PreparerError::MissingColumn(format!("Column '{}' not found", self.column))
            })?;
        Ok(field.data_type().clone())
    }

    fn is_code(&self, value: f64) -> bool {
        value.fract() == 0.0 && self.mapping.iter().any(|(_, code)| *code as f64 == value)
    }

    fn invalid_label(&self, unknown: Vec<String>) -> PreparerError {
        PreparerError::InvalidLabel(format!(
            "column '{}' contains values without a class mapping: {}",
            self.column,
            unknown.join(", ")
        ))
    }

    /// Checks that every value of the target column has a mapping (text) or is one of the
    /// mapping's codes (numeric).
    pub async fn fit(&mut self, df: &DataFrame) -> PreparerResult<()> {
        self.fitted_type = None;
        let data_type = self.column_type(df)?;
        if is_text_type(&data_type) {
            let values = extract_distinct_values(df, &self.column).await?;
            let unknown: Vec<String> = values
                .iter()
                .filter(|value| match value {
                    Some(v) => !self.mapping.iter().any(|(cat, _)| cat == v),
                    None => true,
                })
                .map(|value| match value {
                    Some(v) => format!("'{}'", v),
                    None => "null".to_string(),
                })
                .collect();
            if !unknown.is_empty() {
                return Err(self.invalid_label(unknown));
            }
            debug!("Column '{}' categories: {:?}", self.column, values);
        } else if data_type.is_numeric() {
            let values = extract_distinct_numbers(df, &self.column).await?;
            let unknown: Vec<String> = values
                .iter()
                .filter(|value| !value.is_some_and(|v| self.is_code(v)))
                .map(|value| match value {
                    Some(v) => format!("{}", v),
                    None => "null".to_string(),
                })
                .collect();
            if !unknown.is_empty() {
                return Err(self.invalid_label(unknown));
            }
            debug!(
                "Column '{}' is already numeric ({}), leaving values unchanged",
                self.column, data_type
            );
        } else {
            return Err(PreparerError::InvalidParameter(format!(
                "LabelEncoder cannot encode column '{}' of type {}",
                self.column, data_type
            )));
        }
        self.fitted_type = Some(data_type);
        Ok(())
    }

    /// Replaces the target column with its Int64 encoding, keeping column order.
    pub fn transform(&self, df: DataFrame) -> PreparerResult<DataFrame> {
        let fitted_type = self.fitted_type.as_ref().ok_or(PreparerError::FitNotCalled)?;
        let data_type = self.column_type(&df)?;
        if &data_type != fitted_type {
            return Err(PreparerError::InvalidParameter(format!(
                "Column '{}' was fitted as {} but is {}",
                self.column, fitted_type, data_type
            )));
        }
        let encoded = if is_text_type(&data_type) {
            build_case_expr(&self.column, &self.mapping)
        } else if data_type.is_numeric() {
            cast(ident(&self.column), DataType::Int64)
        } else {
            return Err(PreparerError::InvalidParameter(format!(
                "LabelEncoder cannot encode column '{}' of type {}",
                self.column, data_type
            )));
        };
        let exprs: Vec<Expr> = df
            .schema()
            .fields()
            .iter()
            .map(|field| {
                let name = field.name();
                if name == &self.column {
                    encoded.clone().alias(name)
                } else {
                    ident(name)
                }
            })
            .collect();
        df.select(exprs).map_err(PreparerError::from)
    }

    fn inherent_is_stateful(&self) -> bool {
        true
    }
}

impl_transformer!(LabelEncoder);

//! ## Schema Validation
//!
//! Checks a loaded table once, before any transformation runs: the target column must exist
//! and hold text categories or numbers, and every remaining column must be a numeric feature.

use crate::exceptions::{PreparerError, PreparerResult};
use arrow::datatypes::{DataType, Schema};

/// Returns true for string columns the label encoder knows how to map.
pub fn is_text_type(data_type: &DataType) -> bool {
    matches!(
        data_type,
        DataType::Utf8 | DataType::LargeUtf8 | DataType::Utf8View
    )
}

/// Returns true for columns the pruner always removes: headers left blank by a trailing delimiter.
pub fn is_blank_column(name: &str) -> bool {
    name.trim().is_empty()
}

/// The validated layout of an input table.
#[derive(Debug, Clone, PartialEq)]
pub struct DatasetSchema {
    pub target: String,
    /// Feature column names in input order.
    pub features: Vec<String>,
}

impl DatasetSchema {
    /// Validates `schema` against the target column and the columns that will be pruned.
    pub fn validate(
        schema: &Schema,
        target: &str,
        drop_columns: &[String],
    ) -> PreparerResult<Self> {
        let target_field = schema.field_with_name(target).map_err(|_| {
            PreparerError::MissingColumn(format!("Target column '{}' not found", target))
        })?;
        let target_type = target_field.data_type();
        if !(is_text_type(target_type) || target_type.is_numeric()) {
            return Err(PreparerError::InvalidParameter(format!(
                "Target column '{}' has unsupported type {}",
                target, target_type
            )));
        }

        let mut features = Vec::new();
        for field in schema.fields() {
            let name = field.name();
            if name == target || is_blank_column(name) || drop_columns.contains(name) {
                continue;
            }
            if !field.data_type().is_numeric() {
                return Err(PreparerError::InvalidParameter(format!(
                    "Feature column '{}' must be numeric, found {}",
                    name,
                    field.data_type()
                )));
            }
            features.push(name.clone());
        }
        if features.is_empty() {
            return Err(PreparerError::InvalidParameter(
                "No feature columns left after pruning".to_string(),
            ));
        }

        Ok(Self {
            target: target.to_string(),
            features,
        })
    }
}

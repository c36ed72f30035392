//! # Column Pruning
//!
//! [`ColumnPruner`] removes identifier and artifact columns by name. Names that are not present
//! are ignored, and columns with a blank header (left behind by a trailing delimiter) are
//! always removed. All other columns keep their original order.

use crate::exceptions::{PreparerError, PreparerResult};
use crate::impl_transformer;
use crate::schema::is_blank_column;
use datafusion::logical_expr::{ident, Expr};
use datafusion::prelude::*;
use tracing::debug;

/// Best-effort drop of named columns.
pub struct ColumnPruner {
    pub columns: Vec<String>,
}

impl ColumnPruner {
    pub fn new(columns: Vec<String>) -> Self {
        Self { columns }
    }

    fn should_drop(&self, name: &str) -> bool {
        is_blank_column(name) || self.columns.iter().any(|c| c == name)
    }

    /// Stateless transformer: fit does nothing.
    pub async fn fit(&mut self, _df: &DataFrame) -> PreparerResult<()> {
        Ok(())
    }

    pub fn transform(&self, df: DataFrame) -> PreparerResult<DataFrame> {
        let (dropped, kept): (Vec<&String>, Vec<&String>) = df
            .schema()
            .fields()
            .iter()
            .map(|field| field.name())
            .partition(|name| self.should_drop(name));
        if dropped.is_empty() {
            return Ok(df);
        }
        debug!("Dropping columns {:?}", dropped);
        let exprs: Vec<Expr> = kept.into_iter().map(|name| ident(name)).collect();
        df.select(exprs).map_err(PreparerError::from)
    }

    fn inherent_is_stateful(&self) -> bool {
        false
    }
}

impl_transformer!(ColumnPruner);

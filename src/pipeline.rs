//! ## Dataset Preparer Pipeline
//!
//! This module provides the abstractions the preparation stages are built from.
//!
//! ### Overview
//!
//! - The [`Transformer`] trait defines a common interface for DataFrame transformation steps,
//!   supporting both stateful (requiring fitting) and stateless transformations.
//! - The [`Pipeline`] struct chains several transformers into one fit/transform unit.
//! - Macros [`crate::impl_transformer`] and [`crate::make_pipeline`] simplify the implementation
//!   of transformers and the creation of pipelines.
//! - [`materialize`] collects a lazy DataFrame into a single `RecordBatch`.

use crate::exceptions::{PreparerError, PreparerResult};
use arrow::compute::concat_batches;
use arrow::record_batch::RecordBatch;
use async_trait::async_trait;
use datafusion::prelude::*;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info};

/// Trait for components used in the data transformation pipeline.
///
/// Every transformer must provide a `fit` method (which may collect data to compute parameters)
/// and a `transform` method (which updates the DataFrame’s logical plan without triggering execution).
#[async_trait]
pub trait Transformer {
    /// Fit the transformer given a DataFrame.
    async fn fit(&mut self, df: &DataFrame) -> PreparerResult<()>;

    /// Transform the input DataFrame, returning a new DataFrame with the transformation applied.
    fn transform(&self, df: DataFrame) -> PreparerResult<DataFrame>;

    /// Returns true if the transformer is stateful (i.e. requires a call to fit before transform can be called).
    fn is_stateful(&self) -> bool;
}

/// Macro to implement the [`Transformer`] trait for a type with matching inherent methods.
///
/// The type must already have:
/// - `async fn fit(&mut self, &DataFrame) -> PreparerResult<()>`
/// - `fn transform(&self, DataFrame) -> PreparerResult<DataFrame>`
/// - `fn inherent_is_stateful(&self) -> bool`
#[macro_export]
macro_rules! impl_transformer {
    ($ty:ty) => {
        #[async_trait::async_trait]
        impl $crate::pipeline::Transformer for $ty {
            async fn fit(
                &mut self,
                df: &datafusion::prelude::DataFrame,
            ) -> $crate::exceptions::PreparerResult<()> {
                <$ty>::fit(self, df).await
            }
            fn transform(
                &self,
                df: datafusion::prelude::DataFrame,
            ) -> $crate::exceptions::PreparerResult<datafusion::prelude::DataFrame> {
                <$ty>::transform(self, df)
            }
            fn is_stateful(&self) -> bool {
                <$ty>::inherent_is_stateful(self)
            }
        }
    };
}

/// A pipeline that chains a sequence of transformers.
///
/// Each transformer's output (a new logical plan) is passed as input to the next transformer.
/// Errors are returned unchanged so callers can still match on the failing variant.
pub struct Pipeline {
    steps: Vec<(String, Box<dyn Transformer + Send + Sync>)>,
    verbose: bool,
}

impl Pipeline {
    /// Creates a new pipeline from (name, transformer) pairs. With `verbose`, step timings are
    /// logged at INFO instead of DEBUG.
    pub fn new(steps: Vec<(String, Box<dyn Transformer + Send + Sync>)>, verbose: bool) -> Self {
        Self { steps, verbose }
    }

    /// Names of the steps, in execution order.
    pub fn step_names(&self) -> Vec<&str> {
        self.steps.iter().map(|(name, _)| name.as_str()).collect()
    }

    /// Fits each transformer (sequentially) and feeds its output to the next one.
    pub async fn fit(&mut self, df: &DataFrame) -> PreparerResult<DataFrame> {
        if self.steps.is_empty() {
            return Err(PreparerError::InvalidParameter(
                "Pipeline must have at least one transformer.".to_string(),
            ));
        }
        let verbose = self.verbose;
        let mut current_df = df.clone();
        for (name, step) in self.steps.iter_mut() {
            let start = Instant::now();
            if let Err(e) = step.fit(&current_df).await {
                error!("Error fitting step '{}': {}", name, e);
                return Err(e);
            }
            current_df = step.transform(current_df).map_err(|e| {
                error!("Error transforming in step '{}': {}", name, e);
                e
            })?;
            report(name, start, verbose);
        }
        Ok(current_df)
    }

    /// Applies the `transform` method of each transformer (without fitting).
    pub fn transform(&self, df: DataFrame) -> PreparerResult<DataFrame> {
        if self.steps.is_empty() {
            return Err(PreparerError::InvalidParameter(
                "Pipeline must have at least one transformer.".to_string(),
            ));
        }
        let mut current_df = df;
        for (name, step) in self.steps.iter() {
            if step.is_stateful() {
                debug!("Applying fitted transformer '{}'", name);
            }
            let start = Instant::now();
            current_df = step.transform(current_df).map_err(|e| {
                error!("Error in transformer '{}': {}", name, e);
                e
            })?;
            report(name, start, self.verbose);
        }
        Ok(current_df)
    }

    /// Convenience method to call `fit` and then return the final transformed DataFrame.
    pub async fn fit_transform(&mut self, df: &DataFrame) -> PreparerResult<DataFrame> {
        self.fit(df).await
    }
}

fn report(name: &str, start: Instant, verbose: bool) {
    if verbose {
        info!("Step '{}' completed in {:?}", name, start.elapsed());
    } else {
        debug!("Step '{}' completed in {:?}", name, start.elapsed());
    }
}

/// Macro to simplify pipeline creation by automatically boxing transformers.
///
/// # Example
///
/// ```rust,no_run
/// use dataset_preparer::make_pipeline;
/// use dataset_preparer::transformers::column_pruning::ColumnPruner;
///
/// let pipeline = make_pipeline!(false,
///     ("prune", ColumnPruner::new(vec!["id".to_string()])),
/// );
/// ```
#[macro_export]
macro_rules! make_pipeline {
    ($verbose:expr, $(($name:expr, $transformer:expr)),+ $(,)?) => {
        {
            let steps: Vec<(String, Box<dyn $crate::pipeline::Transformer + Send + Sync>)> = vec![
                $(
                    ($name.to_string(), Box::new($transformer)),
                )+
            ];
            $crate::pipeline::Pipeline::new(steps, $verbose)
        }
    };
}

/// Executes the DataFrame and concatenates the result into one batch, preserving row order.
pub async fn materialize(df: DataFrame) -> PreparerResult<RecordBatch> {
    let fallback_schema = Arc::new(df.schema().as_arrow().clone());
    let batches = df.collect().await?;
    let schema = batches
        .first()
        .map(|batch| batch.schema())
        .unwrap_or(fallback_schema);
    Ok(concat_batches(&schema, &batches)?)
}

//! ## Dataset Preparer
//!
//! [`DatasetPreparer`] runs the whole preparation in a fixed order:
//!
//! 1. load the CSV file,
//! 2. validate its schema,
//! 3. encode the target column and prune identifier/artifact columns,
//! 4. split rows into stratified train and test subsets,
//! 5. fit a [`StandardScaler`] on the training features and apply it to both subsets,
//! 6. write the four artifacts (and optionally the scaling statistics).
//!
//! Nothing is written unless every earlier stage succeeded.
//!
//! ### Example
//!
//! ```rust,no_run
//! use dataset_preparer::preparer::DatasetPreparer;
//! use dataset_preparer::settings::PreparerConfig;
//!
//! # async fn run() -> dataset_preparer::exceptions::PreparerResult<()> {
//! let config = PreparerConfig::default().with_test_size(0.25);
//! let prepared = DatasetPreparer::new(config).run().await?;
//! println!("{} training rows", prepared.x_train.num_rows());
//! # Ok(())
//! # }
//! ```

use crate::exceptions::{PreparerError, PreparerResult};
use crate::loader::load_csv;
use crate::make_pipeline;
use crate::persistence::{
    write_artifacts, Artifact, SCALER_FILE, X_TEST_FILE, X_TRAIN_FILE, Y_TEST_FILE, Y_TRAIN_FILE,
};
use crate::pipeline::materialize;
use crate::schema::DatasetSchema;
use crate::settings::PreparerConfig;
use crate::split::{StratifiedSplit, TrainTestSplit};
use crate::transformers::categorical_encoding::LabelEncoder;
use crate::transformers::column_pruning::ColumnPruner;
use crate::transformers::scaling::{ScalingModel, StandardScaler};
use arrow::record_batch::RecordBatch;
use datafusion::prelude::{DataFrame, SessionConfig, SessionContext};
use std::path::PathBuf;
use tracing::info;

/// Scaled subsets, their labels and the statistics used to scale them.
#[derive(Debug, Clone)]
pub struct PreparedDataset {
    pub x_train: RecordBatch,
    pub x_test: RecordBatch,
    pub y_train: RecordBatch,
    pub y_test: RecordBatch,
    pub scaling_model: ScalingModel,
    /// Files written by [`DatasetPreparer::run`]; empty after [`DatasetPreparer::prepare`].
    pub written: Vec<PathBuf>,
}

/// Runs the preparation stages for one configuration.
pub struct DatasetPreparer {
    config: PreparerConfig,
    ctx: SessionContext,
}

impl DatasetPreparer {
    /// Creates a preparer with a single-partition session, which keeps aggregation order and
    /// therefore the written numbers identical from run to run.
    pub fn new(config: PreparerConfig) -> Self {
        let session = SessionConfig::new().with_target_partitions(1);
        Self {
            config,
            ctx: SessionContext::new_with_config(session),
        }
    }

    pub fn config(&self) -> &PreparerConfig {
        &self.config
    }

    /// Loads, encodes and prunes the input, returning the table that will be split.
    pub async fn encoded_table(&self) -> PreparerResult<(DataFrame, DatasetSchema)> {
        let raw = load_csv(&self.ctx, &self.config.input_path).await?;
        let schema = DatasetSchema::validate(
            raw.schema().as_arrow(),
            &self.config.target_column,
            &self.config.drop_columns,
        )?;
        info!(
            "Target '{}', {} feature columns",
            schema.target,
            schema.features.len()
        );

        let mut pipeline = make_pipeline!(
            false,
            ("encode", LabelEncoder::new(schema.target.clone())),
            ("prune", ColumnPruner::new(self.config.drop_columns.clone())),
        );
        let encoded = pipeline.fit_transform(&raw).await?;
        Ok((encoded, schema))
    }

    /// Runs every stage except persistence.
    pub async fn prepare(&self) -> PreparerResult<PreparedDataset> {
        self.config.validate()?;
        let (encoded, schema) = self.encoded_table().await?;

        let splitter = StratifiedSplit::new(self.config.test_size, self.config.random_state);
        let TrainTestSplit {
            x_train,
            x_test,
            y_train,
            y_test,
        } = splitter.split(encoded, &schema.target).await?;

        let mut scaler = StandardScaler::new(schema.features.clone());
        let train_df = self.ctx.read_batch(x_train)?;
        scaler.fit(&train_df).await?;
        let x_train = materialize(scaler.transform(train_df)?).await?;
        let x_test = materialize(scaler.transform(self.ctx.read_batch(x_test)?)?).await?;
        info!("Standardized {} feature columns", schema.features.len());

        let scaling_model = scaler
            .into_model()
            .ok_or(PreparerError::FitNotCalled)?;
        Ok(PreparedDataset {
            x_train,
            x_test,
            y_train,
            y_test,
            scaling_model,
            written: Vec::new(),
        })
    }

    /// Runs the full pipeline and writes the artifacts to the configured directory.
    pub async fn run(&self) -> PreparerResult<PreparedDataset> {
        let mut prepared = self.prepare().await?;
        let dir = &self.config.output_dir;
        let model_batch = if self.config.save_scaling_model {
            Some(prepared.scaling_model.to_record_batch()?)
        } else {
            None
        };
        let mut artifacts = vec![
            Artifact::features(X_TRAIN_FILE, &prepared.x_train),
            Artifact::features(X_TEST_FILE, &prepared.x_test),
            Artifact::labels(Y_TRAIN_FILE, &prepared.y_train),
            Artifact::labels(Y_TEST_FILE, &prepared.y_test),
        ];
        if let Some(batch) = &model_batch {
            artifacts.push(Artifact::features(SCALER_FILE, batch));
        }
        let written = write_artifacts(dir, self.config.output_format, &artifacts)?;
        prepared.written = written;
        info!("Prepared data saved to '{}'", dir.display());
        Ok(prepared)
    }
}

/// Convenience wrapper: builds a [`DatasetPreparer`] and runs it.
pub async fn prepare_dataset(config: PreparerConfig) -> PreparerResult<PreparedDataset> {
    DatasetPreparer::new(config).run().await
}

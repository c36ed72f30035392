use std::fs;
use std::path::{Path, PathBuf};

use approx::assert_relative_eq;
use arrow::array::{Float64Array, Int64Array};
use arrow::record_batch::RecordBatch;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use tempfile::{tempdir, TempDir};

use dataset_preparer::exceptions::{PreparerError, PreparerResult};
use dataset_preparer::persistence::{
    write_artifacts, Artifact, X_TEST_FILE, X_TRAIN_FILE, Y_TEST_FILE, Y_TRAIN_FILE,
};
use dataset_preparer::settings::{OutputFormat, PreparerConfig};
use dataset_preparer::split::StratifiedSplit;
use dataset_preparer::DatasetPreparer;

const SAMPLE: &str = "tests/testdata/breast_cancer_sample.csv";

/// Ten rows, 7 benign and 3 malignant, with two features, an id and an empty artifact column.
const TEN_ROWS: &str = "\
id,diagnosis,radius_mean,texture_mean,Unnamed: 32
101,B,12.5,14.2,
102,M,20.1,21.3,
103,B,11.9,16.8,
104,B,13.4,15.1,
105,M,18.7,24.9,
106,B,10.8,13.7,
107,B,12.2,19.4,
108,M,21.6,22.0,
109,B,13.0,17.5,
110,B,11.4,18.3,
";

fn write_input(dir: &TempDir, contents: &str) -> PathBuf {
    let path = dir.path().join("data.csv");
    fs::write(&path, contents).unwrap();
    path
}

fn config(input: &Path, output: &Path) -> PreparerConfig {
    PreparerConfig::default()
        .with_input_path(input)
        .with_output_dir(output)
}

fn float_columns(batch: &RecordBatch) -> Vec<Vec<f64>> {
    batch
        .columns()
        .iter()
        .map(|c| {
            c.as_any()
                .downcast_ref::<Float64Array>()
                .expect("features should be Float64")
                .values()
                .to_vec()
        })
        .collect()
}

fn labels(batch: &RecordBatch) -> Vec<i64> {
    batch
        .column(0)
        .as_any()
        .downcast_ref::<Int64Array>()
        .expect("labels should be Int64")
        .values()
        .to_vec()
}

fn mean_and_std(values: &[f64]) -> (f64, f64) {
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let var = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
    (mean, var.sqrt())
}

#[tokio::test]
async fn test_ten_row_end_to_end() -> PreparerResult<()> {
    let dir = tempdir().unwrap();
    let input = write_input(&dir, TEN_ROWS);
    let output = dir.path().join("out");

    let prepared = DatasetPreparer::new(config(&input, &output)).run().await?;

    assert_eq!(prepared.x_test.num_rows(), 2);
    assert_eq!(prepared.x_train.num_rows(), 8);
    let mut test_labels = labels(&prepared.y_test);
    test_labels.sort_unstable();
    assert_eq!(test_labels, vec![0, 1]);

    let names: Vec<String> = prepared
        .x_train
        .schema()
        .fields()
        .iter()
        .map(|f| f.name().clone())
        .collect();
    assert_eq!(names, vec!["radius_mean", "texture_mean"]);

    for column in float_columns(&prepared.x_train) {
        let (mean, std) = mean_and_std(&column);
        assert_relative_eq!(mean, 0.0, epsilon = 1e-9);
        assert_relative_eq!(std, 1.0, epsilon = 1e-9);
    }

    for name in [X_TRAIN_FILE, X_TEST_FILE, Y_TRAIN_FILE, Y_TEST_FILE] {
        assert!(output.join(format!("{}.csv", name)).is_file(), "{} missing", name);
    }
    assert_eq!(prepared.written.len(), 4);
    Ok(())
}

#[tokio::test]
async fn test_written_csv_layout() -> PreparerResult<()> {
    let dir = tempdir().unwrap();
    let input = write_input(&dir, TEN_ROWS);
    let output = dir.path().join("out");
    let prepared = DatasetPreparer::new(config(&input, &output)).run().await?;

    let x_train = fs::read_to_string(output.join("X_train_scaled.csv")).unwrap();
    let mut lines = x_train.lines();
    assert_eq!(lines.next(), Some("radius_mean,texture_mean"));
    assert_eq!(lines.count(), 8);

    // Label files are one headerless integer column, in the same order as the feature rows.
    let y_train = fs::read_to_string(output.join("y_train.csv")).unwrap();
    let written: Vec<i64> = y_train.lines().map(|l| l.parse().unwrap()).collect();
    assert_eq!(written, labels(&prepared.y_train));

    let y_test = fs::read_to_string(output.join("y_test.csv")).unwrap();
    assert_eq!(y_test.lines().count(), 2);
    Ok(())
}

#[tokio::test]
async fn test_runs_are_byte_identical() -> PreparerResult<()> {
    let dir = tempdir().unwrap();
    let input = PathBuf::from(SAMPLE);
    let first = dir.path().join("first");
    let second = dir.path().join("second");

    DatasetPreparer::new(config(&input, &first)).run().await?;
    DatasetPreparer::new(config(&input, &second)).run().await?;

    for name in ["X_train_scaled", "X_test_scaled", "y_train", "y_test"] {
        let file = format!("{}.csv", name);
        assert_eq!(
            fs::read(first.join(&file)).unwrap(),
            fs::read(second.join(&file)).unwrap(),
            "{} differs between runs",
            file
        );
    }
    Ok(())
}

#[tokio::test]
async fn test_sample_dataset_split_and_scaling() -> PreparerResult<()> {
    let dir = tempdir().unwrap();
    let preparer =
        DatasetPreparer::new(config(Path::new(SAMPLE), &dir.path().join("out")));
    let prepared = preparer.prepare().await?;

    // 30 rows: ceil(0.2 * 30) = 6 test rows; 11 of 30 malignant.
    assert_eq!(prepared.x_test.num_rows(), 6);
    assert_eq!(prepared.x_train.num_columns(), 30);
    let malignant = labels(&prepared.y_test).iter().filter(|&&l| l == 1).count();
    assert!((malignant as f64 - 6.0 * 11.0 / 30.0).abs() <= 1.0);

    // prepare() writes nothing.
    assert!(prepared.written.is_empty());
    assert!(!dir.path().join("out").exists());

    // The scaling statistics come from the training rows alone: recompute them from the
    // unscaled training split produced with the same seed.
    let (encoded, schema) = preparer.encoded_table().await?;
    let raw_split = StratifiedSplit::new(0.2, 42)
        .split(encoded, &schema.target)
        .await?;
    let raw_train = raw_split.x_train;
    let radius_idx = raw_train.schema().index_of("radius_mean")?;
    let radius: Vec<f64> = raw_train
        .column(radius_idx)
        .as_any()
        .downcast_ref::<Float64Array>()
        .expect("radius_mean should be Float64")
        .values()
        .to_vec();
    let (mean, std) = mean_and_std(&radius);
    let stats = prepared.scaling_model.get("radius_mean").unwrap();
    assert_eq!(prepared.scaling_model.n_samples, 24);
    assert_relative_eq!(stats.mean, mean, max_relative = 1e-12);
    assert_relative_eq!(stats.std_dev, std, max_relative = 1e-9);
    Ok(())
}

#[tokio::test]
async fn test_parquet_output_with_scaler() -> PreparerResult<()> {
    let dir = tempdir().unwrap();
    let output = dir.path().join("out");
    let prepared = DatasetPreparer::new(
        config(Path::new(SAMPLE), &output)
            .with_output_format(OutputFormat::Parquet)
            .with_save_scaling_model(true),
    )
    .run()
    .await?;

    assert_eq!(prepared.written.len(), 5);
    let file = fs::File::open(output.join("y_test.parquet"))?;
    let reader = ParquetRecordBatchReaderBuilder::try_new(file)?.build()?;
    let batches: Vec<RecordBatch> = reader.collect::<Result<_, _>>()?;
    let rows: usize = batches.iter().map(|b| b.num_rows()).sum();
    assert_eq!(rows, 6);
    assert_eq!(batches[0].schema().field(0).name(), "diagnosis");

    let params = fs::File::open(output.join("scaler_params.parquet"))?;
    let reader = ParquetRecordBatchReaderBuilder::try_new(params)?.build()?;
    let rows: usize = reader.map(|b| b.map(|b| b.num_rows()).unwrap_or(0)).sum();
    assert_eq!(rows, 30);

    // No staging files are left behind.
    let leftovers = fs::read_dir(&output)?
        .filter_map(|e| e.ok())
        .filter(|e| e.file_name().to_string_lossy().ends_with(".tmp"))
        .count();
    assert_eq!(leftovers, 0);
    Ok(())
}

#[tokio::test]
async fn test_existing_files_are_replaced() -> PreparerResult<()> {
    let dir = tempdir().unwrap();
    let input = write_input(&dir, TEN_ROWS);
    let output = dir.path().join("out");
    fs::create_dir_all(&output)?;
    fs::write(output.join("y_test.csv"), "stale\n")?;

    DatasetPreparer::new(config(&input, &output)).run().await?;
    let y_test = fs::read_to_string(output.join("y_test.csv"))?;
    assert!(!y_test.contains("stale"));
    Ok(())
}

#[tokio::test]
async fn test_failures_write_nothing() {
    let dir = tempdir().unwrap();
    let output = dir.path().join("out");

    let missing = DatasetPreparer::new(config(&dir.path().join("nope.csv"), &output))
        .run()
        .await;
    assert!(matches!(missing, Err(PreparerError::FileNotFound(_))));

    let bad_label = TEN_ROWS.replacen(",M,", ",X,", 1);
    let input = write_input(&dir, &bad_label);
    let invalid = DatasetPreparer::new(config(&input, &output)).run().await;
    assert!(matches!(invalid, Err(PreparerError::InvalidLabel(_))));

    let input = write_input(&dir, TEN_ROWS);
    let too_big = DatasetPreparer::new(config(&input, &output).with_test_size(0.95))
        .run()
        .await;
    assert!(matches!(too_big, Err(PreparerError::SplitError(_))));

    assert!(!output.exists());
}

#[tokio::test]
async fn test_already_encoded_input() -> PreparerResult<()> {
    let dir = tempdir().unwrap();
    let encoded = TEN_ROWS.replace(",M,", ",1,").replace(",B,", ",0,");
    let input = write_input(&dir, &encoded);
    let prepared = DatasetPreparer::new(config(&input, &dir.path().join("out")))
        .prepare()
        .await?;
    let mut all: Vec<i64> = labels(&prepared.y_train);
    all.extend(labels(&prepared.y_test));
    all.sort_unstable();
    assert_eq!(all, vec![0, 0, 0, 0, 0, 0, 0, 1, 1, 1]);
    Ok(())
}

#[tokio::test]
async fn test_numeric_labels_outside_zero_one_are_rejected() {
    let dir = tempdir().unwrap();
    let output = dir.path().join("out");
    let three_classes = TEN_ROWS
        .replace(",M,", ",7,")
        .replacen(",B,", ",5,", 4)
        .replace(",B,", ",6,");
    let input = write_input(&dir, &three_classes);
    let result = DatasetPreparer::new(config(&input, &output)).run().await;
    assert!(
        matches!(result, Err(PreparerError::InvalidLabel(_))),
        "got {:?}",
        result.err()
    );
    assert!(!output.exists());
}

fn tmp_files(dir: &Path) -> usize {
    fs::read_dir(dir)
        .unwrap()
        .filter_map(|e| e.ok())
        .filter(|e| e.path().is_file() && e.file_name().to_string_lossy().ends_with(".tmp"))
        .count()
}

#[tokio::test]
async fn test_failed_write_leaves_no_artifacts() -> PreparerResult<()> {
    let dir = tempdir().unwrap();
    let input = write_input(&dir, TEN_ROWS);
    let output = dir.path().join("out");
    let prepared = DatasetPreparer::new(config(&input, &dir.path().join("unused")))
        .prepare()
        .await?;

    // A directory in the way of the last staging file makes its creation fail.
    fs::create_dir_all(output.join("y_test.csv.tmp"))?;
    let artifacts = [
        Artifact::features(X_TRAIN_FILE, &prepared.x_train),
        Artifact::features(X_TEST_FILE, &prepared.x_test),
        Artifact::labels(Y_TRAIN_FILE, &prepared.y_train),
        Artifact::labels(Y_TEST_FILE, &prepared.y_test),
    ];
    let result = write_artifacts(&output, OutputFormat::Csv, &artifacts);
    assert!(matches!(result, Err(PreparerError::IoError(_))));

    assert_eq!(tmp_files(&output), 0);
    for name in [X_TRAIN_FILE, X_TEST_FILE, Y_TRAIN_FILE, Y_TEST_FILE] {
        assert!(!output.join(format!("{}.csv", name)).exists(), "{} was written", name);
    }

    // The same call succeeds once the obstacle is gone.
    fs::remove_dir(output.join("y_test.csv.tmp"))?;
    let written = write_artifacts(&output, OutputFormat::Csv, &artifacts)?;
    assert_eq!(written.len(), 4);
    assert_eq!(tmp_files(&output), 0);
    Ok(())
}

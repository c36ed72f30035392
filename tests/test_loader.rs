use std::fs;

use datafusion::prelude::SessionContext;
use tempfile::tempdir;

use dataset_preparer::exceptions::{PreparerError, PreparerResult};
use dataset_preparer::loader::load_csv;
use dataset_preparer::pipeline::materialize;

const SAMPLE: &str = "tests/testdata/breast_cancer_sample.csv";

#[tokio::test]
async fn test_loads_sample_dataset() -> PreparerResult<()> {
    let ctx = SessionContext::new();
    let df = load_csv(&ctx, SAMPLE).await?;
    let schema = df.schema().as_arrow().clone();
    assert_eq!(schema.fields().len(), 33);
    assert_eq!(schema.field(0).name(), "id");
    assert_eq!(schema.field(1).name(), "diagnosis");
    assert_eq!(schema.field(9).name(), "concave points_mean");
    assert_eq!(schema.field(32).name(), "Unnamed: 32");

    let batch = materialize(df).await?;
    assert_eq!(batch.num_rows(), 30);
    Ok(())
}

#[tokio::test]
async fn test_missing_file_is_reported() {
    let ctx = SessionContext::new();
    let result = load_csv(&ctx, "breast_cancer_dataset/does_not_exist.csv").await;
    match result {
        Err(PreparerError::FileNotFound(path)) => assert!(path.contains("does_not_exist.csv")),
        other => panic!("expected FileNotFound, got {:?}", other.err()),
    }
}

#[tokio::test]
async fn test_ragged_rows_are_malformed() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("ragged.csv");
    fs::write(&path, "id,diagnosis,radius_mean\n1,M,17.99\n2,B,13.54,99,100\n").unwrap();

    let ctx = SessionContext::new();
    let result = load_csv(&ctx, &path).await;
    assert!(
        matches!(result, Err(PreparerError::MalformedInput(_))),
        "got {:?}",
        result.err()
    );
}

#[tokio::test]
async fn test_header_only_file_is_malformed() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("empty.csv");
    fs::write(&path, "id,diagnosis,radius_mean\n").unwrap();

    let ctx = SessionContext::new();
    let result = load_csv(&ctx, &path).await;
    assert!(matches!(result, Err(PreparerError::MalformedInput(_))));
}

#[tokio::test]
async fn test_non_csv_extension_is_read() -> PreparerResult<()> {
    let dir = tempdir().unwrap();
    let path = dir.path().join("data.txt");
    fs::write(&path, "id,diagnosis,radius_mean\n1,M,17.99\n2,B,13.54\n").unwrap();

    let ctx = SessionContext::new();
    let batch = materialize(load_csv(&ctx, &path).await?).await?;
    assert_eq!(batch.num_rows(), 2);
    Ok(())
}

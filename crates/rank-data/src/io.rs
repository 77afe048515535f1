//! Dataset loading and ranking output.

use std::fs::File;
use std::path::Path;

use polars::prelude::*;
use rank_core::{DatasetKind, RankError, Result, Settings};
use tracing::info;

/// Marker the raw exports use for absent values.
const NULL_MARKER: &str = "NULL";

/// Load the train or test dataset named by the settings, honoring the row cap.
pub fn load_dataset(kind: DatasetKind, settings: &Settings) -> Result<DataFrame> {
    let path = settings.paths.dataset_path(kind);
    let df = read_csv(path, settings.data.row_limit())?;
    info!(
        "Loaded {} dataset from {}: {} rows x {} columns",
        kind,
        path.display(),
        df.height(),
        df.width()
    );
    Ok(df)
}

pub fn read_csv(path: &Path, n_rows: Option<usize>) -> Result<DataFrame> {
    if !path.exists() {
        return Err(RankError::Io(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            format!("dataset not found: {}", path.display()),
        )));
    }

    let parse_options = CsvParseOptions::default()
        .with_null_values(Some(NullValues::AllColumnsSingle(NULL_MARKER.into())));

    let df = CsvReadOptions::default()
        .with_has_header(true)
        .with_n_rows(n_rows)
        .with_infer_schema_length(Some(10_000))
        .with_parse_options(parse_options)
        .try_into_reader_with_file_path(Some(path.to_path_buf()))?
        .finish()?;
    Ok(df)
}

/// Write `(search id, listing id)` pairs as `SearchId,PropertyId` CSV, in order.
pub fn write_ranking(pairs: &[(i64, i64)], path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    let search_ids: Vec<i64> = pairs.iter().map(|p| p.0).collect();
    let listing_ids: Vec<i64> = pairs.iter().map(|p| p.1).collect();
    let mut df = DataFrame::new(vec![
        Column::new("SearchId".into(), search_ids),
        Column::new("PropertyId".into(), listing_ids),
    ])?;

    let mut file = File::create(path)?;
    CsvWriter::new(&mut file)
        .include_header(true)
        .finish(&mut df)?;

    info!("Wrote {} ranked rows to {}", pairs.len(), path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::{id_values, numeric_values};
    use std::io::Write;
    use tempfile::TempDir;

    #[test]
    fn test_read_csv_null_marker_and_row_cap() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("train.csv");
        let mut file = File::create(&path).unwrap();
        writeln!(file, "srch_id,prop_id,prop_review_score").unwrap();
        writeln!(file, "1,10,3.5").unwrap();
        writeln!(file, "1,11,NULL").unwrap();
        writeln!(file, "2,12,4.0").unwrap();
        drop(file);

        let df = read_csv(&path, None).unwrap();
        assert_eq!(df.height(), 3);
        let scores = numeric_values(&df, "prop_review_score").unwrap();
        assert_eq!(scores, vec![Some(3.5), None, Some(4.0)]);

        let capped = read_csv(&path, Some(2)).unwrap();
        assert_eq!(capped.height(), 2);
    }

    #[test]
    fn test_read_csv_missing_file() {
        let dir = TempDir::new().unwrap();
        let result = read_csv(&dir.path().join("absent.csv"), None);
        assert!(matches!(result, Err(RankError::Io(_))));
    }

    #[test]
    fn test_write_ranking_header_and_order() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("out").join("submission.csv");
        write_ranking(&[(1, 20), (1, 10), (2, 30)], &path).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        let mut lines = text.lines();
        assert_eq!(lines.next(), Some("SearchId,PropertyId"));
        assert_eq!(lines.next(), Some("1,20"));

        let df = read_csv(&path, None).unwrap();
        assert_eq!(id_values(&df, "PropertyId").unwrap(), vec![20, 10, 30]);
    }
}

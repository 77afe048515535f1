//! Typed access to polars frames with the pipeline's error taxonomy.

use ndarray::Array2;
use polars::prelude::*;
use rank_core::{RankError, Result};

pub fn has_column(df: &DataFrame, name: &str) -> bool {
    df.get_column_names().iter().any(|c| c.as_str() == name)
}

pub fn require_column<'a>(df: &'a DataFrame, name: &str) -> Result<&'a Series> {
    if !has_column(df, name) {
        return Err(RankError::Schema(format!("missing column '{name}'")));
    }
    Ok(df.column(name)?.as_materialized_series())
}

pub fn column_names(df: &DataFrame) -> Vec<String> {
    df.get_column_names()
        .iter()
        .map(|c| c.to_string())
        .collect()
}

pub fn is_integer_column(df: &DataFrame, name: &str) -> Result<bool> {
    Ok(require_column(df, name)?.dtype().is_integer())
}

/// Column values as nullable `f64`. NaN reads as missing.
///
/// Fails with `TypeMismatch` when coercion to a number loses values, e.g. a
/// text column holding words.
pub fn numeric_values(df: &DataFrame, name: &str) -> Result<Vec<Option<f64>>> {
    let series = require_column(df, name)?;
    let casted = series.cast(&DataType::Float64).map_err(|e| {
        RankError::TypeMismatch(format!("column '{name}' ({}) is not numeric: {e}", series.dtype()))
    })?;
    if casted.null_count() > series.null_count() {
        return Err(RankError::TypeMismatch(format!(
            "column '{name}' has {} non-numeric values",
            casted.null_count() - series.null_count()
        )));
    }
    let chunked = casted.f64()?;
    Ok(chunked
        .into_iter()
        .map(|v| v.filter(|x| !x.is_nan()))
        .collect())
}

pub fn set_f64_column(df: &mut DataFrame, name: &str, values: Vec<Option<f64>>) -> Result<()> {
    df.with_column(Series::new(name.into(), values))?;
    Ok(())
}

pub fn set_i32_column(df: &mut DataFrame, name: &str, values: Vec<i32>) -> Result<()> {
    df.with_column(Series::new(name.into(), values))?;
    Ok(())
}

/// Identifier column as `i64`; every entry must be present.
pub fn id_values(df: &DataFrame, name: &str) -> Result<Vec<i64>> {
    let values = numeric_values(df, name)?;
    values
        .into_iter()
        .enumerate()
        .map(|(row, v)| {
            v.map(|x| x as i64).ok_or_else(|| {
                RankError::TypeMismatch(format!("column '{name}' is missing a value at row {row}"))
            })
        })
        .collect()
}

/// Binary label column; every entry must be 0 or 1.
pub fn label_values(df: &DataFrame, name: &str) -> Result<Vec<u8>> {
    let values = numeric_values(df, name)?;
    values
        .into_iter()
        .enumerate()
        .map(|(row, v)| match v {
            Some(x) if x == 0.0 => Ok(0),
            Some(x) if x == 1.0 => Ok(1),
            other => Err(RankError::TypeMismatch(format!(
                "label '{name}' must be 0 or 1, got {other:?} at row {row}"
            ))),
        })
        .collect()
}

/// Project the frame onto `features` as a row-major `f32` matrix.
/// Missing values become 0.0.
pub fn feature_matrix(df: &DataFrame, features: &[String]) -> Result<Array2<f32>> {
    let n_rows = df.height();
    let n_cols = features.len();
    let mut data = Array2::<f32>::zeros((n_rows, n_cols));

    for (col_idx, name) in features.iter().enumerate() {
        let values = numeric_values(df, name)?;
        for (row_idx, v) in values.into_iter().enumerate() {
            data[(row_idx, col_idx)] = v.unwrap_or(0.0) as f32;
        }
    }

    Ok(data)
}

/// Select rows by position, in the given order.
pub fn take_rows(df: &DataFrame, rows: &[usize]) -> Result<DataFrame> {
    let indices: Vec<IdxSize> = rows.iter().map(|&i| i as IdxSize).collect();
    let indices_ca = IdxCa::from_vec("indices".into(), indices);
    Ok(df.take(&indices_ca)?)
}

/// Total count of missing entries across all columns.
pub fn count_missing(df: &DataFrame) -> usize {
    df.get_columns().iter().map(|c| c.null_count()).sum()
}

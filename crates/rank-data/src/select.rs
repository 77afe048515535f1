//! Canonical feature list of an enriched frame.

use polars::prelude::DataFrame;
use rank_core::{RankError, Result};

use crate::frame::column_names;
use crate::schema::{competitor_columns, DatasetSchema, EXCLUDED_IDENTIFIERS};

/// Feature columns of `df` in order of appearance.
///
/// Identifier columns and the raw competitor columns must exist and are
/// removed. Train-only columns are removed when `schema` declares them.
pub fn select_features(df: &DataFrame, schema: &DatasetSchema) -> Result<Vec<String>> {
    let mut features = column_names(df);

    let mandatory = EXCLUDED_IDENTIFIERS
        .iter()
        .map(|s| s.to_string())
        .chain(competitor_columns());
    for name in mandatory {
        remove_column(&mut features, &name)?;
    }

    for column in schema.optional_columns() {
        remove_column(&mut features, column.name())?;
    }

    Ok(features)
}

fn remove_column(features: &mut Vec<String>, name: &str) -> Result<()> {
    let pos = features
        .iter()
        .position(|f| f == name)
        .ok_or_else(|| RankError::Schema(format!("cannot exclude absent column '{name}'")))?;
    features.remove(pos);
    Ok(())
}

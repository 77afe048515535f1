//! Feature engineering applied identically to training and inference data.
//!
//! Every statistic used here (medians, correlations, percentiles) comes from
//! the frame being transformed. Randomness is confined to the support-column
//! imputation and drawn from the caller's RNG.

use std::collections::HashMap;

use chrono::{Datelike, NaiveDateTime, Timelike};
use polars::prelude::*;
use rand::Rng;
use rank_core::{RankError, Result};
use tracing::{debug, info, warn};

use crate::frame::{
    has_column, is_integer_column, numeric_values, require_column, set_f64_column,
    set_i32_column,
};
use crate::schema::{self, *};
use crate::stats;

const TIMESTAMP_FORMATS: [&str; 2] = ["%Y-%m-%d %H:%M:%S", "%Y-%m-%d %H:%M:%S%.f"];

/// Inventory remap applied in sequence; the 10 is a temporary sentinel.
const INVENTORY_REMAP: [(f64, f64); 4] = [(1.0, 10.0), (-1.0, 1.0), (0.0, -1.0), (10.0, 0.0)];

/// Outcome of one support-column imputation.
#[derive(Debug, Clone, PartialEq)]
pub struct SupportFill {
    pub target: String,
    pub support: String,
    pub correlation: f64,
    pub value: f64,
    pub filled: usize,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct TransformSummary {
    pub already_enriched: bool,
    pub affinity: Option<SupportFill>,
    pub distance: Option<SupportFill>,
}

/// Derives the enriched feature columns from a raw search/listing frame.
#[derive(Debug, Clone)]
pub struct FeatureTransformer {
    pub clip_lower: f64,
    pub clip_upper: f64,
}

impl Default for FeatureTransformer {
    fn default() -> Self {
        Self {
            clip_lower: 0.05,
            clip_upper: 0.95,
        }
    }
}

impl FeatureTransformer {
    pub fn new() -> Self {
        Self::default()
    }

    /// True when every derived column is already present.
    pub fn is_enriched(df: &DataFrame) -> bool {
        schema::derived_columns()
            .iter()
            .all(|name| has_column(df, name))
    }

    /// Enrich `df` in place. A frame that is already enriched is left as is.
    pub fn transform<R: Rng + ?Sized>(
        &self,
        df: &mut DataFrame,
        rng: &mut R,
    ) -> Result<TransformSummary> {
        if Self::is_enriched(df) {
            debug!("Frame already carries derived columns, skipping transform");
            return Ok(TransformSummary {
                already_enriched: true,
                ..Default::default()
            });
        }

        let start = std::time::Instant::now();

        fill_with_median(df, REVIEW_SCORE)?;
        fill_with_constant(df, LOCATION_SCORE2, 0.0)?;
        fill_with_constant(df, VISITOR_ADR, 0.0)?;
        add_presence_flag(df, VISITOR_STARRATING, STARRATING_PRESENT)?;
        add_date_parts(df)?;
        binarize_nonzero(df, HISTORICAL_PRICE)?;
        add_top_country_flag(df)?;

        let affinity = impute_from_support(df, AFFINITY_SCORE, rng)?;
        self.clip_to_quantiles(df, AFFINITY_SCORE)?;
        let distance = impute_from_support(df, DISTANCE, rng)?;

        merge_competitor_rates(df)?;
        merge_competitor_inventory(df)?;

        info!(
            "Feature engineering done: {} columns, {:.2}s",
            df.width(),
            start.elapsed().as_secs_f64()
        );

        Ok(TransformSummary {
            already_enriched: false,
            affinity,
            distance,
        })
    }

    /// Censor a column to its own lower/upper percentiles. Missing stays missing.
    pub fn clip_to_quantiles(&self, df: &mut DataFrame, name: &str) -> Result<()> {
        let values = numeric_values(df, name)?;
        let (Some(lo), Some(hi)) = (
            stats::quantile(&values, self.clip_lower),
            stats::quantile(&values, self.clip_upper),
        ) else {
            warn!("Column '{}' has no values to clip", name);
            return Ok(());
        };

        let clipped = values
            .into_iter()
            .map(|v| v.map(|x| x.clamp(lo, hi)))
            .collect();
        set_f64_column(df, name, clipped)?;
        debug!("Clipped '{}' to [{:.4}, {:.4}]", name, lo, hi);
        Ok(())
    }
}

fn fill_with_median(df: &mut DataFrame, name: &str) -> Result<()> {
    let values = numeric_values(df, name)?;
    match stats::median(&values) {
        Some(median) => fill_missing(df, name, values, median),
        None => {
            warn!("Column '{}' is entirely missing, median undefined", name);
            Ok(())
        }
    }
}

fn fill_with_constant(df: &mut DataFrame, name: &str, value: f64) -> Result<()> {
    let values = numeric_values(df, name)?;
    fill_missing(df, name, values, value)
}

fn fill_missing(
    df: &mut DataFrame,
    name: &str,
    values: Vec<Option<f64>>,
    value: f64,
) -> Result<()> {
    let filled = values
        .into_iter()
        .map(|v| Some(v.unwrap_or(value)))
        .collect();
    set_f64_column(df, name, filled)
}

fn add_presence_flag(df: &mut DataFrame, source: &str, flag: &str) -> Result<()> {
    let values = numeric_values(df, source)?;
    let flags = values.iter().map(|v| i32::from(v.is_some())).collect();
    set_i32_column(df, flag, flags)
}

fn parse_timestamp(raw: &str) -> Option<NaiveDateTime> {
    let raw = raw.trim();
    TIMESTAMP_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
}

fn add_date_parts(df: &mut DataFrame) -> Result<()> {
    let series = require_column(df, DATE_TIME)?.cast(&DataType::String)?;
    let strings = series.str()?;

    let mut parts: [Vec<i32>; 6] = Default::default();
    for (row, raw) in strings.into_iter().enumerate() {
        let ts = raw.and_then(parse_timestamp).ok_or_else(|| {
            RankError::TypeMismatch(format!(
                "unparsable {DATE_TIME} at row {row}: {:?}",
                raw.unwrap_or("<missing>")
            ))
        })?;
        let fields = [
            ts.month() as i32,
            ts.day() as i32,
            ts.hour() as i32,
            ts.minute() as i32,
            ts.weekday().num_days_from_monday() as i32,
            ((ts.month() - 1) / 3 + 1) as i32,
        ];
        for (part, field) in parts.iter_mut().zip(fields) {
            part.push(field);
        }
    }

    for (name, values) in DATE_PARTS.iter().zip(parts) {
        set_i32_column(df, name, values)?;
    }
    Ok(())
}

/// Non-zero becomes 1, zero stays 0. A missing value is not zero.
fn binarize_nonzero(df: &mut DataFrame, name: &str) -> Result<()> {
    let values = numeric_values(df, name)?;
    let binary = values
        .into_iter()
        .map(|v| i32::from(v != Some(0.0)))
        .collect();
    set_i32_column(df, name, binary)
}

/// The two most frequent values, count ties resolved by first appearance.
fn top_two(values: &[Option<f64>]) -> Vec<i64> {
    let mut counts: HashMap<i64, (usize, usize)> = HashMap::new();
    for (row, v) in values.iter().enumerate() {
        if let Some(v) = v {
            let entry = counts.entry(*v as i64).or_insert((0, row));
            entry.0 += 1;
        }
    }
    let mut ranked: Vec<(i64, (usize, usize))> = counts.into_iter().collect();
    ranked.sort_by(|a, b| b.1 .0.cmp(&a.1 .0).then(a.1 .1.cmp(&b.1 .1)));
    ranked.into_iter().take(2).map(|(id, _)| id).collect()
}

fn add_top_country_flag(df: &mut DataFrame) -> Result<()> {
    let values = numeric_values(df, VISITOR_COUNTRY_ID)?;
    let top = top_two(&values);
    debug!("Most frequent visitor countries: {:?}", top);
    let flags = values
        .iter()
        .map(|v| i32::from(v.is_some_and(|id| top.contains(&(id as i64)))))
        .collect();
    set_i32_column(df, TOP_COUNTRY, flags)
}

/// The numeric column most correlated (absolute Pearson) with `target`.
/// Exact ties go to the column that appears first.
pub fn best_support(df: &DataFrame, target: &str) -> Result<Option<(String, f64)>> {
    let target_values = numeric_values(df, target)?;
    let mut best: Option<(String, f64)> = None;

    for column in df.get_columns() {
        let name = column.name().as_str();
        if name == target || name == DATE_TIME {
            continue;
        }
        let dtype = column.dtype();
        if !(dtype.is_integer() || dtype.is_float()) {
            continue;
        }
        let values = numeric_values(df, name)?;
        let Some(r) = stats::pearson(&target_values, &values) else {
            continue;
        };
        let strength = r.abs();
        if best.as_ref().map_or(true, |(_, b)| strength > *b) {
            best = Some((name.to_string(), strength));
        }
    }

    Ok(best)
}

/// Fill every missing entry of the support column with one value drawn from
/// `[mean(target) - std(support), mean(target) + std(support))`.
fn impute_from_support<R: Rng + ?Sized>(
    df: &mut DataFrame,
    target: &str,
    rng: &mut R,
) -> Result<Option<SupportFill>> {
    let Some((support, correlation)) = best_support(df, target)? else {
        warn!("No numeric column correlates with '{}', imputation skipped", target);
        return Ok(None);
    };

    let target_values = numeric_values(df, target)?;
    let Some(center) = stats::mean(&target_values) else {
        warn!("Column '{}' is entirely missing, imputation skipped", target);
        return Ok(None);
    };

    let support_values = numeric_values(df, &support)?;
    let spread = stats::std_dev(&support_values)
        .filter(|s| s.is_finite() && *s > 0.0)
        .unwrap_or(0.0);

    let value = if is_integer_column(df, target)? {
        let low = (center - spread).floor() as i64;
        let high = (center + spread).floor() as i64;
        if high > low {
            rng.gen_range(low..high) as f64
        } else {
            low as f64
        }
    } else if spread > 0.0 {
        rng.gen_range(center - spread..center + spread)
    } else {
        center
    };

    let filled = support_values.iter().filter(|v| v.is_none()).count();
    if filled > 0 {
        fill_missing(df, &support, support_values, value)?;
    }

    debug!(
        "Imputed '{}' support '{}' (|r|={:.3}) with {:.4} in {} rows",
        target, support, correlation, value, filled
    );

    Ok(Some(SupportFill {
        target: target.to_string(),
        support,
        correlation,
        value,
        filled,
    }))
}

fn merge_competitor_rates(df: &mut DataFrame) -> Result<()> {
    let mut total = vec![0.0; df.height()];
    for i in 1..=N_COMPETITORS {
        let name = comp_rate_column(i);
        let values: Vec<f64> = numeric_values(df, &name)?
            .into_iter()
            .map(|v| v.unwrap_or(0.0))
            .collect();
        for (sum, v) in total.iter_mut().zip(&values) {
            *sum += v;
        }
        set_f64_column(df, &name, values.into_iter().map(Some).collect())?;
    }
    set_f64_column(df, COMP_RATE_SUM, total.into_iter().map(Some).collect())
}

/// Remap one inventory value: missing counts as 0 before remapping.
pub fn remap_inventory(value: Option<f64>) -> f64 {
    let mut v = value.unwrap_or(0.0);
    for (from, to) in INVENTORY_REMAP {
        if v == from {
            v = to;
        }
    }
    v
}

fn merge_competitor_inventory(df: &mut DataFrame) -> Result<()> {
    let mut total = vec![0.0; df.height()];
    for i in 1..=N_COMPETITORS {
        let name = comp_inv_column(i);
        let values: Vec<f64> = numeric_values(df, &name)?
            .into_iter()
            .map(remap_inventory)
            .collect();
        for (sum, v) in total.iter_mut().zip(&values) {
            *sum += v;
        }
        set_f64_column(df, &name, values.into_iter().map(Some).collect())?;
    }
    set_f64_column(df, COMP_INV_SUM, total.into_iter().map(Some).collect())
}

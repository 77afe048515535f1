//! Column statistics over nullable numeric data. Missing entries are skipped.

use polars::prelude::*;

fn column(values: &[Option<f64>]) -> Float64Chunked {
    Float64Chunked::from_slice_options(PlSmallStr::EMPTY, values)
}

pub fn mean(values: &[Option<f64>]) -> Option<f64> {
    column(values).mean()
}

/// Sample standard deviation (n - 1 denominator).
pub fn std_dev(values: &[Option<f64>]) -> Option<f64> {
    let ca = column(values);
    if ca.len() - ca.null_count() < 2 {
        return None;
    }
    ca.std(1)
}

pub fn median(values: &[Option<f64>]) -> Option<f64> {
    column(values).median()
}

/// Quantile with linear interpolation between the two nearest ranks.
pub fn quantile(values: &[Option<f64>], q: f64) -> Option<f64> {
    column(values)
        .quantile(q.clamp(0.0, 1.0), QuantileMethod::Linear)
        .ok()
        .flatten()
}

/// Pearson correlation over rows where both sides are present.
/// `None` when fewer than two pairs exist or either side is constant.
pub fn pearson(x: &[Option<f64>], y: &[Option<f64>]) -> Option<f64> {
    let pairs: Vec<(f64, f64)> = x
        .iter()
        .zip(y.iter())
        .filter_map(|(a, b)| Some(((*a)?, (*b)?)))
        .collect();
    if pairs.len() < 2 {
        return None;
    }
    let n = pairs.len() as f64;
    let mean_x = pairs.iter().map(|p| p.0).sum::<f64>() / n;
    let mean_y = pairs.iter().map(|p| p.1).sum::<f64>() / n;

    let mut cov = 0.0;
    let mut var_x = 0.0;
    let mut var_y = 0.0;
    for (a, b) in &pairs {
        let dx = a - mean_x;
        let dy = b - mean_y;
        cov += dx * dy;
        var_x += dx * dx;
        var_y += dy * dy;
    }
    if var_x <= 0.0 || var_y <= 0.0 {
        return None;
    }
    let r = cov / (var_x.sqrt() * var_y.sqrt());
    r.is_finite().then_some(r)
}

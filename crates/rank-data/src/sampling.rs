//! Row sampling: training-set pre-sampling and 1:1 class balancing.

use polars::prelude::DataFrame;
use rand::seq::SliceRandom;
use rand::Rng;
use rank_core::{Outcome, RankError, Result};
use tracing::{debug, info};

use crate::frame::{label_values, take_rows};

/// Draw `n` rows uniformly without replacement, kept in their original order.
/// Frames with at most `n` rows are returned whole.
pub fn sample_rows<R: Rng + ?Sized>(df: &DataFrame, n: usize, rng: &mut R) -> Result<DataFrame> {
    let height = df.height();
    if height <= n {
        return Ok(df.clone());
    }

    let mut rows: Vec<usize> = (0..height).collect();
    rows.shuffle(rng);
    rows.truncate(n);
    rows.sort_unstable();

    debug!("Sampled {} of {} rows", n, height);
    take_rows(df, &rows)
}

/// All rows with `outcome = 1` followed by as many rows drawn from the
/// `outcome = 0` rows.
///
/// Positives keep their original order; negatives appear in draw order.
pub fn balance<R: Rng + ?Sized>(df: &DataFrame, outcome: Outcome, rng: &mut R) -> Result<DataFrame> {
    let labels = label_values(df, outcome.column())?;

    let (positives, mut negatives): (Vec<usize>, Vec<usize>) =
        (0..labels.len()).partition(|&i| labels[i] == 1);
    let k = positives.len();

    if k == 0 {
        return Err(RankError::Fit(format!(
            "no positive '{}' rows to train on",
            outcome.column()
        )));
    }
    if negatives.len() < k {
        return Err(RankError::InsufficientData(format!(
            "'{}' has {} positives but only {} negatives",
            outcome.column(),
            k,
            negatives.len()
        )));
    }

    negatives.shuffle(rng);
    negatives.truncate(k);

    let rows: Vec<usize> = positives.into_iter().chain(negatives).collect();
    info!("Balanced {} subset: {} positives, {} rows", outcome, k, rows.len());
    take_rows(df, &rows)
}

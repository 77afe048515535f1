//! Combined booking/click scores and per-search ordering.

use std::collections::HashMap;

use polars::prelude::DataFrame;
use rank_core::{RankError, Result};
use rank_data::frame::{feature_matrix, id_values};
use rank_data::schema::{LISTING_ID, SEARCH_ID};
use tracing::info;

use crate::ensemble::VotingEnsemble;

/// Booking probability counts four times as much as click probability.
const BOOK_WEIGHT: f64 = 4.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoreEntry {
    pub search_id: i64,
    pub listing_id: i64,
    pub rank_score: f64,
}

/// Lower is better.
pub fn rank_score(p_book: f64, p_click: f64) -> f64 {
    -(BOOK_WEIGHT * p_book + p_click)
}

pub fn score_entries(
    search_ids: &[i64],
    listing_ids: &[i64],
    p_book: &[f64],
    p_click: &[f64],
) -> Vec<ScoreEntry> {
    search_ids
        .iter()
        .zip(listing_ids)
        .zip(p_book.iter().zip(p_click))
        .map(|((&search_id, &listing_id), (&b, &c))| ScoreEntry {
            search_id,
            listing_id,
            rank_score: rank_score(b, c),
        })
        .collect()
}

/// Group entries by search id in order of first appearance, then sort each
/// group by ascending score. Equal scores keep their input order.
pub fn rank_entries(entries: &[ScoreEntry]) -> Vec<(i64, i64)> {
    let mut order: Vec<i64> = Vec::new();
    let mut groups: HashMap<i64, Vec<ScoreEntry>> = HashMap::new();
    for entry in entries {
        groups
            .entry(entry.search_id)
            .or_insert_with(|| {
                order.push(entry.search_id);
                Vec::new()
            })
            .push(*entry);
    }

    let mut ranked = Vec::with_capacity(entries.len());
    for search_id in order {
        if let Some(mut group) = groups.remove(&search_id) {
            group.sort_by(|a, b| a.rank_score.total_cmp(&b.rank_score));
            ranked.extend(group.into_iter().map(|e| (e.search_id, e.listing_id)));
        }
    }
    ranked
}

/// Score every row of an enriched frame with both models and order listings
/// within each search.
pub fn score_and_rank(
    df: &DataFrame,
    features: &[String],
    click_model: &VotingEnsemble,
    book_model: &VotingEnsemble,
) -> Result<Vec<(i64, i64)>> {
    for model in [click_model, book_model] {
        if model.feature_names() != features {
            return Err(RankError::Schema(format!(
                "{} model was trained on {} features that differ from the {} selected now",
                model.outcome(),
                model.feature_names().len(),
                features.len()
            )));
        }
    }

    let x = feature_matrix(df, features)?;
    let p_click = click_model.predict_proba(x.view())?;
    let p_book = book_model.predict_proba(x.view())?;

    let search_ids = id_values(df, SEARCH_ID)?;
    let listing_ids = id_values(df, LISTING_ID)?;
    let entries = score_entries(&search_ids, &listing_ids, &p_book.to_vec(), &p_click.to_vec());

    let ranked = rank_entries(&entries);
    info!("Ranked {} listings across searches", ranked.len());
    Ok(ranked)
}

// Synthetic raw frames for unit tests

use polars::prelude::*;

use crate::schema::*;

fn gappy(n: usize, every: usize, f: impl Fn(usize) -> f64) -> Vec<Option<f64>> {
    (0..n)
        .map(|i| if i % every == every - 1 { None } else { Some(f(i)) })
        .collect()
}

/// A raw frame shaped like the search/listing export: `n` rows, four rows per
/// search, missing values sprinkled through the imputed columns.
pub(crate) fn raw_frame(n: usize, labelled: bool) -> DataFrame {
    let mut columns = vec![
        Column::new(SEARCH_ID.into(), (0..n).map(|i| (i / 4) as i64 + 1).collect::<Vec<_>>()),
        Column::new(
            DATE_TIME.into(),
            (0..n)
                .map(|i| format!("2013-0{}-{:02} {:02}:{:02}:00", 1 + i % 9, 1 + i % 28, i % 24, i % 60))
                .collect::<Vec<_>>(),
        ),
        Column::new(SITE_ID.into(), (0..n).map(|i| (i % 3) as i64 + 5).collect::<Vec<_>>()),
        Column::new(
            VISITOR_COUNTRY_ID.into(),
            (0..n).map(|i| [219i64, 100, 219, 55][i % 4]).collect::<Vec<_>>(),
        ),
        Column::new(VISITOR_STARRATING.into(), gappy(n, 3, |i| 2.0 + (i % 3) as f64)),
        Column::new(VISITOR_ADR.into(), gappy(n, 2, |i| 90.0 + i as f64)),
        Column::new(PROP_COUNTRY_ID.into(), (0..n).map(|i| (i % 2) as i64 + 200).collect::<Vec<_>>()),
        Column::new(LISTING_ID.into(), (0..n).map(|i| 1000 + i as i64).collect::<Vec<_>>()),
        Column::new("prop_starrating".into(), (0..n).map(|i| (i % 5) as i64).collect::<Vec<_>>()),
        Column::new(REVIEW_SCORE.into(), gappy(n, 5, |i| 2.5 + (i % 4) as f64 * 0.5)),
        Column::new("prop_location_score1".into(), (0..n).map(|i| 1.0 + (i % 7) as f64 * 0.3).collect::<Vec<_>>()),
        Column::new(LOCATION_SCORE2.into(), gappy(n, 4, |i| 0.01 * (i % 9) as f64)),
        Column::new(HISTORICAL_PRICE.into(), gappy(n, 6, |i| if i % 5 == 0 { 0.0 } else { 4.5 + (i % 3) as f64 * 0.1 })),
        Column::new("price_usd".into(), (0..n).map(|i| 80.0 + (i * 13 % 50) as f64).collect::<Vec<_>>()),
        Column::new(DESTINATION_ID.into(), (0..n).map(|i| 8000 + (i % 5) as i64).collect::<Vec<_>>()),
        Column::new(AFFINITY_SCORE.into(), gappy(n, 3, |i| -20.0 + i as f64 * 0.7)),
        Column::new(DISTANCE.into(), gappy(n, 4, |i| 100.0 + (i * 37 % 400) as f64)),
    ];

    for c in 1..=N_COMPETITORS {
        columns.push(Column::new(
            comp_rate_column(c).into(),
            gappy(n, 2 + c % 3, |i| ((i + c) % 3) as f64 - 1.0),
        ));
        columns.push(Column::new(
            comp_inv_column(c).into(),
            gappy(n, 3, |i| ((i * c) % 3) as f64 - 1.0),
        ));
        columns.push(Column::new(
            comp_diff_column(c).into(),
            gappy(n, 2, |i| 5.0 + (i % 11) as f64),
        ));
    }

    if labelled {
        let booked: Vec<i64> = (0..n).map(|i| i64::from(i % 4 == 0)).collect();
        let clicked: Vec<i64> = (0..n).map(|i| i64::from(i % 4 == 0 || i % 3 == 0)).collect();
        columns.push(Column::new(POSITION.into(), (0..n).map(|i| (i % 4) as i64 + 1).collect::<Vec<_>>()));
        columns.push(Column::new(CLICKED.into(), clicked));
        columns.push(Column::new(
            GROSS_BOOKINGS.into(),
            booked.iter().map(|&b| (b == 1).then_some(150.0)).collect::<Vec<_>>(),
        ));
        columns.push(Column::new(BOOKED.into(), booked));
    }

    DataFrame::new(columns).unwrap()
}

//! Column vocabulary of the search/listing dataset.

use polars::prelude::DataFrame;

pub const SEARCH_ID: &str = "srch_id";
pub const LISTING_ID: &str = "prop_id";
pub const DATE_TIME: &str = "date_time";

pub const SITE_ID: &str = "site_id";
pub const VISITOR_COUNTRY_ID: &str = "visitor_location_country_id";
pub const PROP_COUNTRY_ID: &str = "prop_country_id";
pub const DESTINATION_ID: &str = "srch_destination_id";
pub const VISITOR_STARRATING: &str = "visitor_hist_starrating";
pub const VISITOR_ADR: &str = "visitor_hist_adr_usd";

pub const REVIEW_SCORE: &str = "prop_review_score";
pub const LOCATION_SCORE2: &str = "prop_location_score2";
pub const HISTORICAL_PRICE: &str = "prop_log_historical_price";
pub const AFFINITY_SCORE: &str = "srch_query_affinity_score";
pub const DISTANCE: &str = "orig_destination_distance";

pub const POSITION: &str = "position";
pub const GROSS_BOOKINGS: &str = "gross_bookings_usd";
pub const CLICKED: &str = "click_bool";
pub const BOOKED: &str = "booking_bool";

pub const STARRATING_PRESENT: &str = "visitor_hist_starrating_bool";
pub const TOP_COUNTRY: &str = "visitor_location_country_bool";
pub const COMP_RATE_SUM: &str = "comp_rate_sum";
pub const COMP_INV_SUM: &str = "comp_inv_sum";
pub const DATE_PARTS: [&str; 6] = ["month", "day", "hour", "minute", "dayofweek", "quarter"];

pub const N_COMPETITORS: usize = 8;

/// Identifier columns that are never model inputs.
pub const EXCLUDED_IDENTIFIERS: [&str; 6] = [
    DATE_TIME,
    SITE_ID,
    VISITOR_COUNTRY_ID,
    PROP_COUNTRY_ID,
    DESTINATION_ID,
    VISITOR_STARRATING,
];

pub fn comp_rate_column(i: usize) -> String {
    format!("comp{i}_rate")
}

pub fn comp_inv_column(i: usize) -> String {
    format!("comp{i}_inv")
}

pub fn comp_diff_column(i: usize) -> String {
    format!("comp{i}_rate_percent_diff")
}

/// The 24 raw competitor columns, competitor by competitor.
pub fn competitor_columns() -> Vec<String> {
    (1..=N_COMPETITORS)
        .flat_map(|i| [comp_rate_column(i), comp_inv_column(i), comp_diff_column(i)])
        .collect()
}

/// Every column the feature transformer adds.
pub fn derived_columns() -> Vec<&'static str> {
    let mut out = vec![STARRATING_PRESENT];
    out.extend(DATE_PARTS);
    out.extend([TOP_COUNTRY, COMP_RATE_SUM, COMP_INV_SUM]);
    out
}

/// Train-only columns a dataset may declare.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OptionalColumn {
    Position,
    GrossBookings,
    Clicked,
    Booked,
}

impl OptionalColumn {
    pub const ALL: [OptionalColumn; 4] = [
        OptionalColumn::Position,
        OptionalColumn::GrossBookings,
        OptionalColumn::Clicked,
        OptionalColumn::Booked,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            OptionalColumn::Position => POSITION,
            OptionalColumn::GrossBookings => GROSS_BOOKINGS,
            OptionalColumn::Clicked => CLICKED,
            OptionalColumn::Booked => BOOKED,
        }
    }
}

/// Declared capabilities of a dataset: which train-only columns it carries.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DatasetSchema {
    optional: Vec<OptionalColumn>,
}

impl DatasetSchema {
    /// Schema of an inference dataset: no train-only columns.
    pub fn inference() -> Self {
        Self::default()
    }

    /// Schema of a labelled dataset carrying every train-only column.
    pub fn training() -> Self {
        Self {
            optional: OptionalColumn::ALL.to_vec(),
        }
    }

    pub fn of(df: &DataFrame) -> Self {
        let names = df.get_column_names();
        let optional = OptionalColumn::ALL
            .into_iter()
            .filter(|col| names.iter().any(|n| n.as_str() == col.name()))
            .collect();
        Self { optional }
    }

    pub fn has(&self, column: OptionalColumn) -> bool {
        self.optional.contains(&column)
    }

    pub fn optional_columns(&self) -> &[OptionalColumn] {
        &self.optional
    }

    pub fn is_labelled(&self) -> bool {
        self.has(OptionalColumn::Clicked) && self.has(OptionalColumn::Booked)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use polars::prelude::*;

    #[test]
    fn test_competitor_columns() {
        let cols = competitor_columns();
        assert_eq!(cols.len(), 24);
        assert_eq!(cols[0], "comp1_rate");
        assert_eq!(cols[1], "comp1_inv");
        assert_eq!(cols[2], "comp1_rate_percent_diff");
        assert_eq!(cols[23], "comp8_rate_percent_diff");
    }

    #[test]
    fn test_schema_detection() {
        let df = df!(
            "srch_id" => &[1i64, 1],
            "click_bool" => &[0i64, 1],
            "position" => &[1i64, 2],
        )
        .unwrap();
        let schema = DatasetSchema::of(&df);
        assert!(schema.has(OptionalColumn::Clicked));
        assert!(schema.has(OptionalColumn::Position));
        assert!(!schema.has(OptionalColumn::Booked));
        assert!(!schema.is_labelled());
        assert_eq!(DatasetSchema::inference().optional_columns().len(), 0);
    }
}

use serde::{Deserialize, Serialize};
use std::fmt;

/// Binary outcome a model is trained for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    Book,
    Click,
}

impl Outcome {
    /// Booking first: the training run fits the booking model before the click model.
    pub const ALL: [Outcome; 2] = [Outcome::Book, Outcome::Click];

    /// Label column holding this outcome in training data.
    pub fn column(&self) -> &'static str {
        match self {
            Outcome::Book => "booking_bool",
            Outcome::Click => "click_bool",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Outcome::Book => "Booking",
            Outcome::Click => "Click",
        }
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

/// Which input file a dataset comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DatasetKind {
    Train,
    Test,
}

impl fmt::Display for DatasetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DatasetKind::Train => f.write_str("train"),
            DatasetKind::Test => f.write_str("test"),
        }
    }
}

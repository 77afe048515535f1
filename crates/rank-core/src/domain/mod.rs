pub mod errors;
pub mod outcome;

pub use errors::{RankError, Result};
pub use outcome::{DatasetKind, Outcome};

pub mod config;
pub mod domain;
pub mod logging;
pub mod storage;

pub use config::Settings;
pub use domain::{DatasetKind, Outcome, RankError, Result};
pub use storage::ModelStore;

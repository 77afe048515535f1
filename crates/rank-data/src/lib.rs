//! Dataset handling for the hotel ranking pipeline: schema, loading, feature
//! engineering, feature selection and class balancing.

pub mod frame;
pub mod io;
pub mod sampling;
pub mod schema;
pub mod select;
pub mod stats;
pub mod transform;

#[cfg(test)]
mod testing;

pub use io::{load_dataset, write_ranking};
pub use sampling::{balance, sample_rows};
pub use schema::{DatasetSchema, OptionalColumn};
pub use select::select_features;
pub use transform::{FeatureTransformer, TransformSummary};

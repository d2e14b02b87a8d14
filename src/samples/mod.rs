//! Example-article corpus loaded once at startup.

mod store;
mod types;

pub use store::{SampleStats, SampleStore, SampleStoreError};
pub use types::Sample;

//! The three pipeline stages: extract, transform, load.
//!
//! Extraction fans out over source keys with per-key retries and tolerates
//! individual failures; transformation is a pure, order-preserving mapping;
//! loading is one bulk upsert through the storage collaborator.

pub mod extract;
pub mod load;
pub mod transform;

pub use extract::Extractor;
pub use load::Loader;
pub use transform::{transform, transform_many};

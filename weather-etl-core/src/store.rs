use async_trait::async_trait;

use crate::error::StoreError;
use crate::model::{QueryOptions, WeatherRecord};

pub mod sqlite;

pub use sqlite::SqliteStore;

/// Storage collaborator for canonical records.
///
/// The loader and the query cache depend only on this contract, not on a
/// specific engine. `upsert` is keyed by `id` (last-write-wins) and
/// `find_data` does a substring match on the location name with
/// offset/limit pagination.
#[async_trait]
pub trait Store: Send + Sync {
    async fn upsert(&self, records: &[WeatherRecord]) -> Result<(), StoreError>;

    async fn find_data(&self, options: &QueryOptions) -> Result<Vec<WeatherRecord>, StoreError>;
}

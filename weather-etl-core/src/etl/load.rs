use std::sync::Arc;
use tracing::info;

use crate::error::LoadError;
use crate::model::WeatherRecord;
use crate::store::Store;

/// Bulk-persists canonical records through the storage collaborator.
///
/// One upsert per batch; the first storage failure is surfaced and nothing
/// is silently dropped. Upsert semantics make `load` idempotent.
#[derive(Clone)]
pub struct Loader {
    store: Arc<dyn Store>,
}

impl Loader {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    pub async fn load(&self, records: &[WeatherRecord]) -> Result<(), LoadError> {
        self.store
            .upsert(records)
            .await
            .map_err(|cause| LoadError { count: records.len(), cause })?;

        info!(count = records.len(), "loaded records into storage");
        Ok(())
    }
}

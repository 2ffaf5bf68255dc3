//! Pipeline composition and the periodic trigger.
//!
//! One trigger runs extract -> transform -> load once. Triggers arriving
//! while a run is in flight are skipped, never queued: the next tick is
//! always imminent, so there is nothing to backlog.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::time::MissedTickBehavior;
use tracing::{error, info, warn};

use crate::error::PipelineError;
use crate::etl::{Extractor, Loader, transform_many};

/// Outcome of one completed pipeline run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunReport {
    /// Source keys requested this run.
    pub requested: usize,
    /// Raw payloads that survived extraction.
    pub extracted: usize,
    /// Records written to storage.
    pub loaded: usize,
}

/// One extract-transform-load pass over the configured source keys.
pub struct Pipeline {
    extractor: Extractor,
    loader: Loader,
    source_keys: Vec<String>,
}

impl Pipeline {
    pub fn new(extractor: Extractor, loader: Loader, source_keys: Vec<String>) -> Self {
        Self { extractor, loader, source_keys }
    }

    /// Run the pipeline once.
    ///
    /// Per-key extraction failures and malformed payloads are logged and
    /// skipped; only a load failure aborts the run.
    pub async fn run(&self) -> Result<RunReport, PipelineError> {
        let raws = self.extractor.extract_many(&self.source_keys).await;
        let extracted = raws.len();

        let mut records = Vec::with_capacity(extracted);
        for result in transform_many(&raws) {
            match result {
                Ok(record) => records.push(record),
                Err(err) => warn!(error = %err, "skipping malformed payload"),
            }
        }

        self.loader.load(&records).await?;

        Ok(RunReport { requested: self.source_keys.len(), extracted, loaded: records.len() })
    }
}

/// Drives the pipeline on a fixed cadence with a re-entrancy guard.
///
/// The guard is a single Idle/Running flag: a trigger that finds the flag
/// already set is dropped. Run *N+1* therefore never starts while run *N*
/// is still in flight.
#[derive(Clone)]
pub struct Scheduler {
    pipeline: Arc<Pipeline>,
    running: Arc<AtomicBool>,
}

impl Scheduler {
    pub fn new(pipeline: Arc<Pipeline>) -> Self {
        Self { pipeline, running: Arc::new(AtomicBool::new(false)) }
    }

    /// Handle one trigger. Returns `false` when the trigger was skipped
    /// because a run was already in flight.
    pub async fn try_run(&self) -> bool {
        if self.running.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire).is_err()
        {
            info!("pipeline run already in flight, skipping trigger");
            return false;
        }

        info!("pipeline run started");
        match self.pipeline.run().await {
            Ok(report) => info!(
                requested = report.requested,
                extracted = report.extracted,
                loaded = report.loaded,
                "pipeline run completed"
            ),
            // The run is aborted; the next trigger starts clean.
            Err(err) => error!(error = %err, "pipeline run failed"),
        }

        self.running.store(false, Ordering::Release);
        true
    }

    /// Trigger the pipeline on every tick of the given interval, forever.
    pub async fn run_forever(&self, every: Duration) {
        let mut interval = tokio::time::interval(every);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            interval.tick().await;
            self.try_run().await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RetrySettings;
    use crate::model::RawObservation;
    use crate::provider::WeatherProvider;
    use crate::store::{SqliteStore, Store};
    use anyhow::anyhow;
    use async_trait::async_trait;

    #[derive(Debug)]
    struct SlowProvider;

    #[async_trait]
    impl WeatherProvider for SlowProvider {
        async fn fetch_current(&self, location: &str) -> anyhow::Result<RawObservation> {
            tokio::time::sleep(Duration::from_secs(30)).await;
            Err(anyhow!("never reached for {location}"))
        }
    }

    fn pipeline(provider: Arc<dyn WeatherProvider>, store: Arc<dyn Store>) -> Pipeline {
        let retry = RetrySettings { max_retries: 0, initial_delay_ms: 1 };
        Pipeline::new(
            Extractor::new(provider, retry),
            Loader::new(store),
            vec!["London".to_string()],
        )
    }

    #[tokio::test(start_paused = true)]
    async fn overlapping_trigger_is_skipped() {
        let store = Arc::new(SqliteStore::in_memory().expect("in-memory store"));
        let scheduler = Scheduler::new(Arc::new(pipeline(Arc::new(SlowProvider), store)));

        let first = {
            let scheduler = scheduler.clone();
            tokio::spawn(async move { scheduler.try_run().await })
        };
        // Let the first run reach its network wait before triggering again.
        tokio::time::sleep(Duration::from_secs(1)).await;

        assert!(!scheduler.try_run().await);
        assert!(first.await.expect("task should not panic"));
    }

    #[tokio::test(start_paused = true)]
    async fn scheduler_is_idle_again_after_a_run() {
        let store = Arc::new(SqliteStore::in_memory().expect("in-memory store"));
        let scheduler = Scheduler::new(Arc::new(pipeline(Arc::new(SlowProvider), store)));

        assert!(scheduler.try_run().await);
        assert!(scheduler.try_run().await);
    }
}

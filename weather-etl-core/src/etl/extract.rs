use futures::future::join_all;
use std::sync::Arc;
use tracing::{error, warn};

use crate::config::RetrySettings;
use crate::error::ExtractError;
use crate::model::RawObservation;
use crate::provider::WeatherProvider;

/// Fetches raw observations from the provider, one call per source key,
/// with exponential backoff on failure.
#[derive(Clone)]
pub struct Extractor {
    provider: Arc<dyn WeatherProvider>,
    retry: RetrySettings,
}

impl Extractor {
    pub fn new(provider: Arc<dyn WeatherProvider>, retry: RetrySettings) -> Self {
        Self { provider, retry }
    }

    /// Fetch one source key, retrying with doubling delays.
    ///
    /// With `max_retries = 3` this makes up to 4 attempts; on exhaustion the
    /// last provider error is returned inside [`ExtractError`].
    pub async fn extract_one(&self, source_key: &str) -> Result<RawObservation, ExtractError> {
        let mut delay = self.retry.initial_delay();
        let mut attempt: u32 = 1;

        loop {
            match self.provider.fetch_current(source_key).await {
                Ok(raw) => return Ok(raw),
                Err(cause) => {
                    if attempt > self.retry.max_retries {
                        return Err(ExtractError {
                            source_key: source_key.to_string(),
                            attempts: attempt,
                            cause,
                        });
                    }
                    warn!(
                        source_key,
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        error = %cause,
                        "extraction attempt failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                    delay *= 2;
                    attempt += 1;
                }
            }
        }
    }

    /// Fetch all source keys concurrently, dropping the ones that fail.
    ///
    /// Each key gets its own task and its own retry budget; one key's
    /// backoff never delays another. Failures are logged and omitted from
    /// the output, so this never fails as a whole. Successful payloads come
    /// back in input order.
    pub async fn extract_many(&self, source_keys: &[String]) -> Vec<RawObservation> {
        let tasks = source_keys.iter().map(|key| async move {
            match self.extract_one(key).await {
                Ok(raw) => Some(raw),
                Err(err) => {
                    error!(source_key = %key, error = %err, "dropping source key from this run");
                    None
                }
            }
        });

        join_all(tasks).await.into_iter().flatten().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::anyhow;
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use std::collections::HashMap;
    use std::time::Duration;
    use tokio::time::Instant;

    /// Provider that fails a configured number of times per key before
    /// succeeding, recording every call.
    #[derive(Debug)]
    struct FlakyProvider {
        failures_before_success: HashMap<String, u32>,
        calls: Mutex<Vec<String>>,
    }

    impl FlakyProvider {
        fn failing(key: &str, failures: u32) -> Self {
            let mut map = HashMap::new();
            map.insert(key.to_string(), failures);
            Self { failures_before_success: map, calls: Mutex::new(Vec::new()) }
        }

        fn calls_for(&self, key: &str) -> usize {
            self.calls.lock().iter().filter(|k| k.as_str() == key).count()
        }
    }

    #[async_trait]
    impl WeatherProvider for FlakyProvider {
        async fn fetch_current(&self, location: &str) -> anyhow::Result<RawObservation> {
            let prior_calls = {
                let mut calls = self.calls.lock();
                calls.push(location.to_string());
                calls.iter().filter(|k| k.as_str() == location).count() as u32 - 1
            };

            let budget = self.failures_before_success.get(location).copied().unwrap_or(0);
            if prior_calls < budget {
                return Err(anyhow!("provider unavailable for {location}"));
            }

            Ok(payload(location))
        }
    }

    fn payload(location: &str) -> RawObservation {
        serde_json::from_str(&format!(
            r#"{{
                "id": 1,
                "name": "{location}",
                "dt": 1700000000,
                "main": {{ "temp": 10.0, "humidity": 80 }},
                "weather": [{{ "description": "clear sky" }}]
            }}"#
        ))
        .expect("test payload should parse")
    }

    fn retry_settings() -> RetrySettings {
        RetrySettings { max_retries: 3, initial_delay_ms: 500 }
    }

    #[tokio::test(start_paused = true)]
    async fn succeeds_after_two_retries_with_doubling_delays() {
        let provider = Arc::new(FlakyProvider::failing("London", 2));
        let extractor = Extractor::new(provider.clone(), retry_settings());

        let started = Instant::now();
        let raw = extractor.extract_one("London").await.expect("third attempt should succeed");

        assert_eq!(raw.name.as_deref(), Some("London"));
        assert_eq!(provider.calls_for("London"), 3);
        // Two backoffs at d and 2d: 500ms + 1000ms.
        assert_eq!(started.elapsed(), Duration::from_millis(1500));
    }

    #[tokio::test(start_paused = true)]
    async fn exhausted_retries_surface_the_last_error() {
        let provider = Arc::new(FlakyProvider::failing("London", 100));
        let extractor = Extractor::new(provider.clone(), retry_settings());

        let err = extractor.extract_one("London").await.unwrap_err();

        assert_eq!(err.source_key, "London");
        assert_eq!(err.attempts, 4);
        assert_eq!(provider.calls_for("London"), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn extract_many_drops_failing_keys() {
        let provider = Arc::new(FlakyProvider::failing("B", 100));
        let extractor = Extractor::new(provider, retry_settings());

        let keys: Vec<String> = ["A", "B", "C"].iter().map(|s| s.to_string()).collect();
        let raws = extractor.extract_many(&keys).await;

        let names: Vec<_> = raws.iter().filter_map(|r| r.name.as_deref()).collect();
        assert_eq!(names, vec!["A", "C"]);
    }

    #[tokio::test(start_paused = true)]
    async fn one_keys_backoff_does_not_delay_others() {
        let provider = Arc::new(FlakyProvider::failing("B", 100));
        let extractor = Extractor::new(provider, retry_settings());

        let keys: Vec<String> = ["A", "B", "C"].iter().map(|s| s.to_string()).collect();
        let started = Instant::now();
        let raws = extractor.extract_many(&keys).await;

        assert_eq!(raws.len(), 2);
        // The join waits only for B's own budget (500 + 1000 + 2000 ms),
        // not for a serialized sum across keys.
        assert_eq!(started.elapsed(), Duration::from_millis(3500));
    }
}

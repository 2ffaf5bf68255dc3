use crate::model::RawObservation;
use async_trait::async_trait;
use std::fmt::Debug;

pub mod openweather;

pub use openweather::OpenWeatherProvider;

/// Abstraction over the external weather API.
///
/// One call fetches the current conditions for one source key (a location
/// name). The extractor owns retries; implementations only need to surface
/// a single attempt's outcome, with a bounded per-call timeout.
#[async_trait]
pub trait WeatherProvider: Send + Sync + Debug {
    async fn fetch_current(&self, location: &str) -> anyhow::Result<RawObservation>;
}

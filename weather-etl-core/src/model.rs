use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One normalized observation, the unit of storage and transfer.
///
/// Constructed once by the transformer and immutable afterwards; persisted
/// by upsert on `id`, so re-ingesting the same `id` overwrites prior fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherRecord {
    /// Provider-assigned identifier of the observed location.
    pub id: String,
    /// Human-readable location label.
    pub location_name: String,
    /// Temperature in Celsius as reported by the provider.
    pub temperature_c: f64,
    /// Temperature in Fahrenheit, derived from Celsius at transform time.
    pub temperature_f: f64,
    /// Relative humidity percentage, passed through unvalidated.
    pub humidity_pct: i64,
    /// Free-text condition summary, `"No description"` when absent.
    pub condition: String,
    /// When the provider captured the observation (not ingestion time).
    pub observed_at: DateTime<Utc>,
}

/// Raw OpenWeather current-conditions payload, scoped to one extraction.
///
/// Fields are optional so that the transformer, not the deserializer,
/// decides which ones are required. Never persisted; discarded after
/// transformation.
#[derive(Debug, Clone, Deserialize)]
pub struct RawObservation {
    pub id: Option<i64>,
    pub name: Option<String>,
    pub dt: Option<i64>,
    pub main: Option<RawMain>,
    #[serde(default)]
    pub weather: Vec<RawWeather>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawMain {
    pub temp: Option<f64>,
    pub humidity: Option<i64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawWeather {
    pub description: String,
}

/// Filter and pagination parameters for the read path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryOptions {
    /// Substring match on the location name.
    pub filter: Option<String>,
    /// 1-based page number.
    pub page: u32,
    /// Records per page.
    pub limit: u32,
}

impl Default for QueryOptions {
    fn default() -> Self {
        Self { filter: None, page: 1, limit: 10 }
    }
}

impl QueryOptions {
    /// Row offset implied by `page` and `limit`.
    pub fn offset(&self) -> u32 {
        self.page.saturating_sub(1).saturating_mul(self.limit)
    }
}

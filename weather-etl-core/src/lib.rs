//! Core library for the weather ETL service.
//!
//! This crate defines:
//! - The extract-transform-load pipeline and its interval scheduler
//! - The canonical record model and error taxonomy
//! - Abstractions over the weather provider and the record store
//! - The TTL-bounded query cache in front of the read path
//!
//! It is used by `weather-etl-cli`, but can also be reused by other
//! binaries or services.

pub mod cache;
pub mod config;
pub mod error;
pub mod etl;
pub mod model;
pub mod provider;
pub mod scheduler;
pub mod store;

pub use cache::{Clock, QueryCache, SystemClock};
pub use config::{Config, RetrySettings};
pub use error::{ExtractError, LoadError, PipelineError, StoreError, TransformError};
pub use etl::{Extractor, Loader, transform, transform_many};
pub use model::{QueryOptions, RawObservation, WeatherRecord};
pub use provider::{OpenWeatherProvider, WeatherProvider};
pub use scheduler::{Pipeline, RunReport, Scheduler};
pub use store::{SqliteStore, Store};

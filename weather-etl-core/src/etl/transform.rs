use chrono::{DateTime, Utc};

use crate::error::TransformError;
use crate::model::{RawObservation, WeatherRecord};

/// Condition text used when the payload carries no description.
const NO_DESCRIPTION: &str = "No description";

/// Map one raw payload to one canonical record. Pure: no I/O, no state.
///
/// Required fields are the identifier, the location name, the Celsius
/// temperature and the observation epoch; everything else gets a safe
/// default. Fahrenheit is always derived here (`F = C * 9/5 + 32`), never
/// taken from the source. Humidity is passed through unvalidated.
pub fn transform(raw: &RawObservation) -> Result<WeatherRecord, TransformError> {
    let id = raw.id.ok_or(TransformError::MissingField("id"))?;
    let name = raw.name.as_ref().ok_or(TransformError::MissingField("name"))?;
    let dt = raw.dt.ok_or(TransformError::MissingField("dt"))?;
    let main = raw.main.as_ref().ok_or(TransformError::MissingField("main"))?;
    let temperature_c = main.temp.ok_or(TransformError::MissingField("main.temp"))?;

    let observed_at =
        DateTime::<Utc>::from_timestamp(dt, 0).ok_or(TransformError::MissingField("dt"))?;

    let condition = raw
        .weather
        .first()
        .map(|w| w.description.clone())
        .unwrap_or_else(|| NO_DESCRIPTION.to_string());

    Ok(WeatherRecord {
        id: id.to_string(),
        location_name: name.clone(),
        temperature_c,
        temperature_f: temperature_c * 9.0 / 5.0 + 32.0,
        humidity_pct: main.humidity.unwrap_or(0),
        condition,
        observed_at,
    })
}

/// Element-wise [`transform`], preserving input order exactly.
///
/// The caller decides the failure policy; the pipeline skips and logs
/// malformed payloads rather than aborting the run.
pub fn transform_many(raws: &[RawObservation]) -> Vec<Result<WeatherRecord, TransformError>> {
    raws.iter().map(transform).collect()
}

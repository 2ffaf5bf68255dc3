use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;

use crate::model::RawObservation;

use super::WeatherProvider;

const DEFAULT_BASE_URL: &str = "https://api.openweathermap.org/data/2.5";

/// Per-call network timeout; the only cancellation budget on the wire.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Clone)]
pub struct OpenWeatherProvider {
    api_key: String,
    base_url: String,
    http: Client,
}

impl OpenWeatherProvider {
    pub fn new(api_key: String) -> Self {
        Self::with_base_url(api_key, DEFAULT_BASE_URL.to_string())
    }

    /// Point the provider at a different endpoint, e.g. a mock server.
    pub fn with_base_url(api_key: String, base_url: String) -> Self {
        let http = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .unwrap_or_else(|_| Client::new());

        Self { api_key, base_url, http }
    }
}

#[async_trait]
impl WeatherProvider for OpenWeatherProvider {
    async fn fetch_current(&self, location: &str) -> Result<RawObservation> {
        let url = format!("{}/weather", self.base_url);

        let res = self
            .http
            .get(&url)
            .query(&[
                ("q", location),
                ("appid", self.api_key.as_str()),
                ("units", "metric"),
            ])
            .send()
            .await
            .context("Failed to send request to OpenWeather (current weather)")?;

        let status = res.status();
        let body = res
            .text()
            .await
            .context("Failed to read OpenWeather current response body")?;

        if !status.is_success() {
            return Err(anyhow!(
                "OpenWeather current request failed with status {}: {}",
                status,
                truncate_body(&body),
            ));
        }

        let parsed: RawObservation =
            serde_json::from_str(&body).context("Failed to parse OpenWeather current JSON")?;

        Ok(parsed)
    }
}

fn truncate_body(body: &str) -> String {
    const MAX: usize = 200;
    if body.len() > MAX {
        // Walk back to a char boundary so multi-byte text cannot panic.
        let mut end = MAX;
        while !body.is_char_boundary(end) {
            end -= 1;
        }
        format!("{}...", &body[..end])
    } else {
        body.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn fetch_current_parses_payload() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/weather"))
            .and(query_param("q", "London"))
            .and(query_param("units", "metric"))
            .respond_with(ResponseTemplate::new(200).set_body_raw(
                r#"{
                    "id": 2643743,
                    "name": "London",
                    "dt": 1700000000,
                    "main": { "temp": 10.0, "humidity": 80 },
                    "weather": [{ "description": "light rain" }]
                }"#,
                "application/json",
            ))
            .mount(&server)
            .await;

        let provider = OpenWeatherProvider::with_base_url("KEY".into(), server.uri());
        let raw = provider.fetch_current("London").await.expect("fetch should succeed");

        assert_eq!(raw.id, Some(2_643_743));
        assert_eq!(raw.name.as_deref(), Some("London"));
    }

    #[test]
    fn truncate_body_respects_char_boundaries() {
        // A two-byte char straddling the 200-byte cut point.
        let body = format!("{}°{}", "a".repeat(199), "b".repeat(50));
        assert!(!body.is_char_boundary(200));

        let truncated = truncate_body(&body);
        assert_eq!(truncated, format!("{}...", "a".repeat(199)));

        let short = "short body";
        assert_eq!(truncate_body(short), short);
    }

    #[tokio::test]
    async fn long_non_ascii_error_body_is_truncated_not_panicked() {
        let server = MockServer::start().await;

        let message = "Ключ недействителен ".repeat(20);
        Mock::given(method("GET"))
            .and(path("/weather"))
            .respond_with(ResponseTemplate::new(401).set_body_raw(
                format!(r#"{{"cod":401,"message":"{message}"}}"#),
                "application/json",
            ))
            .mount(&server)
            .await;

        let provider = OpenWeatherProvider::with_base_url("BAD".into(), server.uri());
        let err = provider.fetch_current("London").await.unwrap_err();

        let msg = err.to_string();
        assert!(msg.contains("401"));
        assert!(msg.ends_with("..."));
    }

    #[tokio::test]
    async fn fetch_current_surfaces_api_errors() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/weather"))
            .respond_with(
                ResponseTemplate::new(401)
                    .set_body_raw(r#"{"cod":401,"message":"Invalid API key"}"#, "application/json"),
            )
            .mount(&server)
            .await;

        let provider = OpenWeatherProvider::with_base_url("BAD".into(), server.uri());
        let err = provider.fetch_current("London").await.unwrap_err();

        let msg = err.to_string();
        assert!(msg.contains("401"));
        assert!(msg.contains("Invalid API key"));
    }
}

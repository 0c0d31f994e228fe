//! FRED API integration.

use std::path::Path;

use chrono::NaiveDate;
use reqwest::blocking::Client;
use serde::Deserialize;

use crate::domain::TimeSeries;
use crate::error::AppError;

const BASE_URL: &str = "https://api.stlouisfed.org/fred/series/observations";
const OBS_LIMIT: usize = 100_000;

pub struct FredClient {
    client: Client,
    api_key: String,
}

impl FredClient {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            api_key: api_key.into(),
        }
    }

    pub fn from_env() -> Result<Self, AppError> {
        dotenvy::dotenv().ok();
        let api_key = std::env::var("FRED_API_KEY")
            .map_err(|_| AppError::new(2, "Missing FRED_API_KEY in environment (.env)."))?;
        Ok(Self::new(api_key))
    }

    /// Read the key from a file holding just the key (surrounding whitespace ignored).
    pub fn from_key_file(path: &Path) -> Result<Self, AppError> {
        let raw = std::fs::read_to_string(path).map_err(|e| {
            AppError::new(2, format!("Failed to read FRED API key file '{}': {e}", path.display()))
        })?;
        let api_key = raw.trim();
        if api_key.is_empty() {
            return Err(AppError::new(
                2,
                format!("FRED API key file '{}' is empty.", path.display()),
            ));
        }
        Ok(Self::new(api_key))
    }

    /// Fetch every observation of `series_id`, optionally bounded by `start`/`end`.
    ///
    /// Missing observations (`"."`) are kept as `NaN`.
    pub fn fetch_series(
        &self,
        series_id: &str,
        start: Option<NaiveDate>,
        end: Option<NaiveDate>,
    ) -> Result<TimeSeries, AppError> {
        log::info!("fetching FRED series {series_id}");
        let limit = OBS_LIMIT.to_string();
        let mut req = self.client.get(BASE_URL).query(&[
            ("series_id", series_id),
            ("api_key", self.api_key.as_str()),
            ("file_type", "json"),
            ("sort_order", "asc"),
            ("limit", limit.as_str()),
        ]);

        if let Some(date) = start {
            req = req.query(&[("observation_start", &date.to_string())]);
        }
        if let Some(date) = end {
            req = req.query(&[("observation_end", &date.to_string())]);
        }

        let resp = req
            .send()
            .map_err(|e| AppError::new(4, format!("FRED request failed: {e}")))?;

        if !resp.status().is_success() {
            return Err(AppError::new(
                4,
                format!("FRED request for {series_id} failed with status {}.", resp.status()),
            ));
        }

        let body: ObservationsResponse = resp
            .json()
            .map_err(|e| AppError::new(4, format!("Failed to parse FRED response: {e}")))?;

        let series = observations_to_series(series_id, body.observations)?;
        require_observations(series_id, series, start.is_some() || end.is_some())
    }
}

/// An unbounded request must return data. A bounded one may legitimately come
/// back empty (e.g. a splice segment dated before the series starts); callers
/// decide what an empty window means.
fn require_observations(series_id: &str, series: TimeSeries, bounded: bool) -> Result<TimeSeries, AppError> {
    if series.is_empty() {
        if !bounded {
            return Err(AppError::new(
                4,
                format!("No observations returned for series {series_id}."),
            ));
        }
        log::warn!("{series_id}: no observations in the requested range");
    } else {
        log::info!("{series_id}: {} observations", series.len());
    }
    Ok(series)
}

#[derive(Debug, Deserialize)]
struct ObservationsResponse {
    observations: Vec<Observation>,
}

#[derive(Debug, Deserialize)]
struct Observation {
    date: String,
    value: String,
}

fn observations_to_series(series_id: &str, observations: Vec<Observation>) -> Result<TimeSeries, AppError> {
    let mut points = Vec::with_capacity(observations.len());
    for obs in observations {
        let date = NaiveDate::parse_from_str(&obs.date, "%Y-%m-%d")
            .map_err(|e| AppError::new(4, format!("Invalid FRED date '{}': {e}", obs.date)))?;
        points.push((date, parse_value(&obs.value)));
    }
    TimeSeries::from_unsorted(series_id, points)
        .map_err(|e| AppError::new(4, format!("Malformed FRED response: {e}")))
}

fn parse_value(raw: &str) -> f64 {
    let trimmed = raw.trim();
    if trimmed == "." || trimmed.is_empty() {
        return f64::NAN;
    }
    trimmed.parse::<f64>().unwrap_or(f64::NAN)
}

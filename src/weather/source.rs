use std::convert::TryFrom;

use async_trait::async_trait;

use super::{AirQualityResponse, ForecastResponse};
use crate::error::Result;
use crate::http;
use crate::location::Position;

const CURRENT_FIELDS: &str = "temperature_2m,relative_humidity_2m,weather_code";
const DAILY_FIELDS: &str = "weather_code,temperature_2m_max,temperature_2m_min";
const AIR_QUALITY_FIELDS: &str = "pm10,pm2_5";

#[async_trait]
pub trait WeatherSource: Send + Sync {
    /// Current conditions plus today, tomorrow and the day after.
    async fn forecast(&self, position: Position, timezone: &str) -> Result<ForecastResponse>;

    async fn air_quality(&self, position: Position) -> Result<AirQualityResponse>;
}

/// The Open-Meteo forecast and air-quality APIs. No key required.
pub struct OpenMeteo {
    client: reqwest::Client,
    forecast_url: String,
    air_quality_url: String,
}

impl OpenMeteo {
    pub fn new(client: reqwest::Client, forecast_url: String, air_quality_url: String) -> Self {
        Self {
            client,
            forecast_url,
            air_quality_url,
        }
    }
}

#[async_trait]
impl WeatherSource for OpenMeteo {
    async fn forecast(&self, position: Position, timezone: &str) -> Result<ForecastResponse> {
        let body = http::get_json(
            &self.client,
            &self.forecast_url,
            &[
                ("latitude", position.latitude.to_string()),
                ("longitude", position.longitude.to_string()),
                ("current", CURRENT_FIELDS.to_string()),
                ("daily", DAILY_FIELDS.to_string()),
                ("timezone", timezone.to_string()),
            ],
        )
        .await?;

        Ok(ForecastResponse::try_from(body)?)
    }

    async fn air_quality(&self, position: Position) -> Result<AirQualityResponse> {
        let body = http::get_json(
            &self.client,
            &self.air_quality_url,
            &[
                ("latitude", position.latitude.to_string()),
                ("longitude", position.longitude.to_string()),
                ("current", AIR_QUALITY_FIELDS.to_string()),
            ],
        )
        .await?;

        Ok(AirQualityResponse::try_from(body)?)
    }
}

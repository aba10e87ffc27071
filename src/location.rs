use std::time::Duration;

use async_trait::async_trait;
use log::debug;

use crate::error::{Error, Result};
use crate::http;

/// Used whenever the device cannot say where it is (Seoul City Hall).
pub const FALLBACK_POSITION: Position = Position {
    latitude: 37.5665,
    longitude: 126.9780,
};

#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Position {
    pub latitude: f64,
    pub longitude: f64,
}

impl Position {
    pub fn is_valid(&self) -> bool {
        self.latitude.is_finite()
            && self.longitude.is_finite()
            && self.latitude.abs() <= 90.
            && self.longitude.abs() <= 180.
    }
}

/// Where a refresh got its coordinates from.
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum Fix {
    Device(Position),
    Fallback(Position),
}

impl Fix {
    pub fn position(&self) -> Position {
        match self {
            Self::Device(position) | Self::Fallback(position) => *position,
        }
    }

    pub fn is_fallback(&self) -> bool {
        matches!(self, Self::Fallback(_))
    }
}

#[async_trait]
pub trait Locator: Send + Sync {
    async fn locate(&self) -> Result<Position>;
}

/// Ask `locator` for a position, settling for [`FALLBACK_POSITION`] on any
/// failure or when no answer arrives within `timeout`. Never an error.
pub async fn resolve(locator: &dyn Locator, timeout: Duration) -> Fix {
    let error = match tokio::time::timeout(timeout, locator.locate()).await {
        Ok(Ok(position)) if position.is_valid() => return Fix::Device(position),
        Ok(Ok(position)) => {
            debug!("Ignoring out-of-range position {:?}", position);
            Error::LocationUnavailable
        }
        Ok(Err(error)) => error,
        Err(_) => Error::Timeout,
    };

    debug!("Geolocation failed ({}), using fallback position", error);
    Fix::Fallback(FALLBACK_POSITION)
}

/// No geolocation facility on this device.
pub struct Unsupported;

#[async_trait]
impl Locator for Unsupported {
    async fn locate(&self) -> Result<Position> {
        Err(Error::LocationUnavailable)
    }
}

/// Coordinates pinned in the configuration.
pub struct FixedLocation(pub Position);

#[async_trait]
impl Locator for FixedLocation {
    async fn locate(&self) -> Result<Position> {
        Ok(self.0)
    }
}

/// Geolocation by public IP address.
///
/// Accepts either spelling the common services use:
///
/// ```json
/// { "latitude": 37.5665, "longitude": 126.978 }
/// { "lat": 37.5665, "lon": 126.978 }
/// ```
pub struct IpLocator {
    client: reqwest::Client,
    url: String,
}

impl IpLocator {
    pub fn new(client: reqwest::Client, url: String) -> Self {
        Self { client, url }
    }
}

#[async_trait]
impl Locator for IpLocator {
    async fn locate(&self) -> Result<Position> {
        let body = http::get_json(&self.client, &self.url, &[]).await?;
        Ok(parse_position(&body)?)
    }
}

fn parse_position(body: &json::JsonValue) -> std::result::Result<Position, &'static str> {
    let latitude = body["latitude"]
        .as_f64()
        .or_else(|| body["lat"].as_f64())
        .ok_or("Missing or invalid \"latitude\" value.")?;
    let longitude = body["longitude"]
        .as_f64()
        .or_else(|| body["lon"].as_f64())
        .ok_or("Missing or invalid \"longitude\" value.")?;

    Ok(Position {
        latitude,
        longitude,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Stalled;

    #[async_trait]
    impl Locator for Stalled {
        async fn locate(&self) -> Result<Position> {
            std::future::pending().await
        }
    }

    const BERLIN: Position = Position {
        latitude: 52.52,
        longitude: 13.405,
    };

    #[tokio::test]
    async fn device_position_is_used() {
        let fix = resolve(&FixedLocation(BERLIN), Duration::from_secs(5)).await;
        assert_eq!(fix, Fix::Device(BERLIN));
    }

    #[tokio::test]
    async fn unsupported_falls_back() {
        let fix = resolve(&Unsupported, Duration::from_secs(5)).await;
        assert_eq!(fix, Fix::Fallback(FALLBACK_POSITION));
        assert!(fix.is_fallback());
    }

    #[tokio::test(start_paused = true)]
    async fn timeout_falls_back() {
        let fix = resolve(&Stalled, Duration::from_secs(5)).await;
        assert_eq!(fix.position(), FALLBACK_POSITION);
    }

    #[tokio::test]
    async fn out_of_range_falls_back() {
        let bogus = Position {
            latitude: 137.,
            longitude: 13.,
        };
        let fix = resolve(&FixedLocation(bogus), Duration::from_secs(5)).await;
        assert!(fix.is_fallback());
    }

    #[test]
    fn parses_both_spellings() {
        let long = json::object! { "latitude": 52.52, "longitude": 13.405 };
        let short = json::object! { "status": "success", "lat": 52.52, "lon": 13.405 };

        assert_eq!(parse_position(&long), Ok(BERLIN));
        assert_eq!(parse_position(&short), Ok(BERLIN));
        assert!(parse_position(&json::object! { "lat": 52.52 }).is_err());
    }
}

use std::convert::TryFrom;
use std::fmt;

pub mod pipeline;
pub mod source;

pub use pipeline::{RefreshOutcome, WeatherPipeline};
pub use source::{OpenMeteo, WeatherSource};

/// Shown when the timezone yields no usable place name.
pub const PLACEHOLDER_LOCATION: &str = "My Location";

/// Coarse condition derived from a WMO weather code.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Condition {
    ClearSky,
    PartlyCloudy,
    Fog,
    Drizzle,
    Rain,
    Snow,
    Thunderstorm,
}

impl Condition {
    pub const ALL: [Condition; 7] = [
        Self::ClearSky,
        Self::PartlyCloudy,
        Self::Fog,
        Self::Drizzle,
        Self::Rain,
        Self::Snow,
        Self::Thunderstorm,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            Self::ClearSky => "clear sky",
            Self::PartlyCloudy => "partly cloudy",
            Self::Fog => "fog",
            Self::Drizzle => "drizzle",
            Self::Rain => "rain",
            Self::Snow => "snow",
            Self::Thunderstorm => "thunderstorm",
        }
    }
}

/// Unmapped and negative codes read as clear sky.
impl From<i64> for Condition {
    fn from(code: i64) -> Self {
        match code {
            0 => Self::ClearSky,
            1..=3 => Self::PartlyCloudy,
            45..=48 => Self::Fog,
            51..=55 => Self::Drizzle,
            61..=65 => Self::Rain,
            71..=77 => Self::Snow,
            80..=82 => Self::Rain, // showers
            95..=i64::MAX => Self::Thunderstorm,
            _ => Self::ClearSky,
        }
    }
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct CurrentConditions {
    pub temperature: i32,
    pub low: i32,
    pub high: i32,
    pub condition: Condition,
    pub humidity: i32,
    pub location: String,
    pub pm10: i32,
    pub pm2_5: i32,
}

/// Seed values shown until the first successful refresh.
impl Default for CurrentConditions {
    fn default() -> Self {
        Self {
            temperature: 11,
            low: 6,
            high: 15,
            condition: Condition::ClearSky,
            humidity: 43,
            location: "Seoul, Korea".to_string(),
            pm10: 15,
            pm2_5: 8,
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq)]
pub struct ForecastDay {
    pub low: i32,
    pub high: i32,
    pub condition: Condition,
}

#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Forecast {
    pub tomorrow: ForecastDay,
    pub day_after: ForecastDay,
}

impl Default for Forecast {
    fn default() -> Self {
        Self {
            tomorrow: ForecastDay {
                low: 9,
                high: 17,
                condition: Condition::PartlyCloudy,
            },
            day_after: ForecastDay {
                low: 7,
                high: 14,
                condition: Condition::Rain,
            },
        }
    }
}

/// Everything one weather refresh produces. Replaced as a unit, never patched.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct WeatherSnapshot {
    pub current: CurrentConditions,
    pub forecast: Forecast,
}

impl WeatherSnapshot {
    pub fn from_responses(
        forecast: &ForecastResponse,
        air: &AirQualityResponse,
        location: String,
    ) -> Self {
        let [today, tomorrow, day_after] = &forecast.daily;

        Self {
            current: CurrentConditions {
                temperature: round(forecast.current.temperature),
                low: round(today.min),
                high: round(today.max),
                condition: forecast.current.weather_code.into(),
                humidity: round(forecast.current.humidity),
                location,
                pm10: round(air.pm10),
                pm2_5: round(air.pm2_5),
            },
            forecast: Forecast {
                tomorrow: tomorrow.into(),
                day_after: day_after.into(),
            },
        }
    }
}

/// Round half up, so 11.5 shows as 12 and -2.5 as -2.
pub fn round(value: f64) -> i32 {
    (value + 0.5).floor() as i32
}

/// Display name for an IANA zone: `"America/New_York"` becomes `"New York"`.
pub fn location_name(timezone: &str) -> String {
    let name = timezone
        .rsplit('/')
        .next()
        .unwrap_or_default()
        .replace('_', " ");

    if name.trim().is_empty() {
        PLACEHOLDER_LOCATION.to_string()
    } else {
        name
    }
}

/// The subset of the forecast endpoint's answer the dashboard uses.
///
/// ```json
/// {
///     "timezone": "Asia/Seoul",
///     "current": {
///         "time": "2024-04-02T09:15",
///         "temperature_2m": 11.6,
///         "relative_humidity_2m": 43,
///         "weather_code": 2
///     },
///     "daily": {
///         "time": ["2024-04-02", "2024-04-03", "2024-04-04"],
///         "weather_code": [2, 61, 3],
///         "temperature_2m_max": [15.2, 17.0, 14.1],
///         "temperature_2m_min": [6.4, 9.1, 7.0]
///     }
/// }
/// ```
#[derive(Clone, Debug, PartialEq)]
pub struct ForecastResponse {
    pub current: CurrentReading,
    /// Today, tomorrow and the day after.
    pub daily: [DailyReading; 3],
}

#[derive(Copy, Clone, Debug, PartialEq)]
pub struct CurrentReading {
    pub temperature: f64,
    pub humidity: f64,
    pub weather_code: i64,
}

#[derive(Copy, Clone, Debug, PartialEq)]
pub struct DailyReading {
    pub max: f64,
    pub min: f64,
    pub weather_code: i64,
}

impl From<&DailyReading> for ForecastDay {
    fn from(day: &DailyReading) -> Self {
        Self {
            low: round(day.min),
            high: round(day.max),
            condition: day.weather_code.into(),
        }
    }
}

impl TryFrom<json::JsonValue> for ForecastResponse {
    type Error = &'static str;

    fn try_from(mut json: json::JsonValue) -> Result<Self, Self::Error> {
        let current = json.remove("current");
        if !current.is_object() {
            return Err("Missing \"current\" section.");
        }

        let daily = json.remove("daily");
        if !daily.is_object() {
            return Err("Missing \"daily\" section.");
        }

        Ok(Self {
            current: CurrentReading {
                temperature: current["temperature_2m"]
                    .as_f64()
                    .ok_or("Missing or invalid \"current.temperature_2m\" value.")?,
                humidity: current["relative_humidity_2m"]
                    .as_f64()
                    .ok_or("Missing or invalid \"current.relative_humidity_2m\" value.")?,
                weather_code: current["weather_code"]
                    .as_i64()
                    .ok_or("Missing or invalid \"current.weather_code\" value.")?,
            },
            daily: [
                DailyReading::try_from((&daily, 0))?,
                DailyReading::try_from((&daily, 1))?,
                DailyReading::try_from((&daily, 2))?,
            ],
        })
    }
}

impl TryFrom<(&json::JsonValue, usize)> for DailyReading {
    type Error = &'static str;

    fn try_from((daily, index): (&json::JsonValue, usize)) -> Result<Self, Self::Error> {
        Ok(Self {
            max: daily["temperature_2m_max"][index]
                .as_f64()
                .ok_or("Missing or invalid \"daily.temperature_2m_max\" value.")?,
            min: daily["temperature_2m_min"][index]
                .as_f64()
                .ok_or("Missing or invalid \"daily.temperature_2m_min\" value.")?,
            weather_code: daily["weather_code"][index]
                .as_i64()
                .ok_or("Missing or invalid \"daily.weather_code\" value.")?,
        })
    }
}

/// ```json
/// { "current": { "time": "2024-04-02T09:00", "pm10": 15.3, "pm2_5": 8.1 } }
/// ```
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct AirQualityResponse {
    pub pm10: f64,
    pub pm2_5: f64,
}

/// A reading the station did not report (`null`) counts as zero.
impl TryFrom<json::JsonValue> for AirQualityResponse {
    type Error = &'static str;

    fn try_from(mut json: json::JsonValue) -> Result<Self, Self::Error> {
        let current = json.remove("current");
        if !current.is_object() {
            return Err("Missing \"current\" section.");
        }

        Ok(Self {
            pm10: current["pm10"].as_f64().unwrap_or(0.),
            pm2_5: current["pm2_5"].as_f64().unwrap_or(0.),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn condition_examples() {
        assert_eq!(Condition::from(0), Condition::ClearSky);
        assert_eq!(Condition::from(2), Condition::PartlyCloudy);
        assert_eq!(Condition::from(46), Condition::Fog);
        assert_eq!(Condition::from(53), Condition::Drizzle);
        assert_eq!(Condition::from(63), Condition::Rain);
        assert_eq!(Condition::from(75), Condition::Snow);
        assert_eq!(Condition::from(81), Condition::Rain);
        assert_eq!(Condition::from(96), Condition::Thunderstorm);
        assert_eq!(Condition::from(-5), Condition::ClearSky);
    }

    #[test]
    fn condition_gaps_fall_back_to_clear_sky() {
        for code in [4, 44, 49, 50, 56, 60, 66, 70, 78, 79, 83, 94] {
            assert_eq!(Condition::from(code), Condition::ClearSky, "code {}", code);
        }
        assert_eq!(Condition::from(i64::MIN), Condition::ClearSky);
        assert_eq!(Condition::from(i64::MAX), Condition::Thunderstorm);
    }

    #[test]
    fn condition_is_total() {
        for code in -200..400 {
            assert!(Condition::ALL.contains(&Condition::from(code)));
        }
    }

    #[test]
    fn labels() {
        assert_eq!(Condition::PartlyCloudy.to_string(), "partly cloudy");
        assert_eq!(Condition::ClearSky.label(), "clear sky");
    }

    #[test]
    fn rounding_goes_half_up() {
        assert_eq!(round(11.6), 12);
        assert_eq!(round(11.4), 11);
        assert_eq!(round(11.5), 12);
        assert_eq!(round(-2.5), -2);
        assert_eq!(round(-2.6), -3);
    }

    #[test]
    fn location_names() {
        assert_eq!(location_name("Asia/Seoul"), "Seoul");
        assert_eq!(location_name("America/New_York"), "New York");
        assert_eq!(location_name("America/Argentina/Buenos_Aires"), "Buenos Aires");
        assert_eq!(location_name("UTC"), "UTC");
        assert_eq!(location_name(""), PLACEHOLDER_LOCATION);
        assert_eq!(location_name("Etc/"), PLACEHOLDER_LOCATION);
    }

    fn forecast_json() -> json::JsonValue {
        json::object! {
            "current": {
                "temperature_2m": 11.6,
                "relative_humidity_2m": 43.4,
                "weather_code": 2
            },
            "daily": {
                "weather_code": [2, 61, 96],
                "temperature_2m_max": [15.2, 17.5, 14.1],
                "temperature_2m_min": [6.4, 9.1, 6.9]
            }
        }
    }

    #[test]
    fn parses_forecast() {
        let response = ForecastResponse::try_from(forecast_json()).unwrap();
        assert_eq!(response.current.weather_code, 2);
        assert_eq!(response.daily[2].weather_code, 96);
        assert_eq!(response.daily[1].max, 17.5);
    }

    #[test]
    fn forecast_needs_both_sections() {
        let mut json = forecast_json();
        json.remove("daily");
        assert!(ForecastResponse::try_from(json).is_err());

        let mut json = forecast_json();
        json.remove("current");
        assert!(ForecastResponse::try_from(json).is_err());
    }

    #[test]
    fn forecast_needs_three_days() {
        let mut json = forecast_json();
        json["daily"]["temperature_2m_min"] = json::array![6.4, 9.1];
        assert_eq!(
            ForecastResponse::try_from(json),
            Err("Missing or invalid \"daily.temperature_2m_min\" value.")
        );
    }

    #[test]
    fn air_quality_defaults_missing_readings() {
        let air = AirQualityResponse::try_from(json::object! {
            "current": { "pm10": 22.7, "pm2_5": null }
        })
        .unwrap();
        assert_eq!(air.pm10, 22.7);
        assert_eq!(air.pm2_5, 0.);

        assert!(AirQualityResponse::try_from(json::object! { "error": true }).is_err());
    }

    #[test]
    fn snapshot_rounds_everything() {
        let forecast = ForecastResponse::try_from(forecast_json()).unwrap();
        let air = AirQualityResponse {
            pm10: 15.5,
            pm2_5: 7.8,
        };

        let snapshot = WeatherSnapshot::from_responses(&forecast, &air, location_name("Asia/Seoul"));

        assert_eq!(
            snapshot.current,
            CurrentConditions {
                temperature: 12,
                low: 6,
                high: 15,
                condition: Condition::PartlyCloudy,
                humidity: 43,
                location: "Seoul".to_string(),
                pm10: 16,
                pm2_5: 8,
            }
        );
        assert_eq!(
            snapshot.forecast.tomorrow,
            ForecastDay {
                low: 9,
                high: 18,
                condition: Condition::Rain,
            }
        );
        assert_eq!(snapshot.forecast.day_after.condition, Condition::Thunderstorm);
        assert_eq!(snapshot.forecast.day_after.low, 7);
    }
}

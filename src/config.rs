use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::location::Position;

pub const DEFAULT_WEATHER_URL: &str = "https://api.open-meteo.com/v1/forecast";
pub const DEFAULT_AIR_QUALITY_URL: &str = "https://air-quality-api.open-meteo.com/v1/air-quality";
pub const DEFAULT_HOLIDAY_URL: &str = "https://tallyfy.com/national-holidays/api";
pub const DEFAULT_COUNTRY: &str = "KR";
pub const DEFAULT_PREFERENCES_PATH: &str = "layoutSettings.json";
pub const DEFAULT_POWER_SUPPLY_ROOT: &str = "/sys/class/power_supply";

pub const WEATHER_INTERVAL: Duration = Duration::from_secs(4 * 60 * 60);
pub const HOLIDAY_INTERVAL: Duration = Duration::from_secs(12 * 60 * 60);
pub const BATTERY_POLL_INTERVAL: Duration = Duration::from_secs(30);
pub const GEOLOCATION_TIMEOUT: Duration = Duration::from_secs(5);
pub const HTTP_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Output {
    /// Redraw a text frame on stdout every tick.
    Console,
    /// Push dithered frames to a raw grayscale framebuffer.
    Framebuffer,
    /// Run the pipelines without drawing anything.
    None,
}

impl FromStr for Output {
    type Err = &'static str;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.to_ascii_lowercase().as_str() {
            "console" => Ok(Self::Console),
            "framebuffer" | "fb" => Ok(Self::Framebuffer),
            "none" | "headless" => Ok(Self::None),
            _ => Err("expected console, framebuffer or none"),
        }
    }
}

#[derive(Clone, Debug)]
pub struct Config {
    pub weather_url: String,
    pub air_quality_url: String,
    pub holiday_url: String,
    pub country: String,
    /// IANA zone name sent to the forecast endpoint. Resolved from the host when unset.
    pub timezone: Option<String>,
    /// Fixed coordinates standing in for device geolocation.
    pub position: Option<Position>,
    /// HTTP endpoint answering with `latitude`/`longitude` for the caller's address.
    pub geolocation_url: Option<String>,
    pub preferences_path: PathBuf,
    pub viewport: (u32, u32),
    pub weather_interval: Duration,
    pub holiday_interval: Duration,
    pub battery_poll_interval: Duration,
    pub http_timeout: Duration,
    pub output: Output,
    pub framebuffer: PathBuf,
    pub power_supply_root: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            weather_url: DEFAULT_WEATHER_URL.to_string(),
            air_quality_url: DEFAULT_AIR_QUALITY_URL.to_string(),
            holiday_url: DEFAULT_HOLIDAY_URL.to_string(),
            country: DEFAULT_COUNTRY.to_string(),
            timezone: None,
            position: None,
            geolocation_url: None,
            preferences_path: PathBuf::from(DEFAULT_PREFERENCES_PATH),
            viewport: (1280, 800),
            weather_interval: WEATHER_INTERVAL,
            holiday_interval: HOLIDAY_INTERVAL,
            battery_poll_interval: BATTERY_POLL_INTERVAL,
            http_timeout: HTTP_TIMEOUT,
            output: Output::Console,
            framebuffer: PathBuf::from("/dev/fb0"),
            power_supply_root: PathBuf::from(DEFAULT_POWER_SUPPLY_ROOT),
        }
    }
}

impl Config {
    /// Read `MIRROR_*` variables, keeping the default for anything unset or unparsable.
    /// Call `dotenv::dotenv()` first to pick up a `.env` file.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        let parsed = |key: &str| lookup(key).and_then(|v| v.trim().parse::<f64>().ok());
        let seconds = |key: &str, fallback: Duration| {
            lookup(key)
                .and_then(|v| v.trim().parse::<u64>().ok())
                .filter(|secs| *secs > 0)
                .map(Duration::from_secs)
                .unwrap_or(fallback)
        };

        let position = match (parsed("MIRROR_LATITUDE"), parsed("MIRROR_LONGITUDE")) {
            (Some(latitude), Some(longitude)) => Some(Position {
                latitude,
                longitude,
            }),
            _ => None,
        };

        let viewport = (
            lookup("MIRROR_VIEWPORT_WIDTH")
                .and_then(|v| v.trim().parse().ok())
                .unwrap_or(defaults.viewport.0),
            lookup("MIRROR_VIEWPORT_HEIGHT")
                .and_then(|v| v.trim().parse().ok())
                .unwrap_or(defaults.viewport.1),
        );

        Self {
            weather_url: lookup("MIRROR_WEATHER_URL").unwrap_or(defaults.weather_url),
            air_quality_url: lookup("MIRROR_AIR_QUALITY_URL").unwrap_or(defaults.air_quality_url),
            holiday_url: lookup("MIRROR_HOLIDAY_URL").unwrap_or(defaults.holiday_url),
            country: lookup("MIRROR_COUNTRY")
                .map(|v| v.trim().to_ascii_uppercase())
                .filter(|v| !v.is_empty())
                .unwrap_or(defaults.country),
            timezone: lookup("MIRROR_TIMEZONE").filter(|v| !v.trim().is_empty()),
            position,
            geolocation_url: lookup("MIRROR_GEOLOCATION_URL").filter(|v| !v.trim().is_empty()),
            preferences_path: lookup("MIRROR_PREFERENCES")
                .map(PathBuf::from)
                .unwrap_or(defaults.preferences_path),
            viewport,
            weather_interval: seconds("MIRROR_WEATHER_INTERVAL_SECS", defaults.weather_interval),
            holiday_interval: seconds("MIRROR_HOLIDAY_INTERVAL_SECS", defaults.holiday_interval),
            battery_poll_interval: seconds(
                "MIRROR_BATTERY_POLL_SECS",
                defaults.battery_poll_interval,
            ),
            http_timeout: seconds("MIRROR_HTTP_TIMEOUT_SECS", defaults.http_timeout),
            output: lookup("MIRROR_OUTPUT")
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.output),
            framebuffer: lookup("MIRROR_FRAMEBUFFER")
                .map(PathBuf::from)
                .unwrap_or(defaults.framebuffer),
            power_supply_root: lookup("MIRROR_POWER_SUPPLY_ROOT")
                .map(PathBuf::from)
                .unwrap_or(defaults.power_supply_root),
        }
    }
}

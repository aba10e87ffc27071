use std::sync::Arc;

use async_trait::async_trait;
use log::{info, warn};
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

use crate::error::Result;
use crate::http;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Holiday {
    /// `YYYY-MM-DD`
    pub date: String,
    pub name: String,
}

/// Entries from one holiday-list answer:
///
/// ```json
/// {
///     "year": 2024,
///     "holidays": [
///         { "date": "2024-03-01", "name": "Independence Movement Day", "local_name": "삼일절" }
///     ]
/// }
/// ```
///
/// A body without a `holidays` array yields no entries, as does an entry without a date.
pub fn parse_holidays(json: &json::JsonValue) -> Vec<Holiday> {
    json["holidays"]
        .members()
        .filter_map(|entry| {
            let date = entry["date"].as_str()?;
            let name = [&entry["local_name"], &entry["name"]]
                .into_iter()
                .filter_map(|value| value.as_str())
                .find(|name| !name.is_empty())
                .unwrap_or_default();

            Some(Holiday {
                date: date.to_string(),
                name: name.to_string(),
            })
        })
        .collect()
}

#[async_trait]
pub trait HolidaySource: Send + Sync {
    async fn holidays(&self, country: &str, year: i32) -> Result<Vec<Holiday>>;
}

/// Tallyfy's national-holiday lists, one JSON file per country and year.
pub struct Tallyfy {
    client: reqwest::Client,
    base_url: String,
}

impl Tallyfy {
    pub fn new(client: reqwest::Client, base_url: String) -> Self {
        Self { client, base_url }
    }

    pub fn url(&self, country: &str, year: i32) -> String {
        format!(
            "{}/{}/{}.json",
            self.base_url.trim_end_matches('/'),
            country,
            year
        )
    }
}

#[async_trait]
impl HolidaySource for Tallyfy {
    async fn holidays(&self, country: &str, year: i32) -> Result<Vec<Holiday>> {
        let body = http::get_json(&self.client, &self.url(country, year), &[]).await?;
        Ok(parse_holidays(&body))
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum HolidayOutcome {
    /// At least one year answered; the list was replaced.
    Replaced { entries: usize, failed_years: Vec<i32> },
    /// Nothing came back, so the previous list stays.
    Kept { failed_years: Vec<i32> },
    Cancelled,
}

/// Keeps the holiday list for this year and the next.
pub struct HolidayPipeline {
    source: Arc<dyn HolidaySource>,
    country: String,
    session: CancellationToken,
    holidays: watch::Sender<Arc<Vec<Holiday>>>,
}

impl HolidayPipeline {
    pub fn new(source: Arc<dyn HolidaySource>, country: String, session: CancellationToken) -> Self {
        let (holidays, _) = watch::channel(Arc::new(Vec::new()));

        Self {
            source,
            country,
            session,
            holidays,
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<Arc<Vec<Holiday>>> {
        self.holidays.subscribe()
    }

    pub fn holidays(&self) -> Arc<Vec<Holiday>> {
        Arc::clone(&self.holidays.borrow())
    }

    /// Fetch `year` and `year + 1` side by side. Either may fail on its own.
    pub async fn refresh(&self, year: i32) -> HolidayOutcome {
        let (this_year, next_year) = tokio::select! {
            biased;
            _ = self.session.cancelled() => return HolidayOutcome::Cancelled,
            results = async {
                tokio::join!(
                    self.source.holidays(&self.country, year),
                    self.source.holidays(&self.country, year + 1)
                )
            } => results,
        };

        let mut holidays = Vec::new();
        let mut failed_years = Vec::new();
        for (year, result) in [(year, this_year), (year + 1, next_year)] {
            match result {
                Ok(entries) => holidays.extend(entries),
                Err(err) => {
                    warn!("Failed to fetch {} holidays for {}: {}", self.country, year, err);
                    failed_years.push(year);
                }
            }
        }

        if holidays.is_empty() {
            return HolidayOutcome::Kept { failed_years };
        }

        let entries = holidays.len();
        info!("Loaded {} {} holidays", entries, self.country);
        self.holidays.send_replace(Arc::new(holidays));

        HolidayOutcome::Replaced {
            entries,
            failed_years,
        }
    }
}

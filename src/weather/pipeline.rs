use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use log::{debug, error, info};
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

use super::{location_name, WeatherSnapshot, WeatherSource};
use crate::config::GEOLOCATION_TIMEOUT;
use crate::error::Error;
use crate::location::{self, Fix, Locator};

/// Sent to the forecast endpoint when the host zone is unknown; the service then
/// picks the zone from the coordinates.
pub const AUTO_TIMEZONE: &str = "auto";

#[derive(Debug)]
pub enum RefreshOutcome {
    /// Another refresh was already running and this one was not forced.
    Skipped,
    Updated(Fix),
    /// Nothing was changed; the previous snapshot stays on screen.
    Failed(Error),
}

/// Produces [`WeatherSnapshot`]s. The only writer of the weather state.
pub struct WeatherPipeline {
    source: Arc<dyn WeatherSource>,
    locator: Arc<dyn Locator>,
    timezone: Option<String>,
    geolocation_timeout: Duration,
    session: CancellationToken,

    /// Reentrancy guard. Set while a refresh runs so a non-forced call cannot
    /// start a second round trip. Invisible to the user.
    in_flight: AtomicBool,

    /// What the screen shows: the weather cards dim while this is set.
    loading: watch::Sender<bool>,

    snapshot: watch::Sender<WeatherSnapshot>,
}

impl WeatherPipeline {
    pub fn new(
        source: Arc<dyn WeatherSource>,
        locator: Arc<dyn Locator>,
        timezone: Option<String>,
        session: CancellationToken,
    ) -> Self {
        let (loading, _) = watch::channel(false);
        let (snapshot, _) = watch::channel(WeatherSnapshot::default());

        Self {
            source,
            locator,
            timezone,
            geolocation_timeout: GEOLOCATION_TIMEOUT,
            session,
            in_flight: AtomicBool::new(false),
            loading,
            snapshot,
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<WeatherSnapshot> {
        self.snapshot.subscribe()
    }

    pub fn subscribe_loading(&self) -> watch::Receiver<bool> {
        self.loading.subscribe()
    }

    pub fn snapshot(&self) -> WeatherSnapshot {
        self.snapshot.borrow().clone()
    }

    pub fn is_in_flight(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    /// Fetch fresh conditions and publish them.
    ///
    /// Unless `force` is set, this is a no-op while another refresh is running.
    /// Any failure leaves the published snapshot exactly as it was.
    pub async fn refresh(&self, force: bool) -> RefreshOutcome {
        if self.in_flight.swap(true, Ordering::AcqRel) && !force {
            debug!("Weather refresh already running, skipping");
            return RefreshOutcome::Skipped;
        }
        let _guard = InFlight::enter(self);

        let outcome = tokio::select! {
            biased;
            _ = self.session.cancelled() => RefreshOutcome::Failed(Error::Cancelled),
            outcome = self.fetch() => outcome,
        };

        if let RefreshOutcome::Failed(err) = &outcome {
            error!("Weather fetch error: {}", err);
        }

        outcome
    }

    async fn fetch(&self) -> RefreshOutcome {
        let fix = location::resolve(self.locator.as_ref(), self.geolocation_timeout).await;
        let position = fix.position();
        let timezone = self.timezone.as_deref().unwrap_or(AUTO_TIMEZONE);

        let (forecast, air) = match tokio::try_join!(
            self.source.forecast(position, timezone),
            self.source.air_quality(position)
        ) {
            Ok(responses) => responses,
            Err(err) => return RefreshOutcome::Failed(err),
        };

        let snapshot = WeatherSnapshot::from_responses(
            &forecast,
            &air,
            location_name(self.timezone.as_deref().unwrap_or_default()),
        );
        info!(
            "Weather updated: {}°, {}, PM10 {} / PM2.5 {}",
            snapshot.current.temperature,
            snapshot.current.condition,
            snapshot.current.pm10,
            snapshot.current.pm2_5
        );
        self.snapshot.send_replace(snapshot);

        RefreshOutcome::Updated(fix)
    }
}

/// Holds both flags for the duration of a refresh and clears them on every exit path.
struct InFlight<'a> {
    pipeline: &'a WeatherPipeline,
}

impl<'a> InFlight<'a> {
    fn enter(pipeline: &'a WeatherPipeline) -> Self {
        pipeline.in_flight.store(true, Ordering::Release);
        pipeline.loading.send_replace(true);
        Self { pipeline }
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.pipeline.in_flight.store(false, Ordering::Release);
        self.pipeline.loading.send_replace(false);
    }
}

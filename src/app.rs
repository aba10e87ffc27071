use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use log::{debug, error, info, warn};
use time::OffsetDateTime;
use tokio::io::{AsyncWriteExt, BufReader};
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

use crate::battery::{BatteryMonitor, BatteryStatus, SysfsBattery};
use crate::clock::{host_timezone, Clock};
use crate::config::{Config, Output};
use crate::error::Result;
use crate::holiday::{HolidayOutcome, HolidayPipeline, Tallyfy};
use crate::http;
use crate::input::{read_commands, Command};
use crate::location::{FixedLocation, IpLocator, Locator, Unsupported};
use crate::preferences::{
    DeviceClass, LayoutPreferences, LayoutSettings, Loaded, Origin, PreferenceStore,
};
use crate::scheduler::Scheduler;
use crate::view::Feeds;
use crate::weather::{OpenMeteo, RefreshOutcome, WeatherPipeline};

/// Clear the terminal and home the cursor before each text frame.
const CLEAR_SCREEN: &str = "\x1b[2J\x1b[H";

/// How long the runtime waits for blocking work after the session ends.
///
/// A stdin read with nothing to say never returns, so the runtime stops
/// waiting after this long.
pub const SHUTDOWN_GRACE: Duration = Duration::from_secs(1);

/// Drive `session` on a multi-threaded runtime, then stop the runtime without
/// waiting on blocking work longer than [`SHUTDOWN_GRACE`].
pub fn run_to_completion<F>(session: F) -> Result<()>
where
    F: Future<Output = Result<()>>,
{
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;

    let result = runtime.block_on(session);
    runtime.shutdown_timeout(SHUTDOWN_GRACE);
    result
}

/// Run the dashboard until SIGINT or SIGTERM.
pub async fn run(config: Config) -> Result<()> {
    let client = http::client(config.http_timeout)?;
    let mut scheduler = Scheduler::new(CancellationToken::new());

    let locator: Arc<dyn Locator> = match (config.position, &config.geolocation_url) {
        (Some(position), _) => Arc::new(FixedLocation(position)),
        (None, Some(url)) => Arc::new(IpLocator::new(client.clone(), url.clone())),
        (None, None) => Arc::new(Unsupported),
    };
    let timezone = config.timezone.clone().or_else(host_timezone);
    match &timezone {
        Some(zone) => info!("Using time zone {}", zone),
        None => warn!("Host time zone unknown, letting the forecast service pick one"),
    }
    let clock = Clock::for_zone(timezone.as_deref());
    if let (Clock::Local, Some(zone)) = (clock, &timezone) {
        warn!("Unknown time zone {}, the clock follows host local time", zone);
    }

    let weather = Arc::new(WeatherPipeline::new(
        Arc::new(OpenMeteo::new(
            client.clone(),
            config.weather_url.clone(),
            config.air_quality_url.clone(),
        )),
        locator,
        timezone,
        scheduler.token(),
    ));
    let holidays = Arc::new(HolidayPipeline::new(
        Arc::new(Tallyfy::new(client, config.holiday_url.clone())),
        config.country.clone(),
        scheduler.token(),
    ));

    let store = PreferenceStore::new(&config.preferences_path);
    let loaded = blocking({
        let store = store.clone();
        move || store.load()
    })
    .await
    .unwrap_or(Loaded {
        preferences: LayoutPreferences::default(),
        origin: Origin::Unreadable,
    });
    if loaded.origin == Origin::Stored {
        info!("Loaded layout settings from {}", store.path().display());
    }
    let settings = Arc::new(LayoutSettings::new(store, loaded.preferences));
    let class = DeviceClass::from_width(config.viewport.0);
    info!(
        "Viewport {}x{} is a {} layout",
        config.viewport.0, config.viewport.1, class
    );

    let (now, clock_feed) = watch::channel(clock.now());
    scheduler.every("clock", Duration::from_secs(1), move |_| {
        now.send_replace(clock.now());
        async {}
    });

    let weather_job = Arc::clone(&weather);
    scheduler.every("weather", config.weather_interval, move |tick| {
        let weather = Arc::clone(&weather_job);
        async move { log_refresh(weather_cycle(&weather, tick).await) }
    });

    let holiday_job = Arc::clone(&holidays);
    scheduler.every("holidays", config.holiday_interval, move |_| {
        let holidays = Arc::clone(&holiday_job);
        let now = clock.now();
        async move {
            if let HolidayOutcome::Kept { failed_years } = holiday_cycle(&holidays, now).await {
                warn!("No holidays loaded (failed years {:?}), keeping the old list", failed_years);
            }
        }
    });

    let root = config.power_supply_root.clone();
    let battery_feed = match blocking(move || SysfsBattery::discover(&root)).await.flatten() {
        Some(battery) => {
            let monitor = Arc::new(BatteryMonitor::new(Box::new(battery)));
            let feed = monitor.subscribe();
            scheduler.every("battery", config.battery_poll_interval, move |_| {
                poll_battery(Arc::clone(&monitor))
            });
            feed
        }
        None => {
            debug!("No battery under {}", config.power_supply_root.display());
            watch::channel(BatteryStatus::default()).1
        }
    };

    let input_weather = Arc::clone(&weather);
    let input_settings = Arc::clone(&settings);
    scheduler.spawn("input", async move {
        let stdin = BufReader::new(tokio::io::stdin());
        let result = read_commands(stdin, |command| {
            let weather = Arc::clone(&input_weather);
            let settings = Arc::clone(&input_settings);
            async move { apply(command, &weather, settings, class).await }
        })
        .await;

        if let Err(err) = result {
            warn!("Stopped reading commands: {}", err);
        }
    });

    let feeds = Feeds {
        clock: clock_feed,
        weather: weather.subscribe(),
        loading: weather.subscribe_loading(),
        battery: battery_feed,
        holidays: holidays.subscribe(),
        layout: settings.subscribe(),
        class,
        viewport: config.viewport,
    };

    match config.output {
        Output::Console => scheduler.spawn_with_token("console", |token| console(feeds, token)),
        Output::Framebuffer => framebuffer(&mut scheduler, &config, feeds)?,
        Output::None => drop(feeds),
    }

    wait_for_shutdown().await;
    info!("Shutting down");
    scheduler.shutdown().await;

    Ok(())
}

/// One weather cycle. The first run yields to a refresh already under way;
/// every later one forces its way through.
pub async fn weather_cycle(weather: &WeatherPipeline, tick: u64) -> RefreshOutcome {
    weather.refresh(tick > 0).await
}

/// One holiday cycle for the year on the wall at `now`.
pub async fn holiday_cycle(holidays: &HolidayPipeline, now: OffsetDateTime) -> HolidayOutcome {
    holidays.refresh(now.year()).await
}

/// Read the battery once on the blocking pool.
pub async fn poll_battery(monitor: Arc<BatteryMonitor>) {
    blocking(move || monitor.poll()).await;
}

/// Run file I/O off the runtime's worker threads.
async fn blocking<T, F>(job: F) -> Option<T>
where
    F: FnOnce() -> T + Send + 'static,
    T: Send + 'static,
{
    match tokio::task::spawn_blocking(job).await {
        Ok(value) => Some(value),
        Err(err) => {
            error!("Blocking job failed: {}", err);
            None
        }
    }
}

async fn apply(
    command: Command,
    weather: &WeatherPipeline,
    settings: Arc<LayoutSettings>,
    class: DeviceClass,
) {
    match command {
        Command::Refresh => log_refresh(weather.refresh(false).await),
        Command::Adjust(field, value) => {
            blocking(move || settings.adjust(class, field, value)).await;
        }
        Command::Reset => {
            blocking(move || settings.reset(class)).await;
        }
    }
}

fn log_refresh(outcome: RefreshOutcome) {
    match outcome {
        RefreshOutcome::Updated(fix) if fix.is_fallback() => {
            debug!("Weather used the fallback position")
        }
        RefreshOutcome::Skipped => debug!("Weather refresh skipped"),
        // Failures are logged by the pipeline.
        _ => {}
    }
}

async fn console(mut feeds: Feeds, token: CancellationToken) {
    let mut stdout = tokio::io::stdout();

    loop {
        tokio::select! {
            biased;
            _ = token.cancelled() => break,
            changed = feeds.clock.changed() => if changed.is_err() { break },
        }

        let frame = format!("{}{}", CLEAR_SCREEN, feeds.dashboard());
        if let Err(err) = stdout.write_all(frame.as_bytes()).await {
            error!("Failed to write frame: {}", err);
            break;
        }
        if let Err(err) = stdout.flush().await {
            error!("Failed to flush frame: {}", err);
            break;
        }
    }
}

#[cfg(feature = "cairo")]
fn framebuffer(scheduler: &mut Scheduler, config: &Config, mut feeds: Feeds) -> Result<()> {
    use crate::display::{Display, Framebuffer};

    let (width, height) = config.viewport;
    let mut display = Framebuffer::new(&config.framebuffer, width as usize, height as usize);
    display.on()?;

    scheduler.spawn_with_token("framebuffer", move |token| async move {
        loop {
            tokio::select! {
                biased;
                _ = token.cancelled() => break,
                changed = feeds.clock.changed() => if changed.is_err() { break },
            }

            let dashboard = feeds.dashboard();
            if let Err(err) = tokio::task::block_in_place(|| display.draw_dashboard(&dashboard)) {
                error!("Failed to draw frame: {}", err);
            }
        }

        if let Err(err) = display.sleep() {
            warn!("Failed to release framebuffer: {}", err);
        }
    });

    Ok(())
}

#[cfg(not(feature = "cairo"))]
fn framebuffer(_: &mut Scheduler, _: &Config, _: Feeds) -> Result<()> {
    Err(crate::error::Error::Display(
        "framebuffer output needs the cairo feature".to_string(),
    ))
}

#[cfg(unix)]
async fn wait_for_shutdown() {
    use tokio::signal::unix::{signal, SignalKind};

    let mut sigterm = match signal(SignalKind::terminate()) {
        Ok(signal) => signal,
        Err(err) => {
            warn!("Failed to register SIGTERM handler: {}", err);
            return ctrl_c().await;
        }
    };

    tokio::select! {
        _ = sigterm.recv() => info!("Received SIGTERM"),
        _ = ctrl_c() => {}
    }
}

#[cfg(not(unix))]
async fn wait_for_shutdown() {
    ctrl_c().await
}

async fn ctrl_c() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("Received SIGINT"),
        Err(err) => {
            warn!("Failed to listen for SIGINT: {}", err);
            std::future::pending::<()>().await
        }
    }
}

use std::fmt;
use std::sync::Arc;

use piet::kurbo::Rect;
use time::error::ComponentRange;
use time::OffsetDateTime;
use tokio::sync::watch;

use crate::battery::BatteryStatus;
use crate::calendar::{self, Highlight, MonthGrid, WEEKDAY_HEADERS};
use crate::clock::clock_digits;
use crate::holiday::Holiday;
use crate::preferences::{DeviceClass, LayoutPreferences, PanelLayout};
use crate::weather::WeatherSnapshot;

/// CSS pixels per rem.
pub const REM: f64 = 16.;

/// Opacity of the weather cards while a refresh runs.
pub const LOADING_ALPHA: f64 = 0.5;

/// Opacity of the month after the current one.
pub const NEXT_MONTH_ALPHA: f64 = 0.2;

/// Outer padding, also used as the gap between cards.
pub fn padding(class: DeviceClass) -> f64 {
    match class {
        DeviceClass::Mobile => 12.,
        DeviceClass::Tablet | DeviceClass::Desktop => 16.,
    }
}

/// Where each card goes on screen.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Geometry {
    pub clock: Rect,
    pub weather: Rect,
    pub forecast: Rect,
    pub calendar: Rect,
}

impl Geometry {
    /// The left column stacks the clock card over the weather row, split by their
    /// weights; the calendar column takes its percentage of the width.
    pub fn compute(viewport: (u32, u32), class: DeviceClass, layout: &PanelLayout) -> Self {
        let gap = padding(class);
        let (width, height) = (viewport.0 as f64, viewport.1 as f64);
        let content_width = (width - 2. * gap).max(0.);
        let content_height = (height - 2. * gap).max(0.);

        let calendar_width = content_width * layout.calendar / 100.;
        let left_width = (content_width - gap - calendar_width).max(0.);

        let stacked = (content_height - gap).max(0.);
        let clock_height = stacked * layout.clock / (layout.clock + layout.weather);
        let row_top = gap + clock_height + gap;
        let card_width = ((left_width - gap) / 2.).max(0.);

        Self {
            clock: Rect::new(gap, gap, gap + left_width, gap + clock_height),
            weather: Rect::new(gap, row_top, gap + card_width, height - gap),
            forecast: Rect::new(
                gap + card_width + gap,
                row_top,
                gap + left_width,
                height - gap,
            ),
            calendar: Rect::new(
                width - gap - calendar_width,
                gap,
                width - gap,
                height - gap,
            ),
        }
    }
}

/// Everything one frame shows.
#[derive(Clone, Debug)]
pub struct Dashboard {
    pub now: OffsetDateTime,
    pub weather: WeatherSnapshot,
    pub loading: bool,
    pub battery: BatteryStatus,
    pub holidays: Arc<Vec<Holiday>>,
    pub class: DeviceClass,
    pub layout: PanelLayout,
    pub viewport: (u32, u32),
}

impl Dashboard {
    pub fn geometry(&self) -> Geometry {
        Geometry::compute(self.viewport, self.class, &self.layout)
    }

    /// `HH:MM`, with the seconds drawn apart.
    pub fn clock_text(&self) -> (String, String) {
        let (hours, minutes, seconds) = clock_digits(self.now);
        (format!("{}:{}", hours, minutes), seconds)
    }

    pub fn clock_font_px(&self) -> f64 {
        self.layout.clock_font_size * REM
    }

    pub fn months(&self) -> Result<[MonthGrid; 2], ComponentRange> {
        calendar::two_months(self.now.date(), &self.holidays)
    }

    pub fn battery_text(&self) -> String {
        format!(
            "{}%{}{}",
            self.battery.level,
            if self.battery.is_charging() { " +" } else { "" },
            if self.battery.is_low() && !self.battery.is_charging() {
                " !"
            } else {
                ""
            }
        )
    }
}

/// The live channels a frame is assembled from.
pub struct Feeds {
    pub clock: watch::Receiver<OffsetDateTime>,
    pub weather: watch::Receiver<WeatherSnapshot>,
    pub loading: watch::Receiver<bool>,
    pub battery: watch::Receiver<BatteryStatus>,
    pub holidays: watch::Receiver<Arc<Vec<Holiday>>>,
    pub layout: watch::Receiver<LayoutPreferences>,
    pub class: DeviceClass,
    pub viewport: (u32, u32),
}

impl Feeds {
    pub fn dashboard(&self) -> Dashboard {
        Dashboard {
            now: *self.clock.borrow(),
            weather: self.weather.borrow().clone(),
            loading: *self.loading.borrow(),
            battery: *self.battery.borrow(),
            holidays: Arc::clone(&self.holidays.borrow()),
            class: self.class,
            layout: *self.layout.borrow().get(self.class),
            viewport: self.viewport,
        }
    }
}

/// Plain-text frame, for the console output and for logs.
impl fmt::Display for Dashboard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (clock, seconds) = self.clock_text();
        let current = &self.weather.current;
        let forecast = &self.weather.forecast;

        writeln!(f, "{}:{:<30}[battery {}]", clock, seconds, self.battery_text())?;
        writeln!(f)?;
        writeln!(
            f,
            "{}  {}°  L:{}° H:{}°{}",
            current.condition,
            current.temperature,
            current.low,
            current.high,
            if self.loading { "  (updating)" } else { "" }
        )?;
        writeln!(
            f,
            "Humidity {}%  PM10 / PM2.5 {} / {}  {}",
            current.humidity, current.pm10, current.pm2_5, current.location
        )?;
        for (label, day) in [("Tomorrow", &forecast.tomorrow), ("Day After", &forecast.day_after)] {
            writeln!(
                f,
                "{:<10}{:<15}{}° / {}°",
                label, day.condition, day.high, day.low
            )?;
        }

        match self.months() {
            Ok(months) => {
                for month in months.iter() {
                    writeln!(f)?;
                    write_month(f, month)?;
                }
            }
            Err(err) => writeln!(f, "\ncalendar unavailable: {}", err)?,
        }

        Ok(())
    }
}

fn write_month(f: &mut fmt::Formatter<'_>, month: &MonthGrid) -> fmt::Result {
    writeln!(
        f,
        "{}{}",
        month.title(),
        if month.is_current { " *" } else { "" }
    )?;
    for header in WEEKDAY_HEADERS.iter() {
        write!(f, "{:>3} ", header)?;
    }
    writeln!(f)?;

    for week in month.weeks() {
        for cell in week {
            match cell.highlight {
                Highlight::Today => write!(f, "[{:>2}]", cell.day)?,
                Highlight::Red => write!(f, " {:>2}*", cell.day)?,
                Highlight::Blue => write!(f, " {:>2}+", cell.day)?,
                Highlight::Neutral => write!(f, " {:>2} ", cell.day)?,
                Highlight::Muted => write!(f, "({:>2})", cell.day)?,
            }
        }
        writeln!(f)?;
    }

    Ok(())
}

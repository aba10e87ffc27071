use piet::kurbo::{Circle, Point, Rect, RoundedRect};
use piet::{Color, FontFamily, RenderContext, Text, TextLayout, TextLayoutBuilder};

use crate::calendar::{Highlight, MonthGrid, WEEKDAY_HEADERS};
use crate::view::{Dashboard, LOADING_ALPHA, NEXT_MONTH_ALPHA};

pub const BACKGROUND: Color = Color::BLACK;
pub const CARD: Color = Color::rgb8(0x0d, 0x0d, 0x0d);
pub const TEXT: Color = Color::WHITE;
pub const SECONDARY: Color = Color::rgb8(0x9c, 0xa3, 0xaf);
pub const FAINT: Color = Color::rgb8(0x4b, 0x55, 0x63);
pub const RED: Color = Color::rgb8(0xef, 0x44, 0x44);
pub const BLUE: Color = Color::rgb8(0x60, 0xa5, 0xfa);
pub const ORANGE: Color = Color::rgb8(0xfb, 0x92, 0x3c);
pub const GREEN: Color = Color::rgb8(0x22, 0xc5, 0x5e);

const CARD_RADIUS: f64 = 32.;
const INSET: f64 = 20.;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Anchor {
    Left,
    Center,
    Right,
}

/// One run of text. `at` is the top edge at the anchor point.
#[derive(Clone, Debug)]
pub struct Label {
    pub text: String,
    pub at: Point,
    pub anchor: Anchor,
    pub size: f64,
    pub color: Color,
}

/// Everything to draw for one frame, in painting order.
#[derive(Clone, Debug, Default)]
pub struct Scene {
    pub cards: Vec<RoundedRect>,
    pub dots: Vec<(Circle, Color)>,
    pub labels: Vec<Label>,
}

impl Scene {
    fn text(&mut self, text: impl Into<String>, at: (f64, f64), anchor: Anchor, size: f64, color: Color) {
        self.labels.push(Label {
            text: text.into(),
            at: at.into(),
            anchor,
            size,
            color,
        });
    }

    pub fn layout(dashboard: &Dashboard) -> Self {
        let geometry = dashboard.geometry();
        let mut scene = Self::default();

        for rect in [
            geometry.clock,
            geometry.weather,
            geometry.forecast,
            geometry.calendar,
        ] {
            scene.cards.push(RoundedRect::from_rect(rect, CARD_RADIUS));
        }

        scene.clock(dashboard, geometry.clock);
        scene.weather(dashboard, geometry.weather);
        scene.forecast(dashboard, geometry.forecast);
        scene.calendar(dashboard, geometry.calendar);

        scene
    }

    fn clock(&mut self, dashboard: &Dashboard, card: Rect) {
        let battery = dashboard.battery;
        let badge = if battery.is_charging() {
            GREEN
        } else if battery.is_low() {
            RED
        } else {
            SECONDARY
        };
        self.text(
            dashboard.battery_text(),
            (card.x0 + INSET, card.y0 + 12.),
            Anchor::Left,
            10.,
            badge,
        );
        if dashboard.loading {
            self.text("updating", (card.x1 - INSET, card.y0 + 12.), Anchor::Right, 10., BLUE);
        }

        let font = dashboard.clock_font_px();
        let (clock, seconds) = dashboard.clock_text();
        let center = card.center();
        let top = center.y - font / 2.;
        // Seconds sit to the right at a third of the size, sharing the baseline.
        self.text(clock, (center.x - font * 0.3, top), Anchor::Center, font, TEXT);
        self.text(
            seconds,
            (center.x + font * 1.3, top + font * 0.6),
            Anchor::Left,
            font * 0.3,
            FAINT,
        );
    }

    fn weather(&mut self, dashboard: &Dashboard, card: Rect) {
        let alpha = if dashboard.loading { LOADING_ALPHA } else { 1. };
        let current = &dashboard.weather.current;
        let (left, right) = (card.x0 + INSET, card.x1 - INSET);

        self.text(
            current.condition.label(),
            (left, card.y0 + INSET),
            Anchor::Left,
            12.,
            SECONDARY.with_alpha(alpha),
        );
        self.text(
            format!("{}°", current.temperature),
            (right, card.y0 + INSET),
            Anchor::Right,
            44.,
            TEXT.with_alpha(alpha),
        );
        self.text(
            format!("L:{}°", current.low),
            (right - 48., card.y0 + INSET + 52.),
            Anchor::Right,
            10.,
            BLUE.with_alpha(alpha),
        );
        self.text(
            format!("H:{}°", current.high),
            (right, card.y0 + INSET + 52.),
            Anchor::Right,
            10.,
            ORANGE.with_alpha(alpha),
        );

        let rows = [
            ("Humidity", format!("{}%", current.humidity)),
            (
                "Dust PM10 / PM2.5",
                format!("{} / {}", current.pm10, current.pm2_5),
            ),
        ];
        for (index, (name, value)) in rows.iter().enumerate() {
            let y = card.y1 - INSET - 56. + index as f64 * 18.;
            self.text(*name, (left, y), Anchor::Left, 11., SECONDARY.with_alpha(alpha));
            self.text(value.clone(), (right, y), Anchor::Right, 11., TEXT.with_alpha(alpha));
        }
        self.text(
            current.location.to_uppercase(),
            (left, card.y1 - INSET - 10.),
            Anchor::Left,
            8.,
            FAINT.with_alpha(alpha),
        );
    }

    fn forecast(&mut self, dashboard: &Dashboard, card: Rect) {
        let alpha = if dashboard.loading { LOADING_ALPHA } else { 1. };
        let forecast = &dashboard.weather.forecast;
        let half = (card.height() - 2. * INSET) / 2.;

        for (index, (name, accent, day)) in [
            ("TOMORROW", BLUE, &forecast.tomorrow),
            ("DAY AFTER", SECONDARY, &forecast.day_after),
        ]
        .iter()
        .enumerate()
        {
            let top = card.y0 + INSET + index as f64 * half;
            self.text(*name, (card.x0 + INSET, top), Anchor::Left, 10., accent.with_alpha(alpha));
            self.text(
                day.condition.label(),
                (card.x0 + INSET, top + 16.),
                Anchor::Left,
                12.,
                SECONDARY.with_alpha(alpha),
            );
            self.text(
                format!("{}°", day.high),
                (card.x1 - INSET, top),
                Anchor::Right,
                20.,
                TEXT.with_alpha(alpha),
            );
            self.text(
                format!("{}°", day.low),
                (card.x1 - INSET, top + 26.),
                Anchor::Right,
                10.,
                SECONDARY.with_alpha(alpha),
            );
        }
    }

    fn calendar(&mut self, dashboard: &Dashboard, card: Rect) {
        let months = match dashboard.months() {
            Ok(months) => months,
            Err(err) => {
                self.text(
                    format!("calendar unavailable: {}", err),
                    (card.x0 + INSET, card.y0 + INSET),
                    Anchor::Left,
                    10.,
                    FAINT,
                );
                return;
            }
        };

        let block = (card.height() - 2. * INSET) / 2.;
        for (index, month) in months.iter().enumerate() {
            let area = Rect::new(
                card.x0 + INSET,
                card.y0 + INSET + index as f64 * block,
                card.x1 - INSET,
                card.y0 + INSET + (index + 1) as f64 * block,
            );
            self.month(month, area);
        }
    }

    fn month(&mut self, month: &MonthGrid, area: Rect) {
        let alpha = if month.is_current { 1. } else { NEXT_MONTH_ALPHA };
        let column = area.width() / 7.;
        // Title, weekday headers, and up to six weeks.
        let row = area.height() / 8.;
        let size = (row * 0.5).clamp(8., 18.);

        self.text(month.title(), (area.x0, area.y0), Anchor::Left, size * 1.1, TEXT.with_alpha(alpha));
        if month.is_current {
            self.dots.push((Circle::new((area.x1 - 4., area.y0 + size * 0.6), 3.), RED));
        }

        for (index, header) in WEEKDAY_HEADERS.iter().enumerate() {
            let color = match index {
                0 => RED,
                6 => BLUE,
                _ => FAINT,
            };
            self.text(
                *header,
                (area.x0 + (index as f64 + 0.5) * column, area.y0 + row),
                Anchor::Center,
                size * 0.6,
                color.with_alpha(alpha * 0.8),
            );
        }

        for (index, cell) in month.cells.iter().enumerate() {
            let center_x = area.x0 + ((index % 7) as f64 + 0.5) * column;
            let top = area.y0 + (index / 7 + 2) as f64 * row;

            let color = match cell.highlight {
                Highlight::Today => {
                    let radius = (row.min(column) / 2. - 1.).max(1.);
                    self.dots.push((
                        Circle::new((center_x, top + size / 2.), radius),
                        TEXT.with_alpha(alpha),
                    ));
                    BACKGROUND
                }
                Highlight::Red => RED,
                Highlight::Blue => BLUE,
                Highlight::Neutral => TEXT,
                Highlight::Muted => FAINT,
            };

            self.text(
                cell.day.to_string(),
                (center_x, top),
                Anchor::Center,
                size,
                color.with_alpha(alpha),
            );
        }
    }
}

/// Paint `dashboard` onto any piet surface.
pub fn render<R: RenderContext>(ctx: &mut R, dashboard: &Dashboard) -> Result<(), piet::Error> {
    let scene = Scene::layout(dashboard);

    ctx.clear(None, BACKGROUND);
    for card in &scene.cards {
        ctx.fill(*card, &CARD);
    }
    for (dot, color) in &scene.dots {
        ctx.fill(*dot, color);
    }

    for label in &scene.labels {
        let layout = ctx
            .text()
            .new_text_layout(label.text.clone())
            .font(FontFamily::SYSTEM_UI, label.size)
            .text_color(label.color)
            .build()?;

        let width = layout.size().width;
        let x = match label.anchor {
            Anchor::Left => label.at.x,
            Anchor::Center => label.at.x - width / 2.,
            Anchor::Right => label.at.x - width,
        };
        ctx.draw_text(&layout, (x, label.at.y));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use time::macros::datetime;

    use super::*;
    use crate::battery::BatteryStatus;
    use crate::holiday::Holiday;
    use crate::preferences::{DeviceClass, LayoutPreferences};
    use crate::weather::WeatherSnapshot;

    fn dashboard() -> Dashboard {
        Dashboard {
            now: datetime!(2024-04-15 21:30:00 +9),
            weather: WeatherSnapshot::default(),
            loading: false,
            battery: BatteryStatus::default(),
            holidays: Arc::new(vec![Holiday {
                date: "2024-05-06".to_string(),
                name: "대체공휴일".to_string(),
            }]),
            class: DeviceClass::Desktop,
            layout: LayoutPreferences::default().desktop,
            viewport: (1280, 800),
        }
    }

    fn label<'a>(scene: &'a Scene, text: &str) -> &'a Label {
        scene
            .labels
            .iter()
            .find(|label| label.text == text)
            .unwrap_or_else(|| panic!("no label {:?}", text))
    }

    fn alpha(color: Color) -> f64 {
        color.as_rgba().3
    }

    #[test]
    fn clock_uses_the_configured_size() {
        let scene = Scene::layout(&dashboard());
        assert_eq!(label(&scene, "21:30").size, 224.);
        assert_eq!(scene.cards.len(), 4);
    }

    #[test]
    fn weather_dims_while_loading() {
        let mut dashboard = dashboard();
        let scene = Scene::layout(&dashboard);
        assert_eq!(alpha(label(&scene, "11°").color), 1.);
        assert!(scene.labels.iter().all(|label| label.text != "updating"));

        dashboard.loading = true;
        let scene = Scene::layout(&dashboard);
        assert!((alpha(label(&scene, "11°").color) - LOADING_ALPHA).abs() < 0.01);
        assert!((alpha(label(&scene, "TOMORROW").color) - LOADING_ALPHA).abs() < 0.01);
        label(&scene, "updating");
        // The clock never dims.
        assert_eq!(alpha(label(&scene, "21:30").color), 1.);
    }

    #[test]
    fn low_battery_badge_is_red() {
        let mut dashboard = dashboard();
        dashboard.battery = BatteryStatus::new(9, Some(false));
        let scene = Scene::layout(&dashboard);
        assert_eq!(label(&scene, "9% !").color, RED);

        dashboard.battery = BatteryStatus::new(9, Some(true));
        let scene = Scene::layout(&dashboard);
        assert_eq!(label(&scene, "9% +").color, GREEN);
    }

    #[test]
    fn next_month_is_dimmed() {
        let scene = Scene::layout(&dashboard());
        assert_eq!(alpha(label(&scene, "April 2024").color), 1.);
        assert!((alpha(label(&scene, "May 2024").color) - NEXT_MONTH_ALPHA).abs() < 0.01);
        // One marker for the current month, one for today.
        assert_eq!(scene.dots.len(), 2);
    }

    #[test]
    fn holiday_in_next_month_is_red() {
        let scene = Scene::layout(&dashboard());
        let may_sixth = scene
            .labels
            .iter()
            .filter(|label| label.text == "6")
            .last()
            .unwrap();
        let (r, g, b, _) = may_sixth.color.as_rgba();
        assert_eq!((r, g, b), {
            let (r, g, b, _) = RED.as_rgba();
            (r, g, b)
        });
    }

    #[test]
    fn renders_onto_any_context() {
        let mut ctx = piet::NullRenderContext::new();
        render(&mut ctx, &dashboard()).unwrap();

        let mut tiny = dashboard();
        tiny.viewport = (0, 0);
        tiny.class = DeviceClass::Mobile;
        render(&mut ctx, &tiny).unwrap();
    }
}

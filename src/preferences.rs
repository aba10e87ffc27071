use std::convert::TryFrom;
use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use log::{debug, error, info, warn};
use tokio::sync::watch;

use crate::error::{Error, Result};

/// Coarse viewport bucket selecting which slice of the layout table applies.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum DeviceClass {
    Mobile,
    Tablet,
    Desktop,
}

impl DeviceClass {
    pub const ALL: [DeviceClass; 3] = [Self::Mobile, Self::Tablet, Self::Desktop];

    pub fn from_width(width: u32) -> Self {
        match width {
            0..=767 => Self::Mobile,
            768..=1023 => Self::Tablet,
            _ => Self::Desktop,
        }
    }

    pub fn key(&self) -> &'static str {
        match self {
            Self::Mobile => "mobile",
            Self::Tablet => "tablet",
            Self::Desktop => "desktop",
        }
    }
}

impl fmt::Display for DeviceClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// Proportions for one device class.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct PanelLayout {
    /// Flex weight of the clock card.
    pub clock: f64,
    /// Clock digit size in rem.
    pub clock_font_size: f64,
    /// Flex weight of the weather row.
    pub weather: f64,
    /// Calendar column width, percent of the viewport.
    pub calendar: f64,
}

impl PanelLayout {
    pub fn get(&self, field: Field) -> f64 {
        match field {
            Field::Clock => self.clock,
            Field::ClockFontSize => self.clock_font_size,
            Field::Weather => self.weather,
            Field::Calendar => self.calendar,
        }
    }

    fn set(&mut self, field: Field, value: f64) {
        match field {
            Field::Clock => self.clock = value,
            Field::ClockFontSize => self.clock_font_size = value,
            Field::Weather => self.weather = value,
            Field::Calendar => self.calendar = value,
        }
    }
}

/// One adjustable value of a [`PanelLayout`].
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Field {
    Clock,
    ClockFontSize,
    Weather,
    Calendar,
}

impl Field {
    pub const ALL: [Field; 4] = [
        Self::Clock,
        Self::ClockFontSize,
        Self::Weather,
        Self::Calendar,
    ];

    /// Key in the stored blob.
    pub fn key(&self) -> &'static str {
        match self {
            Self::Clock => "clock",
            Self::ClockFontSize => "clockFontSize",
            Self::Weather => "weather",
            Self::Calendar => "calendar",
        }
    }

    /// Adjustment range and step: `(min, max, step)`.
    pub fn range(&self) -> (f64, f64, f64) {
        match self {
            Self::Clock | Self::Weather => (1., 10., 1.),
            Self::ClockFontSize => (3., 20., 0.5),
            Self::Calendar => (20., 60., 1.),
        }
    }

    /// Snap `value` to the step and keep it inside the range.
    pub fn clamp(&self, value: f64) -> f64 {
        let (min, max, step) = self.range();
        ((value / step).round() * step).max(min).min(max)
    }
}

impl FromStr for Field {
    type Err = &'static str;

    fn from_str(value: &str) -> std::result::Result<Self, Self::Err> {
        match value {
            "clock" => Ok(Self::Clock),
            "font" | "clockFontSize" => Ok(Self::ClockFontSize),
            "weather" => Ok(Self::Weather),
            "calendar" => Ok(Self::Calendar),
            _ => Err("expected clock, font, weather or calendar"),
        }
    }
}

/// The full layout table, one [`PanelLayout`] per device class.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct LayoutPreferences {
    pub mobile: PanelLayout,
    pub tablet: PanelLayout,
    pub desktop: PanelLayout,
}

impl Default for LayoutPreferences {
    fn default() -> Self {
        Self {
            mobile: PanelLayout {
                clock: 3.,
                clock_font_size: 5.,
                weather: 5.,
                calendar: 40.,
            },
            tablet: PanelLayout {
                clock: 4.,
                clock_font_size: 6.,
                weather: 4.,
                calendar: 35.,
            },
            desktop: PanelLayout {
                clock: 5.,
                clock_font_size: 14.,
                weather: 4.,
                calendar: 32.,
            },
        }
    }
}

impl LayoutPreferences {
    pub fn get(&self, class: DeviceClass) -> &PanelLayout {
        match class {
            DeviceClass::Mobile => &self.mobile,
            DeviceClass::Tablet => &self.tablet,
            DeviceClass::Desktop => &self.desktop,
        }
    }

    pub fn get_mut(&mut self, class: DeviceClass) -> &mut PanelLayout {
        match class {
            DeviceClass::Mobile => &mut self.mobile,
            DeviceClass::Tablet => &mut self.tablet,
            DeviceClass::Desktop => &mut self.desktop,
        }
    }
}

/// Same shape the browser dashboard kept under `layoutSettings`:
///
/// ```json
/// {
///     "mobile": { "clock": 3, "clockFontSize": 5, "weather": 5, "calendar": 40 },
///     "tablet": { "clock": 4, "clockFontSize": 6, "weather": 4, "calendar": 35 },
///     "desktop": { "clock": 5, "clockFontSize": 14, "weather": 4, "calendar": 32 }
/// }
/// ```
impl TryFrom<json::JsonValue> for LayoutPreferences {
    type Error = &'static str;

    fn try_from(json: json::JsonValue) -> std::result::Result<Self, Self::Error> {
        let mut preferences = Self::default();

        for class in DeviceClass::ALL.iter() {
            let entry = &json[class.key()];
            if !entry.is_object() {
                return Err("Missing device class.");
            }

            let layout = preferences.get_mut(*class);
            for field in Field::ALL.iter() {
                let value = entry[field.key()]
                    .as_f64()
                    .filter(|v| v.is_finite() && *v > 0.)
                    .ok_or("Missing or invalid layout value.")?;
                layout.set(*field, value);
            }
        }

        Ok(preferences)
    }
}

impl From<&LayoutPreferences> for json::JsonValue {
    fn from(preferences: &LayoutPreferences) -> Self {
        let mut json = json::JsonValue::new_object();

        for class in DeviceClass::ALL.iter() {
            let layout = preferences.get(*class);
            let mut entry = json::JsonValue::new_object();
            for field in Field::ALL.iter() {
                entry[field.key()] = layout.get(*field).into();
            }
            json[class.key()] = entry;
        }

        json
    }
}

/// How [`PreferenceStore::load`] came by its table.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Origin {
    Stored,
    /// Nothing saved yet.
    Missing,
    /// Saved data could not be read or parsed.
    Unreadable,
}

#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Loaded {
    pub preferences: LayoutPreferences,
    pub origin: Origin,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Persisted {
    Written,
    Failed,
}

/// A single JSON file holding the layout table. Best effort: failures are
/// logged, never raised, and the in-memory table stays authoritative.
#[derive(Clone, Debug)]
pub struct PreferenceStore {
    path: PathBuf,
}

impl PreferenceStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn load(&self) -> Loaded {
        let (preferences, origin) = match self.read() {
            Ok(Some(preferences)) => (preferences, Origin::Stored),
            Ok(None) => {
                debug!("No layout settings at {}, using defaults", self.path.display());
                (LayoutPreferences::default(), Origin::Missing)
            }
            Err(err) => {
                error!("Failed to load layout settings: {}", err);
                (LayoutPreferences::default(), Origin::Unreadable)
            }
        };

        Loaded {
            preferences,
            origin,
        }
    }

    pub fn save(&self, preferences: &LayoutPreferences) -> Persisted {
        match self.write(preferences) {
            Ok(()) => Persisted::Written,
            Err(err) => {
                error!("Failed to save layout settings: {}", err);
                Persisted::Failed
            }
        }
    }

    fn read(&self) -> Result<Option<LayoutPreferences>> {
        let text = match fs::read_to_string(&self.path) {
            Ok(text) => text,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(err.into()),
        };

        Ok(Some(LayoutPreferences::try_from(json::parse(&text)?)?))
    }

    fn write(&self, preferences: &LayoutPreferences) -> Result<()> {
        fs::write(&self.path, json::stringify(json::JsonValue::from(preferences)))
            .map_err(Error::from)
    }
}

/// The live layout table: the one writer, persisting after every change.
pub struct LayoutSettings {
    store: PreferenceStore,
    preferences: watch::Sender<LayoutPreferences>,
}

impl LayoutSettings {
    pub fn new(store: PreferenceStore, preferences: LayoutPreferences) -> Self {
        let (preferences, _) = watch::channel(preferences);
        Self { store, preferences }
    }

    pub fn subscribe(&self) -> watch::Receiver<LayoutPreferences> {
        self.preferences.subscribe()
    }

    pub fn current(&self) -> LayoutPreferences {
        *self.preferences.borrow()
    }

    /// Set one value for `class`, clamped to its adjustment range, and save.
    pub fn adjust(&self, class: DeviceClass, field: Field, value: f64) -> Persisted {
        let value = field.clamp(value);
        info!("Layout {} {} = {}", class, field.key(), value);
        self.update(|preferences| preferences.get_mut(class).set(field, value))
    }

    /// Restore the defaults for `class` only, and save.
    pub fn reset(&self, class: DeviceClass) -> Persisted {
        info!("Layout {} reset to defaults", class);
        self.update(|preferences| {
            *preferences.get_mut(class) = *LayoutPreferences::default().get(class)
        })
    }

    fn update(&self, change: impl FnOnce(&mut LayoutPreferences)) -> Persisted {
        self.preferences.send_modify(change);
        let persisted = self.store.save(&self.current());
        if persisted == Persisted::Failed {
            warn!("Layout change kept in memory only");
        }
        persisted
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn device_class_boundaries() {
        assert_eq!(DeviceClass::from_width(0), DeviceClass::Mobile);
        assert_eq!(DeviceClass::from_width(767), DeviceClass::Mobile);
        assert_eq!(DeviceClass::from_width(768), DeviceClass::Tablet);
        assert_eq!(DeviceClass::from_width(1023), DeviceClass::Tablet);
        assert_eq!(DeviceClass::from_width(1024), DeviceClass::Desktop);
        assert_eq!(DeviceClass::from_width(3840), DeviceClass::Desktop);
    }

    #[test]
    fn clamping_follows_the_sliders() {
        assert_eq!(Field::Clock.clamp(0.), 1.);
        assert_eq!(Field::Clock.clamp(12.), 10.);
        assert_eq!(Field::Weather.clamp(4.4), 4.);
        assert_eq!(Field::ClockFontSize.clamp(7.3), 7.5);
        assert_eq!(Field::ClockFontSize.clamp(2.), 3.);
        assert_eq!(Field::Calendar.clamp(75.), 60.);
        assert_eq!(Field::Calendar.clamp(10.), 20.);
    }

    #[test]
    fn missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let store = PreferenceStore::new(dir.path().join("layoutSettings.json"));

        let loaded = store.load();
        assert_eq!(loaded.origin, Origin::Missing);
        assert_eq!(loaded.preferences, LayoutPreferences::default());
    }

    #[test]
    fn corrupt_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("layoutSettings.json");

        for garbage in [
            "{not json",
            r#"{"mobile": {"clock": 3}}"#,
            r#"{"mobile": {"clock": 3, "clockFontSize": 5, "weather": 5, "calendar": 40},
                "tablet": {"clock": -4, "clockFontSize": 6, "weather": 4, "calendar": 35},
                "desktop": {"clock": 5, "clockFontSize": 14, "weather": 4, "calendar": 32}}"#,
        ] {
            fs::write(&path, garbage).unwrap();
            let loaded = PreferenceStore::new(&path).load();
            assert_eq!(loaded.origin, Origin::Unreadable, "{}", garbage);
            assert_eq!(loaded.preferences, LayoutPreferences::default());
        }
    }

    #[test]
    fn reads_the_browser_format() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("layoutSettings.json");
        fs::write(
            &path,
            r#"{"mobile":{"clock":2,"clockFontSize":4.5,"weather":6,"calendar":45},
               "tablet":{"clock":4,"clockFontSize":6,"weather":4,"calendar":35},
               "desktop":{"clock":7,"clockFontSize":18,"weather":3,"calendar":25}}"#,
        )
        .unwrap();

        let loaded = PreferenceStore::new(&path).load();
        assert_eq!(loaded.origin, Origin::Stored);
        assert_eq!(loaded.preferences.mobile.clock_font_size, 4.5);
        assert_eq!(loaded.preferences.desktop.calendar, 25.);
    }

    #[test]
    fn save_of_load_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let store = PreferenceStore::new(dir.path().join("layoutSettings.json"));

        let first = store.load().preferences;
        assert_eq!(store.save(&first), Persisted::Written);
        let text = fs::read_to_string(store.path()).unwrap();

        let second = store.load();
        assert_eq!(second.origin, Origin::Stored);
        assert_eq!(second.preferences, first);

        assert_eq!(store.save(&second.preferences), Persisted::Written);
        assert_eq!(fs::read_to_string(store.path()).unwrap(), text);
    }

    #[test]
    fn unwritable_store_reports_failure() {
        let dir = tempfile::tempdir().unwrap();
        let store = PreferenceStore::new(dir.path().join("missing").join("layoutSettings.json"));
        assert_eq!(store.save(&LayoutPreferences::default()), Persisted::Failed);
    }

    #[test]
    fn every_adjustment_is_persisted() {
        let dir = tempfile::tempdir().unwrap();
        let store = PreferenceStore::new(dir.path().join("layoutSettings.json"));
        let settings = LayoutSettings::new(store.clone(), store.load().preferences);
        let mut updates = settings.subscribe();

        assert_eq!(
            settings.adjust(DeviceClass::Tablet, Field::Calendar, 50.),
            Persisted::Written
        );
        assert!(updates.has_changed().unwrap());
        assert_eq!(updates.borrow_and_update().tablet.calendar, 50.);
        assert_eq!(store.load().preferences.tablet.calendar, 50.);

        settings.adjust(DeviceClass::Tablet, Field::Clock, 99.);
        assert_eq!(store.load().preferences.tablet.clock, 10.);

        settings.reset(DeviceClass::Tablet);
        let reloaded = store.load().preferences;
        assert_eq!(reloaded.tablet, LayoutPreferences::default().tablet);
        assert_eq!(settings.current(), reloaded);
    }

    #[test]
    fn reset_leaves_other_classes_alone() {
        let dir = tempfile::tempdir().unwrap();
        let store = PreferenceStore::new(dir.path().join("layoutSettings.json"));
        let settings = LayoutSettings::new(store, LayoutPreferences::default());

        settings.adjust(DeviceClass::Mobile, Field::ClockFontSize, 9.);
        settings.adjust(DeviceClass::Desktop, Field::ClockFontSize, 9.);
        settings.reset(DeviceClass::Desktop);

        assert_eq!(settings.current().mobile.clock_font_size, 9.);
        assert_eq!(settings.current().desktop.clock_font_size, 14.);
    }
}

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use log::debug;
use tokio::sync::watch;

/// Below this the badge shows the level in red.
pub const LOW_LEVEL: u8 = 15;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct BatteryStatus {
    /// Percent, always within `0..=100`.
    pub level: u8,
    /// `None` when the supply does not say.
    pub charging: Option<bool>,
}

impl Default for BatteryStatus {
    fn default() -> Self {
        Self {
            level: 100,
            charging: Some(false),
        }
    }
}

impl BatteryStatus {
    pub fn new(level: i64, charging: Option<bool>) -> Self {
        Self {
            level: level.clamp(0, 100) as u8,
            charging,
        }
    }

    pub fn is_low(&self) -> bool {
        self.level <= LOW_LEVEL
    }

    pub fn is_charging(&self) -> bool {
        self.charging == Some(true)
    }
}

/// Something that can be asked for the current battery state.
pub trait PowerSupply: Send + Sync {
    fn read(&self) -> io::Result<BatteryStatus>;
}

/// A battery under the kernel's power-supply class, e.g. `/sys/class/power_supply/BAT0`.
#[derive(Clone, Debug)]
pub struct SysfsBattery {
    dir: PathBuf,
}

impl SysfsBattery {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// The first supply under `root` whose `type` is `Battery`, if any.
    pub fn discover(root: &Path) -> Option<Self> {
        let mut entries: Vec<PathBuf> = fs::read_dir(root)
            .ok()?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .collect();
        entries.sort();

        entries
            .into_iter()
            .find(|dir| {
                fs::read_to_string(dir.join("type"))
                    .map(|kind| kind.trim() == "Battery")
                    .unwrap_or(false)
            })
            .map(Self::new)
    }
}

impl PowerSupply for SysfsBattery {
    fn read(&self) -> io::Result<BatteryStatus> {
        let capacity = fs::read_to_string(self.dir.join("capacity"))?;
        let level = capacity
            .trim()
            .parse::<i64>()
            .map_err(|err| io::Error::new(io::ErrorKind::InvalidData, err))?;

        let charging = match fs::read_to_string(self.dir.join("status")) {
            Ok(status) => match status.trim() {
                "Charging" | "Full" => Some(true),
                "Discharging" | "Not charging" => Some(false),
                _ => None,
            },
            Err(_) => None,
        };

        Ok(BatteryStatus::new(level, charging))
    }
}

/// Mirrors a [`PowerSupply`] into a watch channel, publishing only on change.
pub struct BatteryMonitor {
    supply: Box<dyn PowerSupply>,
    status: watch::Sender<BatteryStatus>,
}

impl BatteryMonitor {
    pub fn new(supply: Box<dyn PowerSupply>) -> Self {
        let (status, _) = watch::channel(BatteryStatus::default());
        Self { supply, status }
    }

    pub fn subscribe(&self) -> watch::Receiver<BatteryStatus> {
        self.status.subscribe()
    }

    /// Read the supply once. Returns whether the published status changed.
    pub fn poll(&self) -> bool {
        match self.supply.read() {
            Ok(reading) => self.status.send_if_modified(|status| {
                if *status == reading {
                    false
                } else {
                    debug!("Battery {}% charging={:?}", reading.level, reading.charging);
                    *status = reading;
                    true
                }
            }),
            Err(err) => {
                debug!("Battery read failed: {}", err);
                false
            }
        }
    }
}

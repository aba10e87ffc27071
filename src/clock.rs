use std::env;
use std::fs;
use std::path::Path;

use chrono::{DateTime, Offset, TimeZone};
use chrono_tz::Tz;
use time::{OffsetDateTime, UtcOffset};

/// Wall-clock source.
///
/// The offset is looked up again on every reading, so daylight-saving
/// changes show up without a restart.
#[derive(Copy, Clone, Debug)]
pub enum Clock {
    /// A named IANA zone.
    Zone(Tz),
    /// Whatever the host considers local (`TZ`, `/etc/localtime`).
    Local,
    Fixed(UtcOffset),
}

impl Clock {
    /// The named zone if it is known, host local time otherwise.
    pub fn for_zone(name: Option<&str>) -> Self {
        match name.map(str::parse::<Tz>) {
            Some(Ok(zone)) => Self::Zone(zone),
            _ => Self::Local,
        }
    }

    /// The offset in effect at the instant `at`.
    pub fn offset_at(&self, at: OffsetDateTime) -> UtcOffset {
        let Some(instant) = DateTime::from_timestamp(at.unix_timestamp(), 0) else {
            return UtcOffset::UTC;
        };
        let utc = instant.naive_utc();

        let seconds = match self {
            Self::Zone(zone) => zone.offset_from_utc_datetime(&utc).fix().local_minus_utc(),
            Self::Local => chrono::Local.offset_from_utc_datetime(&utc).local_minus_utc(),
            Self::Fixed(offset) => return *offset,
        };
        UtcOffset::from_whole_seconds(seconds).unwrap_or(UtcOffset::UTC)
    }

    /// `at` as seen on this clock's wall.
    pub fn at(&self, at: OffsetDateTime) -> OffsetDateTime {
        at.to_offset(self.offset_at(at))
    }

    pub fn now(&self) -> OffsetDateTime {
        self.at(OffsetDateTime::now_utc())
    }
}

/// Zero-padded `(hours, minutes, seconds)` for the clock card.
pub fn clock_digits(time: OffsetDateTime) -> (String, String, String) {
    (
        format!("{:02}", time.hour()),
        format!("{:02}", time.minute()),
        format!("{:02}", time.second()),
    )
}

/// The host's IANA zone name, e.g. `Asia/Seoul`.
///
/// Looks at `TZ`, then `/etc/timezone`, then where `/etc/localtime` points.
pub fn host_timezone() -> Option<String> {
    env::var("TZ")
        .ok()
        .and_then(|tz| zone_name(tz.trim_start_matches(':')))
        .or_else(|| {
            fs::read_to_string("/etc/timezone")
                .ok()
                .and_then(|text| text.lines().next().and_then(zone_name))
        })
        .or_else(|| {
            fs::read_link("/etc/localtime")
                .ok()
                .and_then(|target| zone_from_path(&target))
        })
}

fn zone_name(value: &str) -> Option<String> {
    let value = value.trim();
    // Absolute paths (`TZ=/usr/share/zoneinfo/...`) name the zone after `zoneinfo/`.
    if value.starts_with('/') {
        return zone_from_path(Path::new(value));
    }
    if value.is_empty() || value.contains(',') {
        None
    } else {
        Some(value.to_string())
    }
}

fn zone_from_path(path: &Path) -> Option<String> {
    let path = path.to_str()?;
    let (_, zone) = path.split_once("zoneinfo/")?;
    let zone = zone.trim_start_matches("posix/").trim_start_matches("right/");
    if zone.is_empty() {
        None
    } else {
        Some(zone.to_string())
    }
}

#[cfg(test)]
mod tests {
    use time::macros::{datetime, offset};

    use super::*;

    #[test]
    fn digits_are_padded() {
        let (h, m, s) = clock_digits(datetime!(2024-04-02 07:05:09 +9));
        assert_eq!((h.as_str(), m.as_str(), s.as_str()), ("07", "05", "09"));
    }

    #[test]
    fn fixed_clock_keeps_its_offset() {
        let clock = Clock::Fixed(offset!(+9));
        assert_eq!(clock.now().offset(), offset!(+9));
    }

    #[test]
    fn zone_follows_the_end_of_daylight_saving() {
        let clock = Clock::for_zone(Some("America/New_York"));
        assert!(matches!(clock, Clock::Zone(_)));

        assert_eq!(clock.offset_at(datetime!(2026-10-19 12:00 UTC)), offset!(-4));
        assert_eq!(clock.offset_at(datetime!(2026-11-02 12:00 UTC)), offset!(-5));

        // Clocks fall back from 02:00 EDT to 01:00 EST at 06:00 UTC on 1 November.
        let before = clock.at(datetime!(2026-11-01 05:59 UTC));
        let after = clock.at(datetime!(2026-11-01 06:00 UTC));
        assert_eq!((before.hour(), before.minute()), (1, 59));
        assert_eq!((after.hour(), after.minute()), (1, 0));
    }

    #[test]
    fn zone_follows_the_start_of_daylight_saving() {
        let clock = Clock::for_zone(Some("Europe/Berlin"));
        // Clocks jump from 02:00 CET to 03:00 CEST at 01:00 UTC on 29 March.
        assert_eq!(clock.at(datetime!(2026-03-29 00:59 UTC)).hour(), 1);
        assert_eq!(clock.at(datetime!(2026-03-29 01:00 UTC)).hour(), 3);
    }

    #[test]
    fn zone_without_daylight_saving() {
        let clock = Clock::for_zone(Some("Asia/Seoul"));
        assert_eq!(clock.offset_at(datetime!(2026-01-15 00:00 UTC)), offset!(+9));
        assert_eq!(clock.offset_at(datetime!(2026-07-15 00:00 UTC)), offset!(+9));
    }

    #[test]
    fn unknown_zones_fall_back_to_host_time() {
        assert!(matches!(Clock::for_zone(Some("Mars/Olympus_Mons")), Clock::Local));
        assert!(matches!(Clock::for_zone(None), Clock::Local));
    }

    #[test]
    fn zone_names() {
        assert_eq!(zone_name("Asia/Seoul").as_deref(), Some("Asia/Seoul"));
        assert_eq!(zone_name(" Europe/Berlin\n").as_deref(), Some("Europe/Berlin"));
        assert_eq!(
            zone_name("/usr/share/zoneinfo/America/New_York").as_deref(),
            Some("America/New_York")
        );
        // POSIX rule strings carry no zone name.
        assert_eq!(zone_name("EST5EDT,M3.2.0,M11.1.0"), None);
        assert_eq!(zone_name(""), None);
    }

    #[test]
    fn zones_from_localtime_links() {
        assert_eq!(
            zone_from_path(Path::new("/usr/share/zoneinfo/posix/Asia/Tokyo")).as_deref(),
            Some("Asia/Tokyo")
        );
        assert_eq!(zone_from_path(Path::new("/etc/localtime")), None);
    }
}

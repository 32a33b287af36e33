// SPDX-License-Identifier: GPL-3.0-or-later
use std::time::Duration;

use serde::Deserialize;

/// A newtype wrapper for intervals given in milliseconds.
#[derive(Copy, Clone, Debug, Deserialize, PartialEq, Eq)]
pub(crate) struct Milliseconds(u64);

impl From<Duration> for Milliseconds {
    fn from(duration: Duration) -> Self {
        Self(duration.as_millis() as u64)
    }
}

impl From<Milliseconds> for Duration {
    fn from(millis: Milliseconds) -> Self {
        Duration::from_millis(millis.0)
    }
}

fn default_camera_interval() -> Milliseconds {
    Milliseconds(33)
}

fn default_thermal_interval() -> Milliseconds {
    Milliseconds(250)
}

fn default_display_interval() -> Milliseconds {
    Milliseconds(33)
}

fn default_stats_interval() -> u64 {
    30
}

/// How long each loop sleeps after doing its work.
#[derive(Clone, Debug, Deserialize, PartialEq)]
pub(crate) struct TimingSettings {
    #[serde(default = "default_camera_interval")]
    pub(crate) camera_interval: Milliseconds,

    #[serde(default = "default_thermal_interval")]
    pub(crate) thermal_interval: Milliseconds,

    #[serde(default = "default_display_interval")]
    pub(crate) display_interval: Milliseconds,

    /// Seconds between statistics log messages. 0 disables them.
    #[serde(default = "default_stats_interval")]
    pub(crate) stats_interval: u64,
}

impl TimingSettings {
    pub(crate) fn stats_interval(&self) -> Option<Duration> {
        match self.stats_interval {
            0 => None,
            seconds => Some(Duration::from_secs(seconds)),
        }
    }
}

impl Default for TimingSettings {
    fn default() -> Self {
        Self {
            camera_interval: default_camera_interval(),
            thermal_interval: default_thermal_interval(),
            display_interval: default_display_interval(),
            stats_interval: default_stats_interval(),
        }
    }
}

#[cfg(test)]
mod test {
    use std::time::Duration;

    use super::{Milliseconds, TimingSettings};

    #[test]
    fn defaults() {
        let parsed: TimingSettings = toml::from_str("").unwrap();
        assert_eq!(parsed, TimingSettings::default());
        assert_eq!(Duration::from(parsed.camera_interval), Duration::from_millis(33));
        assert_eq!(Duration::from(parsed.thermal_interval), Duration::from_millis(250));
        assert_eq!(parsed.stats_interval(), Some(Duration::from_secs(30)));
    }

    #[test]
    fn stats_disabled() {
        let parsed: TimingSettings = toml::from_str("stats_interval = 0").unwrap();
        assert_eq!(parsed.stats_interval(), None);
    }

    #[test]
    fn millis_round_trip() {
        assert_eq!(
            Duration::from(Milliseconds::from(Duration::from_millis(1500))),
            Duration::from_millis(1500)
        );
    }
}

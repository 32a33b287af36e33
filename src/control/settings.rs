// SPDX-License-Identifier: GPL-3.0-or-later
use std::path::PathBuf;

use anyhow::bail;
use serde::Deserialize;

use crate::settings::Milliseconds;

fn default_enabled() -> bool {
    true
}

fn default_debounce() -> Milliseconds {
    std::time::Duration::from_secs(1).into()
}

fn default_shutdown_pin() -> u64 {
    16
}

fn default_pause_pin() -> u64 {
    20
}

fn default_screenshot_pin() -> u64 {
    21
}

fn default_shutdown_command() -> Vec<String> {
    ["sudo", "shutdown", "-h", "now"]
        .iter()
        .map(|arg| arg.to_string())
        .collect()
}

fn default_screenshot_dir() -> PathBuf {
    PathBuf::from("screenshots")
}

fn default_message_duration() -> Milliseconds {
    std::time::Duration::from_secs(1).into()
}

/// The three buttons, and what they do.
#[derive(Clone, Debug, Deserialize, PartialEq)]
pub(crate) struct ControlSettings {
    /// Watch the GPIO buttons at all.
    #[serde(default = "default_enabled")]
    pub(crate) enabled: bool,

    #[serde(default = "default_debounce")]
    pub(crate) debounce: Milliseconds,

    /// BCM pin numbers.
    #[serde(default = "default_shutdown_pin")]
    pub(crate) shutdown_pin: u64,

    #[serde(default = "default_pause_pin")]
    pub(crate) pause_pin: u64,

    #[serde(default = "default_screenshot_pin")]
    pub(crate) screenshot_pin: u64,

    /// Program and arguments run when the shutdown button is pressed.
    #[serde(default = "default_shutdown_command")]
    pub(crate) shutdown_command: Vec<String>,

    #[serde(default = "default_screenshot_dir")]
    pub(crate) screenshot_dir: PathBuf,

    /// How long the "screenshot saved" message stays up.
    #[serde(default = "default_message_duration")]
    pub(crate) message_duration: Milliseconds,
}

impl ControlSettings {
    pub(crate) fn validate(&self) -> anyhow::Result<()> {
        let pins = [self.shutdown_pin, self.pause_pin, self.screenshot_pin];
        if pins[0] == pins[1] || pins[1] == pins[2] || pins[0] == pins[2] {
            bail!("Each control needs its own pin (given {:?})", pins);
        }
        if self.shutdown_command.is_empty() {
            bail!("shutdown_command must name a program to run");
        }
        Ok(())
    }
}

impl Default for ControlSettings {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            debounce: default_debounce(),
            shutdown_pin: default_shutdown_pin(),
            pause_pin: default_pause_pin(),
            screenshot_pin: default_screenshot_pin(),
            shutdown_command: default_shutdown_command(),
            screenshot_dir: default_screenshot_dir(),
            message_duration: default_message_duration(),
        }
    }
}

#[cfg(test)]
mod test {
    use std::path::PathBuf;
    use std::time::Duration;

    use super::ControlSettings;

    #[test]
    fn defaults() {
        let parsed: ControlSettings = toml::from_str("").unwrap();
        assert_eq!(parsed, ControlSettings::default());
        assert_eq!(Duration::from(parsed.debounce), Duration::from_millis(1000));
        assert_eq!(parsed.shutdown_command, vec!["sudo", "shutdown", "-h", "now"]);
        assert!(parsed.validate().is_ok());
    }

    #[test]
    fn custom() {
        let source = r#"
        enabled = false
        debounce = 200
        shutdown_pin = 5
        pause_pin = 6
        screenshot_pin = 13
        shutdown_command = ["systemctl", "poweroff"]
        screenshot_dir = "/home/pi/shots"
        message_duration = 2500
        "#;
        let parsed: ControlSettings = toml::from_str(source).unwrap();
        assert!(!parsed.enabled);
        assert_eq!(Duration::from(parsed.debounce), Duration::from_millis(200));
        assert_eq!(parsed.screenshot_pin, 13);
        assert_eq!(parsed.screenshot_dir, PathBuf::from("/home/pi/shots"));
        assert_eq!(
            Duration::from(parsed.message_duration),
            Duration::from_millis(2500)
        );
        assert!(parsed.validate().is_ok());
    }

    #[test]
    fn shared_pin() {
        let settings = ControlSettings {
            pause_pin: 16,
            ..ControlSettings::default()
        };
        assert!(settings.validate().is_err());
    }

    #[test]
    fn empty_command() {
        let settings = ControlSettings {
            shutdown_command: Vec::new(),
            ..ControlSettings::default()
        };
        assert!(settings.validate().is_err());
    }
}

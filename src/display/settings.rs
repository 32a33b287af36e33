// SPDX-License-Identifier: GPL-3.0-or-later
use std::path::PathBuf;

use serde::Deserialize;

use super::framebuffer::{Framebuffer, PixelFormat};
use super::headless::Headless;
use super::DisplaySink;

fn default_device() -> PathBuf {
    PathBuf::from("/dev/fb1")
}

fn default_width() -> u32 {
    240
}

fn default_height() -> u32 {
    320
}

fn default_backlight_duty() -> u8 {
    50
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(rename_all = "lowercase", tag = "kind")]
pub(crate) enum DisplayKind {
    Framebuffer {
        #[serde(default = "default_device")]
        device: PathBuf,

        #[serde(default = "default_width")]
        width: u32,

        #[serde(default = "default_height")]
        height: u32,

        #[serde(default)]
        format: PixelFormat,

        /// A sysfs backlight directory, ex: `/sys/class/backlight/fb_ili9341`.
        #[serde(default)]
        backlight: Option<PathBuf>,
    },
    Headless {
        #[serde(default = "default_width")]
        width: u32,

        #[serde(default = "default_height")]
        height: u32,
    },
}

impl Default for DisplayKind {
    fn default() -> Self {
        Self::Framebuffer {
            device: default_device(),
            width: default_width(),
            height: default_height(),
            format: PixelFormat::default(),
            backlight: None,
        }
    }
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
pub(crate) struct DisplaySettings {
    #[serde(flatten)]
    pub(crate) kind: DisplayKind,

    /// Backlight brightness while running, in percent.
    #[serde(default = "default_backlight_duty")]
    pub(crate) backlight_duty: u8,
}

impl Default for DisplaySettings {
    fn default() -> Self {
        Self {
            kind: DisplayKind::default(),
            backlight_duty: default_backlight_duty(),
        }
    }
}

impl DisplaySettings {
    pub(crate) fn create_sink(&self) -> anyhow::Result<Box<dyn DisplaySink + Send>> {
        Ok(match &self.kind {
            DisplayKind::Framebuffer {
                device,
                width,
                height,
                format,
                backlight,
            } => Box::new(Framebuffer::open(
                device,
                *width,
                *height,
                *format,
                backlight.as_deref(),
            )?),
            DisplayKind::Headless { width, height } => Box::new(Headless::new(*width, *height)),
        })
    }

    pub(crate) fn validate(&self) -> anyhow::Result<()> {
        let (width, height) = match &self.kind {
            DisplayKind::Framebuffer { width, height, .. } => (*width, *height),
            DisplayKind::Headless { width, height } => (*width, *height),
        };
        if width == 0 || height == 0 {
            anyhow::bail!("Display size must not be zero (given {}x{})", width, height);
        }
        if self.backlight_duty > 100 {
            anyhow::bail!(
                "backlight_duty is a percentage (given {})",
                self.backlight_duty
            );
        }
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use std::path::PathBuf;

    use super::{DisplayKind, DisplaySettings};
    use crate::display::framebuffer::PixelFormat;
    use crate::display::DisplaySink as _;

    #[test]
    fn defaults() {
        let parsed: DisplaySettings = toml::from_str("kind = \"framebuffer\"").unwrap();
        assert_eq!(parsed, DisplaySettings::default());
        assert!(parsed.validate().is_ok());
    }

    #[test]
    fn framebuffer_full() {
        let source = r#"
        kind = "framebuffer"
        device = "/dev/fb0"
        width = 320
        height = 240
        format = "xrgb8888"
        backlight = "/sys/class/backlight/rpi_backlight"
        backlight_duty = 80
        "#;
        let parsed: DisplaySettings = toml::from_str(source).unwrap();
        let expected = DisplaySettings {
            kind: DisplayKind::Framebuffer {
                device: PathBuf::from("/dev/fb0"),
                width: 320,
                height: 240,
                format: PixelFormat::Xrgb8888,
                backlight: Some(PathBuf::from("/sys/class/backlight/rpi_backlight")),
            },
            backlight_duty: 80,
        };
        assert_eq!(parsed, expected);
    }

    #[test]
    fn headless() {
        let parsed: DisplaySettings = toml::from_str("kind = \"headless\"").unwrap();
        let sink = parsed.create_sink().unwrap();
        assert_eq!((sink.width(), sink.height()), (240, 320));
    }

    #[test]
    fn invalid_duty() {
        let parsed: DisplaySettings =
            toml::from_str("kind = \"headless\"\nbacklight_duty = 150").unwrap();
        assert!(parsed.validate().is_err());
    }

    #[test]
    fn error_bad_format() {
        let parsed: Result<DisplaySettings, _> =
            toml::from_str("kind = \"framebuffer\"\nformat = \"rgb888\"");
        assert!(parsed.is_err());
    }
}

// SPDX-License-Identifier: GPL-3.0-or-later
use std::path::PathBuf;

use anyhow::Context as _;
use serde::Deserialize;
use serde_repr::Deserialize_repr;

use super::rpicam::Rpicam;
use super::still::StillImage;
use super::CameraSource;

/// Clockwise rotation applied to captured frames before they're scaled to the display.
// This enum is purely used to restrict the acceptable values for rotation.
#[derive(Clone, Copy, Deserialize_repr, PartialEq, Debug)]
#[repr(u16)]
pub(crate) enum Rotation {
    Zero = 0,
    Ninety = 90,
    OneEighty = 180,
    TwoSeventy = 270,
}

impl Default for Rotation {
    /// The camera module is mounted sideways relative to the LCD.
    fn default() -> Self {
        Self::Ninety
    }
}

fn default_command() -> String {
    "rpicam-vid".to_string()
}

fn default_width() -> u32 {
    640
}

fn default_height() -> u32 {
    480
}

fn default_framerate() -> u32 {
    30
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(rename_all = "lowercase", tag = "kind")]
pub(crate) enum CameraKind {
    /// A Raspberry Pi camera module, read through `rpicam-vid` streaming MJPEG.
    Rpicam {
        #[serde(default = "default_command")]
        command: String,

        #[serde(default = "default_width")]
        width: u32,

        #[serde(default = "default_height")]
        height: u32,

        #[serde(default = "default_framerate")]
        framerate: u32,
    },

    /// The same image, every time.
    Still { path: PathBuf },
}

impl Default for CameraKind {
    fn default() -> Self {
        Self::Rpicam {
            command: default_command(),
            width: default_width(),
            height: default_height(),
            framerate: default_framerate(),
        }
    }
}

#[derive(Clone, Debug, Default, Deserialize, PartialEq)]
pub(crate) struct CameraSettings {
    #[serde(flatten)]
    pub(crate) kind: CameraKind,

    #[serde(default)]
    pub(crate) rotation: Rotation,
}

impl CameraSettings {
    pub(crate) fn create_source(&self) -> anyhow::Result<Box<dyn CameraSource + Send>> {
        Ok(match &self.kind {
            CameraKind::Rpicam {
                command,
                width,
                height,
                framerate,
            } => Box::new(
                Rpicam::spawn(command, *width, *height, *framerate)
                    .context("Unable to start the camera")?,
            ),
            CameraKind::Still { path } => Box::new(StillImage::open(path)?),
        })
    }
}

// SPDX-License-Identifier: GPL-3.0-or-later
use image::RgbImage;
use tracing::trace;

use super::DisplaySink;

/// A display that throws every frame away, for running without a screen attached.
#[derive(Debug)]
pub(crate) struct Headless {
    width: u32,
    height: u32,
    shown: usize,
}

impl Headless {
    pub(crate) fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            shown: 0,
        }
    }
}

impl DisplaySink for Headless {
    fn width(&self) -> u32 {
        self.width
    }

    fn height(&self) -> u32 {
        self.height
    }

    fn show(&mut self, _image: &RgbImage) -> anyhow::Result<()> {
        self.shown += 1;
        trace!(frame = self.shown, "discarding frame");
        Ok(())
    }

    fn set_backlight(&mut self, _duty_percent: u8) -> anyhow::Result<()> {
        Ok(())
    }

    fn shutdown(&mut self) -> anyhow::Result<()> {
        Ok(())
    }
}

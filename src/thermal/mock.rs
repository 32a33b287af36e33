// SPDX-License-Identifier: GPL-3.0-or-later
use std::path::Path;
use std::thread;
use std::time::Duration;

use anyhow::{anyhow, bail, Context as _};
use serde::Deserialize;
use tracing::debug;

use crate::error::FetchError;
use crate::image_buffer::{ThermalImage, THERMAL_HEIGHT, THERMAL_PIXELS, THERMAL_WIDTH};

use super::ThermalSource;

const AMBIENT: f32 = 24.0;
const HOT_SPOT_PEAK: f32 = 37.0;
const HOT_SPOT_RADIUS: f32 = 2.5;

#[derive(Debug, Deserialize)]
struct RecordedFrames {
    frames: Vec<RecordedFrame>,
}

#[derive(Debug, Deserialize)]
struct RecordedFrame {
    values: Vec<f32>,
}

#[derive(Debug)]
enum Playback {
    /// Frames loaded from a file, looped forever.
    Recorded(Vec<ThermalImage>),

    /// A warm blob wandering around a room temperature background.
    Synthetic,
}

/// A thermal sensor stand-in, for running without the hardware.
#[derive(Debug)]
pub(crate) struct MockSource {
    playback: Playback,
    frame_delay: Duration,
    count: usize,
}

impl MockSource {
    pub(crate) fn synthetic(frame_delay: Duration) -> Self {
        Self {
            playback: Playback::Synthetic,
            frame_delay,
            count: 0,
        }
    }

    /// Load frames from a TOML file with a `[[frames]]` table per frame, each with a `values`
    /// array of 768 temperatures in Celsius.
    pub(crate) fn from_path(path: &Path, frame_delay: Duration) -> anyhow::Result<Self> {
        let data = std::fs::read_to_string(path)
            .with_context(|| format!("Unable to read mock frames from {}", path.display()))?;
        let source = Self::from_toml(&data, frame_delay)
            .with_context(|| format!("Invalid mock frames in {}", path.display()))?;
        debug!(path = %path.display(), "loaded mock thermal frames");
        Ok(source)
    }

    fn from_toml(data: &str, frame_delay: Duration) -> anyhow::Result<Self> {
        let recorded: RecordedFrames = toml::from_str(data)?;
        if recorded.frames.is_empty() {
            bail!("No frames given");
        }
        let frames = recorded
            .frames
            .into_iter()
            .enumerate()
            .map(|(index, frame)| {
                let count = frame.values.len();
                ThermalImage::from_raw(THERMAL_WIDTH, THERMAL_HEIGHT, frame.values).ok_or_else(
                    || {
                        anyhow!(
                            "Frame {} has {} values instead of {}",
                            index,
                            count,
                            THERMAL_PIXELS
                        )
                    },
                )
            })
            .collect::<anyhow::Result<Vec<_>>>()?;
        Ok(Self {
            playback: Playback::Recorded(frames),
            frame_delay,
            count: 0,
        })
    }

    fn synthesize(count: usize) -> ThermalImage {
        let t = count as f32;
        let center_x = 16.0 + 10.0 * (t * 0.3).sin();
        let center_y = 12.0 + 7.0 * (t * 0.45).sin();
        ThermalImage::from_fn(THERMAL_WIDTH, THERMAL_HEIGHT, |x, y| {
            let distance_squared = (x as f32 - center_x).powi(2) + (y as f32 - center_y).powi(2);
            let falloff = (-distance_squared / (2.0 * HOT_SPOT_RADIUS.powi(2))).exp();
            image::Luma([AMBIENT + (HOT_SPOT_PEAK - AMBIENT) * falloff])
        })
    }
}

impl ThermalSource for MockSource {
    fn fetch_frame(&mut self) -> Result<ThermalImage, FetchError> {
        if !self.frame_delay.is_zero() {
            thread::sleep(self.frame_delay);
        }
        let frame = match &self.playback {
            Playback::Recorded(frames) => frames[self.count % frames.len()].clone(),
            Playback::Synthetic => Self::synthesize(self.count),
        };
        self.count = self.count.wrapping_add(1);
        Ok(frame)
    }
}

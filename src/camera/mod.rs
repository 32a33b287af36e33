// SPDX-License-Identifier: GPL-3.0-or-later
use image::RgbImage;

mod rpicam;
mod settings;
pub(crate) mod still;

pub(crate) use settings::{CameraKind, CameraSettings, Rotation};

/// A visible light camera.
pub(crate) trait CameraSource {
    /// Block until the next frame is available, and return it.
    fn capture(&mut self) -> anyhow::Result<RgbImage>;

    /// Release the camera. Further captures will fail.
    fn close(&mut self) -> anyhow::Result<()>;
}

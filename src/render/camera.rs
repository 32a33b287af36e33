// SPDX-License-Identifier: GPL-3.0-or-later
use image::{imageops, RgbImage};

use crate::camera::Rotation;

use super::resize::{resize_exact, Method};

/// Rotates and scales visible camera frames to fit the display.
#[derive(Clone, Copy, Debug, PartialEq)]
pub(crate) struct CameraRenderer {
    rotation: Rotation,
    display_size: (u32, u32),
    filter: Method,
}

impl CameraRenderer {
    pub(crate) fn new(rotation: Rotation, display_size: (u32, u32), filter: Method) -> Self {
        Self {
            rotation,
            display_size,
            filter,
        }
    }

    /// Rotate the frame clockwise (the whole frame is kept, so width and height swap for quarter
    /// turns), then resize it to the display.
    pub(crate) fn render(&self, mut frame: RgbImage) -> RgbImage {
        let rotated = match self.rotation {
            Rotation::Zero => frame,
            Rotation::Ninety => imageops::rotate90(&frame),
            Rotation::OneEighty => {
                imageops::rotate180_in_place(&mut frame);
                frame
            }
            Rotation::TwoSeventy => imageops::rotate270(&frame),
        };
        let (width, height) = self.display_size;
        resize_exact(&rotated, width, height, self.filter)
    }
}

// SPDX-License-Identifier: GPL-3.0-or-later
use image::{ImageBuffer, Luma};

/// Images where each point is a temperature in degrees Celsius.
pub type ThermalImage = ImageBuffer<Luma<f32>, Vec<f32>>;

/// Width of an MLX90640 frame.
pub const THERMAL_WIDTH: u32 = 32;

/// Height of an MLX90640 frame.
pub const THERMAL_HEIGHT: u32 = 24;

/// Number of readings in a single thermal frame.
pub const THERMAL_PIXELS: usize = (THERMAL_WIDTH * THERMAL_HEIGHT) as usize;

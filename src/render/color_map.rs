// SPDX-License-Identifier: GPL-3.0-or-later
use image::Rgb;
use tracing::debug;

/// A single point in a Gaussian palette.
///
/// `position` is where along the palette the point is centered (0.0 to 1.0), and `weights` are
/// the red, green, and blue amplitudes (also 0.0 to 1.0) of the kernel centered there.
#[derive(Clone, Copy, Debug, PartialEq)]
pub(crate) struct ControlPoint {
    pub(crate) position: f64,
    pub(crate) weights: [f64; 3],
}

impl ControlPoint {
    pub(crate) const fn new(position: f64, red: f64, green: f64, blue: f64) -> Self {
        Self {
            position,
            weights: [red, green, blue],
        }
    }
}

/// The default palette. The gray at the bottom is for the ambient temperature pixels that aren't
/// very interesting.
pub(crate) const HEATMAP: [ControlPoint; 7] = [
    ControlPoint::new(0.0, 0.5, 0.5, 0.5),
    ControlPoint::new(0.25, 0.0, 0.0, 0.5),
    ControlPoint::new(0.40, 0.0, 0.5, 0.0),
    ControlPoint::new(0.60, 0.5, 0.0, 0.0),
    ControlPoint::new(0.80, 0.75, 0.75, 0.0),
    ControlPoint::new(0.90, 1.0, 0.75, 0.0),
    ControlPoint::new(1.00, 1.0, 1.0, 1.0),
];

/// A precomputed lookup table from a quantized temperature to a color.
///
/// Tables are built once at startup and only read afterwards, so they can be shared between
/// threads with a plain [`Arc`][std::sync::Arc].
#[derive(Clone, Debug, PartialEq)]
pub(crate) struct ColorMap {
    colors: Vec<Rgb<u8>>,
}

fn gaussian(x: f64, amplitude: f64, center: f64, width: f64) -> f64 {
    amplitude * (-((x - center).powi(2)) / (2.0 * width.powi(2))).exp()
}

impl ColorMap {
    /// Build a table by summing a Gaussian kernel for every control point, per channel.
    ///
    /// The kernel width is `size / (spread * points.len())`, so a larger table or fewer points
    /// means wider (smoother) humps. Sums are scaled to 0-255, clamped, and truncated.
    pub(crate) fn gaussian(size: usize, points: &[ControlPoint], spread: f64) -> Self {
        let width = size as f64;
        let kernel_width = width / (spread * points.len() as f64);
        let colors = (0..size)
            .map(|index| {
                let x = index as f64;
                let mut channels = [0u8; 3];
                for (channel, value) in channels.iter_mut().enumerate() {
                    let sum: f64 = points
                        .iter()
                        .map(|point| {
                            gaussian(
                                x,
                                point.weights[channel],
                                point.position * width,
                                kernel_width,
                            )
                        })
                        .sum();
                    *value = (sum * 255.0).max(0.0).min(255.0) as u8;
                }
                Rgb(channels)
            })
            .collect();
        debug!(size, points = points.len(), spread, "generated Gaussian color map");
        Self { colors }
    }

    /// Sample a [`colorous`] gradient into a table.
    pub(crate) fn from_gradient(size: usize, gradient: colorous::Gradient) -> Self {
        let colors = (0..size)
            .map(|index| Rgb(gradient.eval_rational(index, size).as_array()))
            .collect();
        Self { colors }
    }

    pub(crate) fn len(&self) -> usize {
        self.colors.len()
    }

    /// Map a temperature linearly onto the table, clamping to the ends.
    pub(crate) fn index_for(&self, temperature: f32, min: f32, max: f32) -> usize {
        let last = self.len().saturating_sub(1) as f32;
        let scaled = (temperature - min) / (max - min) * last;
        // f32::max also takes care of NaN, mapping it to the bottom of the table.
        scaled.max(0.0).min(last) as usize
    }

    pub(crate) fn color(&self, index: usize) -> Rgb<u8> {
        self.colors[index]
    }
}

// SPDX-License-Identifier: GPL-3.0-or-later
use std::sync::Arc;

use image::{imageops, Rgb, RgbImage};
use imageproc::drawing::draw_line_segment_mut;
use tracing::{instrument, trace};

use crate::error::ProcessError;
use crate::image_buffer::{ThermalImage, THERMAL_HEIGHT, THERMAL_WIDTH};
use crate::temperature::{Temperature, TemperatureUnit};

use super::color_map::ColorMap;
use super::font::TextRenderer;
use super::layer::blend_mask;
use super::resize::{resize_exact, Method};

const MARKER_COLOR: Rgb<u8> = Rgb([255, 0, 0]);
const MARKER_ARM: f32 = 5.0;

/// A pixel in a temperature frame, and its temperature.
#[derive(Clone, Copy, Debug, PartialEq)]
pub(crate) struct HotSpot {
    pub(crate) index: usize,
    pub(crate) temperature: f32,
}

/// A temperature frame mapped to colors, before any geometric transforms.
#[derive(Clone, Debug)]
pub(crate) struct Colorized {
    /// The colors, flipped so that up is up.
    pub(crate) image: RgbImage,
    pub(crate) hottest: HotSpot,
    pub(crate) coldest: HotSpot,
}

/// Pan and zoom over the thermal image.
///
/// The frame is enlarged by `zoom`, then a 32x24 window is cropped out at (`x_shift`,
/// `y_shift`). This lines the thermal field of view up with the visible camera's.
#[derive(Clone, Copy, Debug, PartialEq)]
pub(crate) struct Transform {
    pub(crate) zoom: f32,
    pub(crate) x_shift: u32,
    pub(crate) y_shift: u32,
    pub(crate) filter: Method,
}

impl Transform {
    /// The size of the thermal image after zooming, before cropping.
    pub(crate) fn zoomed_size(&self) -> (u32, u32) {
        (
            (THERMAL_WIDTH as f32 * self.zoom) as u32,
            (THERMAL_HEIGHT as f32 * self.zoom) as u32,
        )
    }

    /// Check that the crop window lies entirely within the zoomed image.
    pub(crate) fn validate(&self) -> Result<(), ProcessError> {
        if !self.zoom.is_finite() || self.zoom < 1.0 {
            return Err(ProcessError::InvalidZoom(self.zoom));
        }
        let (zoomed_width, zoomed_height) = self.zoomed_size();
        let fits_x = self
            .x_shift
            .checked_add(THERMAL_WIDTH)
            .map_or(false, |right| right <= zoomed_width);
        let fits_y = self
            .y_shift
            .checked_add(THERMAL_HEIGHT)
            .map_or(false, |bottom| bottom <= zoomed_height);
        if fits_x && fits_y {
            Ok(())
        } else {
            Err(ProcessError::CropOutOfBounds {
                x_shift: self.x_shift,
                y_shift: self.y_shift,
                zoomed_width,
                zoomed_height,
            })
        }
    }
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            zoom: 1.0,
            x_shift: 0,
            y_shift: 0,
            filter: Method::CatmullRom,
        }
    }
}

/// Where the hot spot marker goes on the display for the pixel at `index` in a 32x24 frame.
///
/// These constants were tuned by eye on the hardware (a 240x320 panel, zoom 2, shift (9, 13)):
/// the x axis is doubled and offset by three columns, and the y axis is flipped and offset by
/// four rows, using the row count as the divisor. They are kept exactly as tuned.
pub(crate) fn hot_spot_position(index: usize, width: u32, height: u32, y_shift: u32) -> (i64, i64) {
    let index = index as i64;
    let column_width = (width / THERMAL_WIDTH) as i64;
    let row_height = (height / THERMAL_HEIGHT) as i64;
    let x = (index % THERMAL_WIDTH as i64 - 3) * column_width * 2;
    let y = (THERMAL_HEIGHT as i64 - index / THERMAL_HEIGHT as i64 + 4) * row_height
        + y_shift as i64;
    (x, y)
}

/// Turns temperature frames into display-sized false color rasters.
#[derive(Debug)]
pub(crate) struct ThermalRenderer {
    color_map: Arc<ColorMap>,
    min_temperature: f32,
    max_temperature: f32,
    transform: Transform,
    display_size: (u32, u32),
    units: TemperatureUnit,
    label: Option<Arc<TextRenderer>>,
}

impl ThermalRenderer {
    /// Create a new renderer. `min_temperature` and `max_temperature` are in Celsius, and are
    /// mapped to the ends of the color map.
    pub(crate) fn new(
        color_map: Arc<ColorMap>,
        min_temperature: f32,
        max_temperature: f32,
        transform: Transform,
        display_size: (u32, u32),
    ) -> Result<Self, ProcessError> {
        transform.validate()?;
        Ok(Self {
            color_map,
            min_temperature,
            max_temperature,
            transform,
            display_size,
            units: TemperatureUnit::default(),
            label: None,
        })
    }

    /// Label the hot spot with its temperature, in the given units.
    pub(crate) fn with_label(mut self, text: Arc<TextRenderer>, units: TemperatureUnit) -> Self {
        self.label = Some(text);
        self.units = units;
        self
    }

    /// Map every temperature to a color, and find the hottest and coldest pixels.
    ///
    /// Ties are broken by taking the first pixel (in sensor order) with that temperature.
    pub(crate) fn colorize(&self, frame: &ThermalImage) -> Result<Colorized, ProcessError> {
        if frame.dimensions() != (THERMAL_WIDTH, THERMAL_HEIGHT) {
            return Err(ProcessError::FrameSize {
                width: frame.width(),
                height: frame.height(),
            });
        }
        let mut hottest = HotSpot {
            index: 0,
            temperature: f32::NEG_INFINITY,
        };
        let mut coldest = HotSpot {
            index: 0,
            temperature: f32::INFINITY,
        };
        let mut image = RgbImage::new(THERMAL_WIDTH, THERMAL_HEIGHT);
        for (index, (temperature, color)) in
            frame.iter().zip(image.pixels_mut()).enumerate()
        {
            let temperature = *temperature;
            if temperature < coldest.temperature {
                coldest = HotSpot { index, temperature };
            }
            if temperature > hottest.temperature {
                hottest = HotSpot { index, temperature };
            }
            let color_index =
                self.color_map
                    .index_for(temperature, self.min_temperature, self.max_temperature);
            *color = self.color_map.color(color_index);
        }
        // The sensor scans bottom to top.
        imageops::flip_vertical_in_place(&mut image);
        Ok(Colorized {
            image,
            hottest,
            coldest,
        })
    }

    /// Zoom, crop, and enlarge a colorized frame to the display size.
    pub(crate) fn transform(&self, colors: &RgbImage) -> Result<RgbImage, ProcessError> {
        self.transform.validate()?;
        let (zoomed_width, zoomed_height) = self.transform.zoomed_size();
        let zoomed = resize_exact(colors, zoomed_width, zoomed_height, self.transform.filter);
        let window = imageops::crop_imm(
            &zoomed,
            self.transform.x_shift,
            self.transform.y_shift,
            THERMAL_WIDTH,
            THERMAL_HEIGHT,
        )
        .to_image();
        let (display_width, display_height) = self.display_size;
        Ok(resize_exact(
            &window,
            display_width,
            display_height,
            self.transform.filter,
        ))
    }

    /// Draw a cross on the hot spot, and the temperature next to it.
    pub(crate) fn annotate(&self, image: &mut RgbImage, hottest: &HotSpot) {
        let (x, y) = hot_spot_position(
            hottest.index,
            image.width(),
            image.height(),
            self.transform.y_shift,
        );
        let (x, y) = (x as f32, y as f32);
        // Two pixel wide lines
        for offset in 0..2 {
            let offset = offset as f32;
            draw_line_segment_mut(
                image,
                (x - MARKER_ARM, y + offset),
                (x + MARKER_ARM, y + offset),
                MARKER_COLOR,
            );
            draw_line_segment_mut(
                image,
                (x + offset, y - MARKER_ARM),
                (x + offset, y + MARKER_ARM),
                MARKER_COLOR,
            );
        }
        if let Some(text) = &self.label {
            let temperature = Temperature::Celsius(hottest.temperature).as_unit(self.units);
            let label = format!("{:.1}", temperature);
            // The label sits one line below and a few characters to the right of the marker,
            // then gets turned upside down (like the rest of the display) around the marker.
            let mask = text.render_padded(&label, 1, 6);
            let mask = imageops::rotate180(&*mask);
            let left = x as i64 - mask.width() as i64 / 2;
            let top = y as i64 - mask.height() as i64 / 2;
            blend_mask(image, &mask, MARKER_COLOR, left, top);
        }
    }

    /// Run a frame through the full pipeline: colorize, transform, annotate.
    #[instrument(level = "trace", skip(self, frame))]
    pub(crate) fn render(&self, frame: &ThermalImage) -> Result<RgbImage, ProcessError> {
        let colorized = self.colorize(frame)?;
        let mut image = self.transform(&colorized.image)?;
        self.annotate(&mut image, &colorized.hottest);
        trace!(
            hottest = colorized.hottest.temperature,
            hottest_index = colorized.hottest.index,
            coldest = colorized.coldest.temperature,
            "rendered thermal frame"
        );
        Ok(image)
    }
}

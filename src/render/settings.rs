// SPDX-License-Identifier: GPL-3.0-or-later
use std::path::PathBuf;

use anyhow::{bail, Context as _};
use serde::Deserialize;

use crate::temperature::{Temperature, TemperatureUnit};

use super::font::DEFAULT_FONT_SIZE;
use super::palette::Palette;
use super::resize::Method;
use super::thermal::Transform;

fn default_min_temperature() -> Temperature {
    Temperature::Celsius(25.0)
}

fn default_max_temperature() -> Temperature {
    Temperature::Celsius(45.0)
}

fn default_color_depth() -> usize {
    1000
}

fn default_spread() -> f64 {
    1.0
}

fn default_zoom() -> f32 {
    2.0
}

fn default_x_shift() -> u32 {
    9
}

fn default_y_shift() -> u32 {
    13
}

fn default_blend() -> f32 {
    0.75
}

fn default_font_size() -> f32 {
    DEFAULT_FONT_SIZE
}

fn default_thermal_filter() -> Method {
    Method::CatmullRom
}

fn default_camera_filter() -> Method {
    Method::Triangle
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
pub(crate) struct RenderSettings {
    /// Temperatures at or below this get the first color in the palette.
    #[serde(default = "default_min_temperature")]
    pub(crate) min_temperature: Temperature,

    /// Temperatures at or above this get the last color in the palette.
    #[serde(default = "default_max_temperature")]
    pub(crate) max_temperature: Temperature,

    /// How many distinct colors the palette is quantized to.
    #[serde(default = "default_color_depth")]
    pub(crate) color_depth: usize,

    #[serde(default)]
    pub(crate) palette: Palette,

    /// Sharpness of the heatmap palette's transitions. Larger is sharper.
    #[serde(default = "default_spread")]
    pub(crate) spread: f64,

    #[serde(default = "default_zoom")]
    pub(crate) zoom: f32,

    #[serde(default = "default_x_shift")]
    pub(crate) x_shift: u32,

    #[serde(default = "default_y_shift")]
    pub(crate) y_shift: u32,

    /// Weight of the thermal image when blended with the camera.
    #[serde(default = "default_blend")]
    pub(crate) blend: f32,

    /// Units for the hot spot label.
    #[serde(default)]
    pub(crate) units: TemperatureUnit,

    /// A TrueType font for labels and messages. The built in DejaVu Sans is used if this isn't
    /// given.
    #[serde(default)]
    pub(crate) font_path: Option<PathBuf>,

    #[serde(default = "default_font_size")]
    pub(crate) font_size: f32,

    #[serde(default = "default_thermal_filter")]
    pub(crate) thermal_filter: Method,

    #[serde(default = "default_camera_filter")]
    pub(crate) camera_filter: Method,
}

impl RenderSettings {
    pub(crate) fn transform(&self) -> Transform {
        Transform {
            zoom: self.zoom,
            x_shift: self.x_shift,
            y_shift: self.y_shift,
            filter: self.thermal_filter,
        }
    }

    pub(crate) fn validate(&self) -> anyhow::Result<()> {
        let min = self.min_temperature.in_celsius();
        let max = self.max_temperature.in_celsius();
        if !(min < max) {
            bail!(
                "min_temperature ({}) must be below max_temperature ({})",
                self.min_temperature,
                self.max_temperature
            );
        }
        if self.color_depth < 2 {
            bail!("color_depth must be at least 2 (given {})", self.color_depth);
        }
        if !(0.0..=1.0).contains(&self.blend) {
            bail!("blend must be between 0 and 1 (given {})", self.blend);
        }
        if !(self.spread > 0.0) {
            bail!("spread must be positive (given {})", self.spread);
        }
        if !(self.font_size > 0.0) {
            bail!("font_size must be positive (given {})", self.font_size);
        }
        self.transform()
            .validate()
            .context("Invalid thermal zoom and shift")?;
        Ok(())
    }
}

impl Default for RenderSettings {
    fn default() -> Self {
        Self {
            min_temperature: default_min_temperature(),
            max_temperature: default_max_temperature(),
            color_depth: default_color_depth(),
            palette: Palette::default(),
            spread: default_spread(),
            zoom: default_zoom(),
            x_shift: default_x_shift(),
            y_shift: default_y_shift(),
            blend: default_blend(),
            units: TemperatureUnit::default(),
            font_path: None,
            font_size: default_font_size(),
            thermal_filter: default_thermal_filter(),
            camera_filter: default_camera_filter(),
        }
    }
}

#[cfg(test)]
mod test {
    use std::path::PathBuf;

    use super::RenderSettings;
    use crate::render::palette::Palette;
    use crate::render::resize::Method;
    use crate::temperature::{Temperature, TemperatureUnit};

    #[test]
    fn defaults() {
        let parsed: Result<RenderSettings, _> = toml::from_str("");
        assert!(
            parsed.is_ok(),
            "Failed to parse empty TOML: {}",
            parsed.unwrap_err()
        );
        let parsed = parsed.unwrap();
        assert_eq!(parsed, RenderSettings::default());
        assert!(parsed.validate().is_ok());
    }

    #[test]
    fn full() {
        let source = r#"
        min_temperature = { fahrenheit = 68 }
        max_temperature = 40
        color_depth = 256
        palette = "inferno"
        spread = 2.0
        zoom = 1.5
        x_shift = 4
        y_shift = 2
        blend = 0.5
        units = "fahrenheit"
        font_path = "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf"
        font_size = 16
        thermal_filter = "lanczos"
        camera_filter = "nearest"
        "#;
        let parsed: RenderSettings = toml::from_str(source).unwrap();
        let expected = RenderSettings {
            min_temperature: Temperature::Celsius(20.0),
            max_temperature: Temperature::Celsius(40.0),
            color_depth: 256,
            palette: "inferno".parse().unwrap(),
            spread: 2.0,
            zoom: 1.5,
            x_shift: 4,
            y_shift: 2,
            blend: 0.5,
            units: TemperatureUnit::Fahrenheit,
            font_path: Some(PathBuf::from(
                "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
            )),
            font_size: 16.0,
            thermal_filter: Method::Lanczos3,
            camera_filter: Method::Nearest,
        };
        assert_eq!(parsed, expected);
        assert!(parsed.validate().is_ok());
    }

    #[test]
    fn default_palette_is_heatmap() {
        assert_eq!(RenderSettings::default().palette, Palette::Heatmap);
    }

    #[test]
    fn inverted_range() {
        let settings = RenderSettings {
            min_temperature: Temperature::Celsius(45.0),
            max_temperature: Temperature::Celsius(25.0),
            ..RenderSettings::default()
        };
        assert!(settings.validate().is_err());
    }

    #[test]
    fn blend_range() {
        let settings = RenderSettings {
            blend: 1.5,
            ..RenderSettings::default()
        };
        assert!(settings.validate().is_err());
    }

    #[test]
    fn tiny_color_depth() {
        let settings = RenderSettings {
            color_depth: 1,
            ..RenderSettings::default()
        };
        assert!(settings.validate().is_err());
    }

    #[test]
    fn crop_outside_zoomed_image() {
        // Zoom 2 makes the image 64x48, so the largest y shift is 24.
        let settings = RenderSettings {
            y_shift: 25,
            ..RenderSettings::default()
        };
        let err = settings.validate().unwrap_err();
        assert!(format!("{:#}", err).contains("zoomed image"), "{:#}", err);
    }
}

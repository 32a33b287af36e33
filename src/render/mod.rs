// SPDX-License-Identifier: GPL-3.0-or-later
//! Turning sensor data into display rasters.
use std::path::Path;
use std::sync::Arc;

use tracing::debug;

pub(crate) mod camera;
pub(crate) mod color_map;
pub(crate) mod font;
pub(crate) mod layer;
pub(crate) mod message;
pub(crate) mod palette;
pub(crate) mod resize;
mod settings;
pub(crate) mod thermal;

pub(crate) use camera::CameraRenderer;
pub(crate) use font::TextRenderer;
pub(crate) use settings::RenderSettings;
pub(crate) use thermal::ThermalRenderer;

/// Load the configured font, or the built in one if none was configured.
///
/// A configured font that can't be loaded is an error.
pub(crate) fn load_text_renderer(
    font_path: Option<&Path>,
    size: f32,
) -> anyhow::Result<Arc<TextRenderer>> {
    let text = match font_path {
        Some(path) => TextRenderer::from_path(path, size)?,
        None => {
            debug!(size, "using built in font");
            TextRenderer::bundled(size)?
        }
    };
    Ok(Arc::new(text))
}

/// Build the thermal renderer described by `settings`, for a display of the given size.
pub(crate) fn thermal_renderer(
    settings: &RenderSettings,
    display_size: (u32, u32),
    text: Arc<TextRenderer>,
) -> anyhow::Result<ThermalRenderer> {
    let color_map = Arc::new(settings.palette.color_map(settings.color_depth, settings.spread));
    let renderer = ThermalRenderer::new(
        color_map,
        settings.min_temperature.in_celsius(),
        settings.max_temperature.in_celsius(),
        settings.transform(),
        display_size,
    )?;
    Ok(renderer.with_label(text, settings.units))
}

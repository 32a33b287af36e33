// SPDX-License-Identifier: GPL-3.0-or-later
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Context as _;
use image::{ImageFormat, RgbImage};
use tracing::info;

/// The first `NNNN.png` (counting from 1) in `directory` that doesn't exist yet.
///
/// Gaps left by deleted screenshots get filled in.
pub(crate) fn next_screenshot_path(directory: &Path) -> PathBuf {
    (1u32..)
        .map(|index| directory.join(format!("{:04}.png", index)))
        .find(|path| !path.exists())
        // The range only runs out after u32::MAX files.
        .unwrap_or_else(|| directory.join("overflow.png"))
}

/// Save `image` as a PNG under `directory`, creating the directory if needed.
pub(crate) fn save_screenshot(directory: &Path, image: &RgbImage) -> anyhow::Result<PathBuf> {
    fs::create_dir_all(directory).with_context(|| {
        format!(
            "Unable to create screenshot directory {}",
            directory.display()
        )
    })?;
    let path = next_screenshot_path(directory);
    image
        .save_with_format(&path, ImageFormat::Png)
        .with_context(|| format!("Unable to save screenshot to {}", path.display()))?;
    info!(path = %path.display(), "saved screenshot");
    Ok(path)
}

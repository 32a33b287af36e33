// SPDX-License-Identifier: GPL-3.0-or-later
use image::{Rgb, RgbImage};

use super::font::TextRenderer;
use super::layer::blend_mask;

const MESSAGE_COLOR: Rgb<u8> = Rgb([255, 255, 255]);

/// Draw `message` in white, centered on a copy of `background`.
///
/// Text wider than the background is clipped on both sides.
pub(crate) fn overlay_message(
    background: &RgbImage,
    text: &TextRenderer,
    message: &str,
) -> RgbImage {
    let mut image = background.clone();
    let mask = text.render(message);
    let left = (image.width() as i64 - mask.width() as i64) / 2;
    let top = (image.height() as i64 - mask.height() as i64) / 2;
    blend_mask(&mut image, &mask, MESSAGE_COLOR, left, top);
    image
}

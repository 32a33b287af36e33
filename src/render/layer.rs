// SPDX-License-Identifier: GPL-3.0-or-later
use image::{GrayImage, Rgb, RgbImage};
use rayon::prelude::*;

fn mix(background: u8, foreground: u8, weight: f32) -> u8 {
    (background as f32 * (1.0 - weight) + foreground as f32 * weight).round() as u8
}

/// Flatten a single-color layer onto `background`, using `mask` as the opacity.
///
/// The mask's top left corner is placed at (`x`, `y`), which may be partially (or entirely) off
/// of the background. Only the overlapping part is drawn.
pub(crate) fn blend_mask(background: &mut RgbImage, mask: &GrayImage, color: Rgb<u8>, x: i64, y: i64) {
    let (width, height) = background.dimensions();
    for (mask_x, mask_y, opacity) in mask.enumerate_pixels() {
        // We only need to modify pixels that have some text in them.
        if opacity.0[0] == 0 {
            continue;
        }
        let dest_x = x + mask_x as i64;
        let dest_y = y + mask_y as i64;
        if dest_x < 0 || dest_y < 0 || dest_x >= width as i64 || dest_y >= height as i64 {
            continue;
        }
        let weight = opacity.0[0] as f32 / u8::MAX as f32;
        let pixel = background.get_pixel_mut(dest_x as u32, dest_y as u32);
        for (channel, foreground) in pixel.0.iter_mut().zip(color.0.iter()) {
            *channel = mix(*channel, *foreground, weight);
        }
    }
}

/// Mix two equally sized rasters, `bottom * (1 - weight) + top * weight`.
///
/// Returns `None` if the rasters are different sizes.
pub(crate) fn blend(bottom: &RgbImage, top: &RgbImage, weight: f32) -> Option<RgbImage> {
    if bottom.dimensions() != top.dimensions() {
        return None;
    }
    let mixed: Vec<u8> = bottom
        .as_raw()
        .par_iter()
        .zip(top.as_raw().par_iter())
        .map(|(bottom, top)| mix(*bottom, *top, weight))
        .collect();
    RgbImage::from_raw(bottom.width(), bottom.height(), mixed)
}

#[cfg(test)]
mod test {
    use image::{GrayImage, Luma, Rgb, RgbImage};

    use super::{blend, blend_mask};

    #[test]
    fn blend_weights() {
        let camera = RgbImage::from_pixel(4, 4, Rgb([0, 100, 200]));
        let thermal = RgbImage::from_pixel(4, 4, Rgb([200, 100, 0]));
        let mixed = blend(&camera, &thermal, 0.75).unwrap();
        assert!(mixed.pixels().all(|p| *p == Rgb([150, 100, 50])));
    }

    #[test]
    fn blend_extremes() {
        let camera = RgbImage::from_pixel(2, 2, Rgb([10, 20, 30]));
        let thermal = RgbImage::from_pixel(2, 2, Rgb([40, 50, 60]));
        assert_eq!(blend(&camera, &thermal, 0.0).unwrap(), camera);
        assert_eq!(blend(&camera, &thermal, 1.0).unwrap(), thermal);
    }

    #[test]
    fn blend_size_mismatch() {
        let camera = RgbImage::new(2, 2);
        let thermal = RgbImage::new(3, 2);
        assert!(blend(&camera, &thermal, 0.5).is_none());
    }

    #[test]
    fn mask_partial_opacity() {
        let mut background = RgbImage::from_pixel(3, 3, Rgb([0, 0, 0]));
        let mut mask = GrayImage::new(1, 1);
        mask.put_pixel(0, 0, Luma([255]));
        blend_mask(&mut background, &mask, Rgb([255, 0, 0]), 1, 1);
        assert_eq!(*background.get_pixel(1, 1), Rgb([255, 0, 0]));
        assert_eq!(*background.get_pixel(0, 0), Rgb([0, 0, 0]));

        let mut background = RgbImage::from_pixel(1, 1, Rgb([0, 0, 200]));
        let mut mask = GrayImage::new(1, 1);
        mask.put_pixel(0, 0, Luma([51]));
        blend_mask(&mut background, &mask, Rgb([255, 0, 0]), 0, 0);
        assert_eq!(*background.get_pixel(0, 0), Rgb([51, 0, 160]));
    }

    #[test]
    fn mask_clipped() {
        let mut background = RgbImage::from_pixel(2, 2, Rgb([1, 1, 1]));
        let mask = GrayImage::from_pixel(4, 4, Luma([255]));
        blend_mask(&mut background, &mask, Rgb([9, 9, 9]), -3, -3);
        assert_eq!(*background.get_pixel(0, 0), Rgb([9, 9, 9]));
        assert_eq!(*background.get_pixel(1, 1), Rgb([1, 1, 1]));
        blend_mask(&mut background, &mask, Rgb([9, 9, 9]), 10, 10);
    }
}

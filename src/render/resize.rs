// SPDX-License-Identifier: GPL-3.0-or-later
use image::{imageops, ImageBuffer, Pixel};
use serde::Deserialize;

/// Different resizing methods
#[derive(Copy, Clone, Debug, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub(crate) enum Method {
    /// Nearest neighbor sampling.
    Nearest,

    /// Triangle (aka linear) sampling.
    #[serde(alias = "linear")]
    Triangle,

    /// Catmull-Rom (aka bicubic) sampling.
    #[serde(alias = "bicubic")]
    CatmullRom,

    /// Gaussian sampling.
    Gaussian,

    /// Lanczos sampling with a window size of 3.
    #[serde(alias = "lanczos")]
    Lanczos3,
}

impl From<Method> for imageops::FilterType {
    fn from(method: Method) -> Self {
        match method {
            Method::Nearest => imageops::Nearest,
            Method::Triangle => imageops::Triangle,
            Method::CatmullRom => imageops::CatmullRom,
            Method::Gaussian => imageops::Gaussian,
            Method::Lanczos3 => imageops::Lanczos3,
        }
    }
}

/// Resize `image` to exactly `width` by `height`, skipping the work when it's already that size.
pub(crate) fn resize_exact<P>(
    image: &ImageBuffer<P, Vec<P::Subpixel>>,
    width: u32,
    height: u32,
    method: Method,
) -> ImageBuffer<P, Vec<P::Subpixel>>
where
    P: Pixel + 'static,
    P::Subpixel: 'static,
{
    if image.dimensions() == (width, height) {
        image.clone()
    } else {
        imageops::resize(image, width, height, method.into())
    }
}

#[cfg(test)]
mod test {
    use image::{Rgb, RgbImage};
    use serde::Deserialize;

    use super::{resize_exact, Method};

    #[derive(Debug, Deserialize)]
    struct MethodTest {
        method: Method,
    }

    fn parse(method: &str) -> Method {
        let source = format!("method = \"{}\"", method);
        let parsed: MethodTest = toml::from_str(&source).expect("a valid resize method");
        parsed.method
    }

    #[test]
    fn aliases() {
        assert_eq!(parse("bicubic"), Method::CatmullRom);
        assert_eq!(parse("catmull_rom"), Method::CatmullRom);
        assert_eq!(parse("linear"), Method::Triangle);
        assert_eq!(parse("lanczos"), Method::Lanczos3);
        assert_eq!(parse("nearest"), Method::Nearest);
    }

    #[test]
    fn unknown_method() {
        let parsed: Result<MethodTest, _> = toml::from_str("method = \"mitchell\"");
        assert!(parsed.is_err());
    }

    #[test]
    fn same_size_is_a_copy() {
        let image = RgbImage::from_fn(4, 3, |x, y| Rgb([x as u8, y as u8, 7]));
        assert_eq!(resize_exact(&image, 4, 3, Method::CatmullRom), image);
    }

    #[test]
    fn new_dimensions() {
        let image = RgbImage::new(32, 24);
        let resized = resize_exact(&image, 240, 320, Method::Triangle);
        assert_eq!(resized.dimensions(), (240, 320));
    }
}

// SPDX-License-Identifier: GPL-3.0-or-later
use std::path::Path;

use anyhow::{bail, Context as _};
use image::RgbImage;
use tracing::debug;

use super::CameraSource;

/// A "camera" that always returns the same image, for running without the camera module.
#[derive(Debug)]
pub(crate) struct StillImage {
    image: Option<RgbImage>,
}

impl StillImage {
    pub(crate) fn open(path: &Path) -> anyhow::Result<Self> {
        let image = image::open(path)
            .with_context(|| format!("Unable to load still image {}", path.display()))?
            .into_rgb8();
        debug!(path = %path.display(), width = image.width(), height = image.height(), "loaded still image");
        Ok(Self::from(image))
    }
}

impl From<RgbImage> for StillImage {
    fn from(image: RgbImage) -> Self {
        Self { image: Some(image) }
    }
}

impl CameraSource for StillImage {
    fn capture(&mut self) -> anyhow::Result<RgbImage> {
        match &self.image {
            Some(image) => Ok(image.clone()),
            None => bail!("Camera has been closed"),
        }
    }

    fn close(&mut self) -> anyhow::Result<()> {
        self.image = None;
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use image::{Rgb, RgbImage};

    use super::StillImage;
    use crate::camera::CameraSource;

    #[test]
    fn repeats() {
        let mut camera = StillImage::from(RgbImage::from_pixel(3, 2, Rgb([1, 2, 3])));
        let first = camera.capture().unwrap();
        let second = camera.capture().unwrap();
        assert_eq!(first, second);
        assert_eq!(first.dimensions(), (3, 2));
    }

    #[test]
    fn closed() {
        let mut camera = StillImage::from(RgbImage::new(1, 1));
        camera.close().unwrap();
        assert!(camera.capture().is_err());
    }

    #[test]
    fn from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("scene.png");
        RgbImage::from_pixel(4, 4, Rgb([0, 128, 255]))
            .save(&path)
            .unwrap();
        let mut camera = StillImage::open(&path).unwrap();
        assert_eq!(*camera.capture().unwrap().get_pixel(2, 2), Rgb([0, 128, 255]));
    }

    #[test]
    fn missing_file() {
        assert!(StillImage::open(std::path::Path::new("/nonexistent/scene.png")).is_err());
    }
}

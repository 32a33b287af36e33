// SPDX-License-Identifier: GPL-3.0-or-later
use std::fs::{self, File, OpenOptions};
use std::io::{Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use anyhow::{bail, Context as _};
use image::{Rgb, RgbImage};
use serde::Deserialize;
use tracing::{debug, trace, warn};

use super::DisplaySink;

const GRAPHICS_SYSFS: &str = "/sys/class/graphics";

/// How pixels are laid out in the framebuffer.
#[derive(Clone, Copy, Debug, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub(crate) enum PixelFormat {
    /// 16 bits per pixel, little endian (what fbtft panels use).
    Rgb565,

    /// 32 bits per pixel, blue first in memory.
    Xrgb8888,
}

impl Default for PixelFormat {
    fn default() -> Self {
        Self::Rgb565
    }
}

impl PixelFormat {
    fn bytes_per_pixel(self) -> usize {
        match self {
            Self::Rgb565 => 2,
            Self::Xrgb8888 => 4,
        }
    }

    fn encode(self, pixel: &Rgb<u8>, out: &mut Vec<u8>) {
        let [red, green, blue] = pixel.0;
        match self {
            Self::Rgb565 => {
                let packed = ((red as u16 & 0xF8) << 8) | ((green as u16 & 0xFC) << 3) | (blue as u16 >> 3);
                out.extend_from_slice(&packed.to_le_bytes());
            }
            Self::Xrgb8888 => out.extend_from_slice(&[blue, green, red, 0]),
        }
    }
}

/// A sysfs backlight (`/sys/class/backlight/<name>`).
#[derive(Debug)]
struct Backlight {
    brightness: PathBuf,
    max_brightness: u32,
}

impl Backlight {
    fn open(directory: &Path) -> anyhow::Result<Self> {
        let max_path = directory.join("max_brightness");
        let max_brightness = fs::read_to_string(&max_path)
            .with_context(|| format!("Unable to read {}", max_path.display()))?
            .trim()
            .parse()
            .with_context(|| format!("Invalid maximum brightness in {}", max_path.display()))?;
        Ok(Self {
            brightness: directory.join("brightness"),
            max_brightness,
        })
    }

    fn set(&self, duty_percent: u8) -> anyhow::Result<()> {
        let level = brightness_level(self.max_brightness, duty_percent);
        fs::write(&self.brightness, level.to_string())
            .with_context(|| format!("Unable to write {}", self.brightness.display()))
    }
}

/// Scale a 0-100 duty cycle to a backlight's brightness range.
fn brightness_level(max_brightness: u32, duty_percent: u8) -> u32 {
    let level = u64::from(max_brightness) * u64::from(duty_percent.min(100)) / 100;
    // Never more than max_brightness, so it fits.
    level as u32
}

/// Bytes per line of a framebuffer, from `/sys/class/graphics/fbN/stride`.
fn read_stride(sysfs_dir: &Path) -> Option<usize> {
    let path = sysfs_dir.join("stride");
    match fs::read_to_string(&path) {
        Ok(contents) => contents.trim().parse().ok(),
        Err(err) => {
            trace!(path = %path.display(), error = %err, "unable to read framebuffer stride");
            None
        }
    }
}

/// A Linux framebuffer device, like the `/dev/fb1` an fbtft driven SPI LCD shows up as.
#[derive(Debug)]
pub(crate) struct Framebuffer {
    device: File,
    width: u32,
    height: u32,
    format: PixelFormat,
    /// Bytes per line, which can be more than `width` pixels take up.
    stride: usize,
    backlight: Option<Backlight>,
    scratch: Vec<u8>,
}

impl Framebuffer {
    pub(crate) fn open(
        path: &Path,
        width: u32,
        height: u32,
        format: PixelFormat,
        backlight: Option<&Path>,
    ) -> anyhow::Result<Self> {
        let stride = path
            .file_name()
            .and_then(|name| read_stride(&Path::new(GRAPHICS_SYSFS).join(name)));
        Self::open_with_stride(path, width, height, format, backlight, stride)
    }

    fn open_with_stride(
        path: &Path,
        width: u32,
        height: u32,
        format: PixelFormat,
        backlight: Option<&Path>,
        stride: Option<usize>,
    ) -> anyhow::Result<Self> {
        let row_bytes = width as usize * format.bytes_per_pixel();
        let stride = match stride {
            Some(stride) if stride >= row_bytes => stride,
            Some(stride) => {
                warn!(stride, row_bytes, "framebuffer stride too small, ignoring it");
                row_bytes
            }
            None => row_bytes,
        };
        let device = OpenOptions::new()
            .write(true)
            .open(path)
            .with_context(|| format!("Unable to open framebuffer {}", path.display()))?;
        let backlight = backlight.map(Backlight::open).transpose()?;
        debug!(path = %path.display(), width, height, stride, ?format, "opened framebuffer");
        Ok(Self {
            device,
            width,
            height,
            format,
            stride,
            backlight,
            scratch: Vec::with_capacity(stride * height as usize),
        })
    }

    fn write_frame(&mut self) -> anyhow::Result<()> {
        self.device
            .seek(SeekFrom::Start(0))
            .and_then(|_| self.device.write_all(&self.scratch))
            .and_then(|_| self.device.flush())
            .context("Unable to write to framebuffer")
    }
}

impl DisplaySink for Framebuffer {
    fn width(&self) -> u32 {
        self.width
    }

    fn height(&self) -> u32 {
        self.height
    }

    fn show(&mut self, image: &RgbImage) -> anyhow::Result<()> {
        if image.dimensions() != (self.width, self.height) {
            bail!(
                "Image is {}x{}, but the display is {}x{}",
                image.width(),
                image.height(),
                self.width,
                self.height
            );
        }
        self.scratch.clear();
        for row in image.rows() {
            let line_end = self.scratch.len() + self.stride;
            for pixel in row {
                self.format.encode(pixel, &mut self.scratch);
            }
            self.scratch.resize(line_end, 0);
        }
        trace!(bytes = self.scratch.len(), "writing frame");
        self.write_frame()
    }

    fn set_backlight(&mut self, duty_percent: u8) -> anyhow::Result<()> {
        match &self.backlight {
            Some(backlight) => backlight.set(duty_percent),
            None => Ok(()),
        }
    }

    fn shutdown(&mut self) -> anyhow::Result<()> {
        self.scratch.clear();
        self.scratch.resize(self.stride * self.height as usize, 0);
        self.write_frame()?;
        self.set_backlight(0)
    }
}

#[cfg(test)]
mod test {
    use std::fs;

    use image::{Rgb, RgbImage};

    use super::{brightness_level, read_stride, Framebuffer, PixelFormat};
    use crate::display::DisplaySink;

    fn encoded(format: PixelFormat, pixel: [u8; 3]) -> Vec<u8> {
        let mut out = Vec::new();
        format.encode(&Rgb(pixel), &mut out);
        out
    }

    #[test]
    fn rgb565() {
        assert_eq!(encoded(PixelFormat::Rgb565, [255, 0, 0]), vec![0x00, 0xF8]);
        assert_eq!(encoded(PixelFormat::Rgb565, [0, 255, 0]), vec![0xE0, 0x07]);
        assert_eq!(encoded(PixelFormat::Rgb565, [0, 0, 255]), vec![0x1F, 0x00]);
        assert_eq!(encoded(PixelFormat::Rgb565, [255, 255, 255]), vec![0xFF, 0xFF]);
    }

    #[test]
    fn xrgb8888() {
        assert_eq!(encoded(PixelFormat::Xrgb8888, [1, 2, 3]), vec![3, 2, 1, 0]);
    }

    #[test]
    fn writes_frames_and_blanks() {
        let dir = tempfile::tempdir().unwrap();
        let device = dir.path().join("fb");
        fs::write(&device, b"").unwrap();
        let mut display = Framebuffer::open(&device, 2, 2, PixelFormat::Rgb565, None).unwrap();
        display
            .show(&RgbImage::from_pixel(2, 2, Rgb([255, 255, 255])))
            .unwrap();
        assert_eq!(fs::read(&device).unwrap(), vec![0xFF; 8]);
        display.shutdown().unwrap();
        assert_eq!(fs::read(&device).unwrap(), vec![0; 8]);
    }

    #[test]
    fn wrong_size_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let device = dir.path().join("fb");
        fs::write(&device, b"").unwrap();
        let mut display = Framebuffer::open(&device, 2, 2, PixelFormat::Rgb565, None).unwrap();
        assert!(display.show(&RgbImage::new(3, 2)).is_err());
    }

    #[test]
    fn backlight_duty() {
        let dir = tempfile::tempdir().unwrap();
        let device = dir.path().join("fb");
        fs::write(&device, b"").unwrap();
        let backlight = dir.path().join("backlight");
        fs::create_dir(&backlight).unwrap();
        fs::write(backlight.join("max_brightness"), "255\n").unwrap();
        let mut display =
            Framebuffer::open(&device, 1, 1, PixelFormat::Xrgb8888, Some(&backlight)).unwrap();
        display.set_backlight(50).unwrap();
        assert_eq!(fs::read_to_string(backlight.join("brightness")).unwrap(), "127");
        display.shutdown().unwrap();
        assert_eq!(fs::read_to_string(backlight.join("brightness")).unwrap(), "0");
    }

    #[test]
    fn large_brightness_range() {
        assert_eq!(brightness_level(u32::MAX, 100), u32::MAX);
        assert_eq!(brightness_level(u32::MAX, 50), u32::MAX / 2);
        assert_eq!(brightness_level(4_000_000_000, 200), 4_000_000_000);
        assert_eq!(brightness_level(255, 0), 0);
    }

    #[test]
    fn padded_lines() {
        let dir = tempfile::tempdir().unwrap();
        let device = dir.path().join("fb");
        fs::write(&device, b"").unwrap();
        let mut display =
            Framebuffer::open_with_stride(&device, 2, 2, PixelFormat::Rgb565, None, Some(8))
                .unwrap();
        let mut image = RgbImage::from_pixel(2, 2, Rgb([255, 255, 255]));
        image.put_pixel(0, 1, Rgb([255, 0, 0]));
        display.show(&image).unwrap();
        assert_eq!(
            fs::read(&device).unwrap(),
            vec![
                0xFF, 0xFF, 0xFF, 0xFF, 0, 0, 0, 0, //
                0x00, 0xF8, 0xFF, 0xFF, 0, 0, 0, 0,
            ]
        );
        display.shutdown().unwrap();
        assert_eq!(fs::read(&device).unwrap(), vec![0; 16]);
    }

    #[test]
    fn short_stride_ignored() {
        let dir = tempfile::tempdir().unwrap();
        let device = dir.path().join("fb");
        fs::write(&device, b"").unwrap();
        let mut display =
            Framebuffer::open_with_stride(&device, 2, 1, PixelFormat::Xrgb8888, None, Some(4))
                .unwrap();
        display.show(&RgbImage::from_pixel(2, 1, Rgb([1, 2, 3]))).unwrap();
        assert_eq!(fs::read(&device).unwrap(), vec![3, 2, 1, 0, 3, 2, 1, 0]);
    }

    #[test]
    fn sysfs_stride() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("stride"), "480\n").unwrap();
        assert_eq!(read_stride(dir.path()), Some(480));
        assert_eq!(read_stride(&dir.path().join("missing")), None);
    }

    #[test]
    fn missing_device() {
        let missing = std::path::Path::new("/nonexistent/fb9");
        assert!(Framebuffer::open(missing, 1, 1, PixelFormat::Rgb565, None).is_err());
    }
}

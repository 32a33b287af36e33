// SPDX-License-Identifier: GPL-3.0-or-later
use std::convert::TryFrom;
use std::error::Error as StdError;
use std::fmt;
use std::thread;
use std::time::Duration;

use anyhow::{anyhow, Context as _};
use embedded_hal::blocking::i2c;
use tracing::debug;

use crate::error::FetchError;
use crate::image_buffer::{ThermalImage, THERMAL_HEIGHT, THERMAL_WIDTH};

use super::ThermalSource;

/// How long to wait before checking again when the next subpage isn't ready.
const POLL_DELAY: Duration = Duration::from_millis(5);

pub(crate) struct Mlx90640<I2C> {
    camera: mlx9064x::Mlx90640Driver<I2C>,
    temperature_buffer: Vec<f32>,
}

impl<I2C> Mlx90640<I2C>
where
    I2C: 'static + i2c::WriteRead + i2c::Write,
    <I2C as i2c::WriteRead>::Error: 'static + StdError + Sync + Send,
    <I2C as i2c::Write>::Error: 'static + StdError + Sync + Send,
{
    pub(crate) fn new(bus: I2C, address: u8, frame_rate: f32) -> anyhow::Result<Self> {
        let mut camera = mlx9064x::Mlx90640Driver::new(bus, address)
            .context("Unable to initialize the MLX90640")?;
        let mlx_frame_rate = mlx9064x::FrameRate::try_from(frame_rate)
            .map_err(|err| anyhow!("Invalid MLX90640 frame rate {}: {}", frame_rate, err))?;
        camera
            .set_frame_rate(mlx_frame_rate)
            .context("Error setting camera frame rate")?;
        let num_pixels = camera.height() * camera.width();
        debug!(address, frame_rate, pixels = num_pixels, "configured MLX90640");
        Ok(Self {
            camera,
            temperature_buffer: vec![0f32; num_pixels],
        })
    }
}

impl<I2C> ThermalSource for Mlx90640<I2C>
where
    I2C: 'static + i2c::WriteRead + i2c::Write,
    <I2C as i2c::WriteRead>::Error: 'static + StdError + Sync + Send,
    <I2C as i2c::Write>::Error: 'static + StdError + Sync + Send,
{
    fn fetch_frame(&mut self) -> Result<ThermalImage, FetchError> {
        // I2C hiccups and corrupt subpages are common on the Pi, and the next read is usually
        // fine.
        let ready = self
            .camera
            .generate_image_if_ready(&mut self.temperature_buffer)
            .map_err(|err| FetchError::Recoverable(anyhow::Error::from(err)))?;
        if !ready {
            thread::sleep(POLL_DELAY);
            return Err(FetchError::Recoverable(anyhow!("frame not ready")));
        }
        ThermalImage::from_raw(
            THERMAL_WIDTH,
            THERMAL_HEIGHT,
            self.temperature_buffer.clone(),
        )
        .ok_or_else(|| {
            FetchError::Fatal(anyhow!(
                "MLX90640 returned {} readings",
                self.temperature_buffer.len()
            ))
        })
    }
}

impl<I2C> fmt::Debug for Mlx90640<I2C> {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt.debug_struct("Mlx90640")
            .field("pixels", &self.temperature_buffer.len())
            .finish()
    }
}

#[cfg(test)]
mod test {
    use linux_embedded_hal::I2cdev;

    use super::Mlx90640;

    #[test]
    fn opens_linux_i2c() {
        // The Linux bus satisfies every bound the driver needs.
        let open: fn(I2cdev, u8, f32) -> anyhow::Result<Mlx90640<I2cdev>> = Mlx90640::new;
        let _ = open;
    }
}

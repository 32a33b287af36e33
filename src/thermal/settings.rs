// SPDX-License-Identifier: GPL-3.0-or-later
use std::convert::TryFrom;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{bail, Context as _};
use linux_embedded_hal::I2cdev;
use serde::Deserialize;
use tracing::info;

use super::i2c::Bus;
use super::mlx90640::Mlx90640;
use super::mock::MockSource;
use super::ThermalSource;

fn default_address() -> u8 {
    0x33
}

fn default_frame_rate() -> f32 {
    4.0
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(rename_all = "lowercase", tag = "kind")]
pub(crate) enum ThermalSettings {
    Mlx90640 {
        #[serde(default)]
        bus: Bus,

        #[serde(default = "default_address")]
        address: u8,

        /// Sensor refresh rate in Hz. Only the rates the sensor supports (powers of two from 0.5
        /// to 64) are accepted.
        #[serde(default = "default_frame_rate")]
        frame_rate: f32,
    },
    Mock {
        /// A TOML file of frames to replay. A synthetic scene is generated if not given.
        #[serde(default)]
        path: Option<PathBuf>,

        #[serde(default = "default_frame_rate")]
        frame_rate: f32,
    },
}

impl Default for ThermalSettings {
    fn default() -> Self {
        Self::Mlx90640 {
            bus: Bus::default(),
            address: default_address(),
            frame_rate: default_frame_rate(),
        }
    }
}

impl ThermalSettings {
    pub(crate) fn create_source(&self) -> anyhow::Result<Box<dyn ThermalSource + Send>> {
        Ok(match self {
            Self::Mlx90640 {
                bus,
                address,
                frame_rate,
            } => {
                info!(%bus, address, "connecting to MLX90640");
                let i2c = I2cdev::try_from(bus)
                    .with_context(|| format!("Unable to open I2C bus {}", bus))?;
                Box::new(Mlx90640::new(i2c, *address, *frame_rate)?)
            }
            Self::Mock { path, frame_rate } => {
                if !(*frame_rate > 0.0) {
                    bail!("Mock frame rate must be positive (given {})", frame_rate);
                }
                let delay = Duration::from_secs_f32(frame_rate.recip());
                match path {
                    Some(path) => Box::new(MockSource::from_path(path, delay)?),
                    None => Box::new(MockSource::synthetic(delay)),
                }
            }
        })
    }
}

#[cfg(test)]
mod test {
    use std::path::PathBuf;

    use super::ThermalSettings;
    use crate::thermal::i2c::Bus;

    #[test]
    fn mlx_defaults() {
        let parsed: ThermalSettings = toml::from_str("kind = \"mlx90640\"").unwrap();
        assert_eq!(parsed, ThermalSettings::default());
    }

    #[test]
    fn mlx_full() {
        let source = r#"
        kind = "mlx90640"
        bus = "/dev/i2c-3"
        address = 0x34
        frame_rate = 8
        "#;
        let parsed: ThermalSettings = toml::from_str(source).unwrap();
        assert_eq!(
            parsed,
            ThermalSettings::Mlx90640 {
                bus: Bus::Path(PathBuf::from("/dev/i2c-3")),
                address: 0x34,
                frame_rate: 8.0,
            }
        );
    }

    #[test]
    fn mock() {
        let source = r#"
        kind = "mock"
        path = "frames.toml"
        frame_rate = 2
        "#;
        let parsed: ThermalSettings = toml::from_str(source).unwrap();
        assert_eq!(
            parsed,
            ThermalSettings::Mock {
                path: Some(PathBuf::from("frames.toml")),
                frame_rate: 2.0,
            }
        );
    }

    #[test]
    fn synthetic_mock_source() {
        let parsed: ThermalSettings = toml::from_str("kind = \"mock\"\nframe_rate = 1000").unwrap();
        let mut source = parsed.create_source().unwrap();
        assert!(source.fetch_frame().is_ok());
    }

    #[test]
    fn missing_mlx_bus() {
        let dir = tempfile::tempdir().unwrap();
        let settings = ThermalSettings::Mlx90640 {
            bus: Bus::Path(dir.path().join("i2c-9")),
            address: 0x33,
            frame_rate: 4.0,
        };
        assert!(settings.create_source().is_err());
    }

    #[test]
    fn bad_mock_frame_rate() {
        let settings = ThermalSettings::Mock {
            path: None,
            frame_rate: 0.0,
        };
        assert!(settings.create_source().is_err());
    }

    #[test]
    fn error_bad_kind() {
        let parsed: Result<ThermalSettings, _> = toml::from_str("kind = \"grideye\"");
        assert!(parsed.is_err());
    }

    #[test]
    fn error_address_too_large() {
        let parsed: Result<ThermalSettings, _> =
            toml::from_str("kind = \"mlx90640\"\naddress = 300");
        assert!(parsed.is_err());
    }
}

// SPDX-License-Identifier: GPL-3.0-or-later
use std::convert::TryFrom;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use linux_embedded_hal::i2cdev::linux::LinuxI2CError;
use linux_embedded_hal::I2cdev;
use serde::Deserialize;

use crate::util::parse_int_decimal_hex;

/// An I2C bus, either by number (`/dev/i2c-N`) or by device path.
#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(untagged)]
pub(crate) enum Bus {
    Number(u32),
    Path(PathBuf),
}

impl Bus {
    pub(crate) fn device_path(&self) -> PathBuf {
        match self {
            Self::Number(n) => PathBuf::from(format!("/dev/i2c-{}", n)),
            Self::Path(path) => path.clone(),
        }
    }
}

impl Default for Bus {
    /// The bus on the Raspberry Pi GPIO header.
    fn default() -> Self {
        Self::Number(1)
    }
}

impl fmt::Display for Bus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.device_path().display())
    }
}

impl From<u32> for Bus {
    fn from(bus: u32) -> Self {
        Self::Number(bus)
    }
}

impl FromStr for Bus {
    type Err = std::convert::Infallible;

    /// Numbers (decimal or `0x` prefixed hex) are bus numbers, anything else is a path.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match parse_int_decimal_hex(s) {
            Ok(number) => Self::Number(number),
            Err(_) => Self::Path(PathBuf::from(s)),
        })
    }
}

impl TryFrom<&Bus> for I2cdev {
    type Error = LinuxI2CError;

    fn try_from(bus: &Bus) -> Result<Self, Self::Error> {
        I2cdev::new(bus.device_path())
    }
}

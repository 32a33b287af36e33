// SPDX-License-Identifier: GPL-3.0-or-later
use std::error::Error as StdError;
use std::fmt;

/// Errors from turning a temperature frame into a display raster.
#[derive(Clone, Debug, PartialEq)]
pub(crate) enum ProcessError {
    /// The zoom factor was below 1.0, or not a number.
    InvalidZoom(f32),

    /// The crop window does not fit inside the zoomed thermal image.
    CropOutOfBounds {
        x_shift: u32,
        y_shift: u32,
        zoomed_width: u32,
        zoomed_height: u32,
    },

    /// The temperature frame did not have the expected dimensions.
    FrameSize { width: u32, height: u32 },
}

impl fmt::Display for ProcessError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidZoom(zoom) => {
                write!(f, "Zoom factor must be at least 1.0 (given {})", zoom)
            }
            Self::CropOutOfBounds {
                x_shift,
                y_shift,
                zoomed_width,
                zoomed_height,
            } => write!(
                f,
                "Shift ({}, {}) places the crop window outside of the {}x{} zoomed image",
                x_shift, y_shift, zoomed_width, zoomed_height
            ),
            Self::FrameSize { width, height } => write!(
                f,
                "Expected a 32x24 temperature frame, got {}x{}",
                width, height
            ),
        }
    }
}

impl StdError for ProcessError {}

/// A failure to read a frame from a thermal sensor.
#[derive(Debug)]
pub(crate) enum FetchError {
    /// A transient failure. The read should be attempted again.
    Recoverable(anyhow::Error),

    /// The sensor is unusable.
    Fatal(anyhow::Error),

    /// The process is shutting down, so the read was abandoned.
    Cancelled,

    /// A retry limit was configured and reached.
    RetriesExhausted(usize),
}

impl fmt::Display for FetchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Recoverable(err) => write!(f, "Recoverable thermal read error: {}", err),
            Self::Fatal(err) => write!(f, "Thermal sensor failure: {}", err),
            Self::Cancelled => f.write_str("Thermal read cancelled"),
            Self::RetriesExhausted(attempts) => {
                write!(f, "Gave up reading thermal frame after {} attempts", attempts)
            }
        }
    }
}

impl StdError for FetchError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        match self {
            Self::Recoverable(err) | Self::Fatal(err) => Some(err.as_ref()),
            Self::Cancelled | Self::RetriesExhausted(_) => None,
        }
    }
}

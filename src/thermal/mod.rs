// SPDX-License-Identifier: GPL-3.0-or-later
//! Thermal sensors, and reading frames from them.
use std::sync::atomic::{AtomicBool, Ordering};

use tracing::{debug, trace};

use crate::error::FetchError;
use crate::image_buffer::ThermalImage;

mod i2c;
mod mlx90640;
mod mock;
mod settings;

pub(crate) use settings::ThermalSettings;

/// A source of temperature frames.
pub(crate) trait ThermalSource {
    /// Read a single frame, blocking until one is available.
    ///
    /// Transient failures (bad checksums, a frame that isn't ready yet) are reported as
    /// [`FetchError::Recoverable`].
    fn fetch_frame(&mut self) -> Result<ThermalImage, FetchError>;
}

/// How many times a recoverable read is attempted before giving up.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub(crate) struct RetryPolicy {
    limit: Option<usize>,
}

impl RetryPolicy {
    /// Keep trying until a frame is read (or the process shuts down).
    pub(crate) const fn unlimited() -> Self {
        Self { limit: None }
    }

    /// Give up after `attempts` recoverable failures in a row.
    #[cfg(test)]
    pub(crate) const fn limited(attempts: usize) -> Self {
        Self {
            limit: Some(attempts),
        }
    }
}

/// Read a frame from `source`, immediately retrying recoverable failures.
///
/// Retrying stops early only when `running` is cleared, or when the policy's limit is reached.
pub(crate) fn fetch_with_retry(
    source: &mut (dyn ThermalSource + Send),
    policy: RetryPolicy,
    running: &AtomicBool,
) -> Result<ThermalImage, FetchError> {
    let mut attempts = 0usize;
    loop {
        if !running.load(Ordering::Acquire) {
            return Err(FetchError::Cancelled);
        }
        attempts += 1;
        match source.fetch_frame() {
            Ok(frame) => {
                if attempts > 1 {
                    debug!(attempts, "read thermal frame after retrying");
                }
                return Ok(frame);
            }
            Err(FetchError::Recoverable(err)) => {
                trace!(attempt = attempts, error = %err, "retrying thermal read");
                if let Some(limit) = policy.limit {
                    if attempts >= limit {
                        return Err(FetchError::RetriesExhausted(attempts));
                    }
                }
            }
            Err(err) => return Err(err),
        }
    }
}

// SPDX-License-Identifier: GPL-3.0-or-later
use std::sync::Arc;
use std::time::{Duration, Instant};

use image::RgbImage;
use parking_lot::Mutex;
use tracing::{debug, warn};

mod framebuffer;
mod headless;
mod settings;

pub(crate) use settings::DisplaySettings;

/// Something frames can be shown on.
pub(crate) trait DisplaySink {
    fn width(&self) -> u32;

    fn height(&self) -> u32;

    /// Show a frame. The frame must be exactly the size of the display.
    fn show(&mut self, image: &RgbImage) -> anyhow::Result<()>;

    /// Set the backlight brightness, from 0 (off) to 100.
    fn set_backlight(&mut self, duty_percent: u8) -> anyhow::Result<()>;

    /// Blank the display and turn the backlight off.
    fn shutdown(&mut self) -> anyhow::Result<()>;
}

struct DisplayState {
    sink: Box<dyn DisplaySink + Send>,
    hold_until: Option<Instant>,
}

/// A display shared between the compositor and the control handlers.
///
/// Messages are held on screen for a while; regular frames shown during that time are dropped.
#[derive(Clone)]
pub(crate) struct SharedDisplay {
    state: Arc<Mutex<DisplayState>>,
    width: u32,
    height: u32,
}

impl SharedDisplay {
    pub(crate) fn new(sink: Box<dyn DisplaySink + Send>) -> Self {
        let width = sink.width();
        let height = sink.height();
        Self {
            state: Arc::new(Mutex::new(DisplayState {
                sink,
                hold_until: None,
            })),
            width,
            height,
        }
    }

    pub(crate) fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Show a regular frame, unless a message is being held on screen.
    ///
    /// Returns whether the frame was actually shown.
    pub(crate) fn show_frame(&self, image: &RgbImage) -> anyhow::Result<bool> {
        let mut state = self.state.lock();
        if let Some(hold_until) = state.hold_until {
            if Instant::now() < hold_until {
                return Ok(false);
            }
            state.hold_until = None;
        }
        state.sink.show(image)?;
        Ok(true)
    }

    /// Show `image` and keep it up for at least `hold`.
    pub(crate) fn show_message(&self, image: &RgbImage, hold: Duration) -> anyhow::Result<()> {
        let mut state = self.state.lock();
        state.sink.show(image)?;
        state.hold_until = Some(Instant::now() + hold);
        debug!(hold_ms = hold.as_millis() as u64, "holding message on display");
        Ok(())
    }

    pub(crate) fn set_backlight(&self, duty_percent: u8) -> anyhow::Result<()> {
        self.state.lock().sink.set_backlight(duty_percent)
    }

    pub(crate) fn shutdown(&self) -> anyhow::Result<()> {
        let mut state = self.state.lock();
        state.hold_until = None;
        state.sink.shutdown()
    }
}

impl std::fmt::Debug for SharedDisplay {
    fn fmt(&self, fmt: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        fmt.debug_struct("SharedDisplay")
            .field("width", &self.width)
            .field("height", &self.height)
            .finish()
    }
}

/// Turn a display error into a log message. Used for the paths where there's no better way to
/// report it than the log.
pub(crate) fn log_display_error(result: anyhow::Result<()>, action: &str) {
    if let Err(err) = result {
        warn!(error = ?err, "Unable to {}", action);
    }
}

#[cfg(test)]
pub(crate) mod test {
    use std::sync::Arc;
    use std::time::Duration;

    use image::{Rgb, RgbImage};
    use parking_lot::Mutex;

    use super::{DisplaySink, SharedDisplay};

    /// Everything that happened to a [`RecordingSink`].
    #[derive(Debug, Default)]
    pub(crate) struct Recording {
        pub(crate) shown: Vec<RgbImage>,
        pub(crate) backlight: Vec<u8>,
        pub(crate) shut_down: bool,
    }

    /// A display that remembers what it was asked to do.
    pub(crate) struct RecordingSink {
        width: u32,
        height: u32,
        recording: Arc<Mutex<Recording>>,
    }

    impl RecordingSink {
        pub(crate) fn new(width: u32, height: u32) -> (Self, Arc<Mutex<Recording>>) {
            let recording = Arc::new(Mutex::new(Recording::default()));
            let sink = Self {
                width,
                height,
                recording: Arc::clone(&recording),
            };
            (sink, recording)
        }
    }

    impl DisplaySink for RecordingSink {
        fn width(&self) -> u32 {
            self.width
        }

        fn height(&self) -> u32 {
            self.height
        }

        fn show(&mut self, image: &RgbImage) -> anyhow::Result<()> {
            self.recording.lock().shown.push(image.clone());
            Ok(())
        }

        fn set_backlight(&mut self, duty_percent: u8) -> anyhow::Result<()> {
            self.recording.lock().backlight.push(duty_percent);
            Ok(())
        }

        fn shutdown(&mut self) -> anyhow::Result<()> {
            let mut recording = self.recording.lock();
            recording.shut_down = true;
            recording.backlight.push(0);
            Ok(())
        }
    }

    #[test]
    fn message_holds_display() {
        let (sink, recording) = RecordingSink::new(2, 2);
        let display = SharedDisplay::new(Box::new(sink));
        let message = RgbImage::from_pixel(2, 2, Rgb([255, 255, 255]));
        let frame = RgbImage::from_pixel(2, 2, Rgb([1, 1, 1]));
        display
            .show_message(&message, Duration::from_secs(60))
            .unwrap();
        assert!(!display.show_frame(&frame).unwrap());
        let recording = recording.lock();
        assert_eq!(recording.shown, vec![message]);
    }

    #[test]
    fn hold_expires() {
        let (sink, recording) = RecordingSink::new(2, 2);
        let display = SharedDisplay::new(Box::new(sink));
        let message = RgbImage::from_pixel(2, 2, Rgb([255, 255, 255]));
        let frame = RgbImage::from_pixel(2, 2, Rgb([1, 1, 1]));
        display.show_message(&message, Duration::ZERO).unwrap();
        assert!(display.show_frame(&frame).unwrap());
        assert_eq!(recording.lock().shown.len(), 2);
    }

    #[test]
    fn shutdown_turns_off_backlight() {
        let (sink, recording) = RecordingSink::new(2, 2);
        let display = SharedDisplay::new(Box::new(sink));
        assert_eq!(display.size(), (2, 2));
        display.set_backlight(50).unwrap();
        display.shutdown().unwrap();
        let recording = recording.lock();
        assert!(recording.shut_down);
        assert_eq!(recording.backlight, vec![50, 0]);
    }
}

// SPDX-License-Identifier: GPL-3.0-or-later
//! The physical buttons, and what happens when they're pressed.
use std::path::PathBuf;
use std::process::Command;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, bail, Context as _};
use tokio::sync::mpsc::UnboundedSender;
use tracing::{info, warn};

use crate::display::SharedDisplay;
use crate::frame_store::FrameStore;
use crate::render::message::overlay_message;
use crate::render::TextRenderer;

mod gpio;
mod screenshot;
mod settings;

pub(crate) use screenshot::save_screenshot;
pub(crate) use settings::ControlSettings;

/// Something a button asked for.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum ControlEvent {
    /// Power the whole device off.
    Shutdown,

    /// Freeze (or unfreeze) the display.
    TogglePause,

    /// Save what's on the display.
    Screenshot,
}

/// The watched GPIO inputs.
#[derive(Debug, Default)]
pub(crate) struct Controls {
    pins: Vec<gpio::WatchedPin>,
}

impl Controls {
    /// Start watching the buttons described in `settings`, sending presses to `sender`.
    pub(crate) fn watch(
        settings: &ControlSettings,
        sender: UnboundedSender<ControlEvent>,
        running: Arc<AtomicBool>,
    ) -> anyhow::Result<Self> {
        let debounce = Duration::from(settings.debounce);
        let assignments = [
            (settings.shutdown_pin, ControlEvent::Shutdown),
            (settings.pause_pin, ControlEvent::TogglePause),
            (settings.screenshot_pin, ControlEvent::Screenshot),
        ];
        let mut controls = Self::default();
        for (pin, event) in assignments.iter() {
            let watched = gpio::WatchedPin::watch(
                *pin,
                debounce,
                *event,
                sender.clone(),
                Arc::clone(&running),
            );
            match watched {
                Ok(watched) => controls.pins.push(watched),
                Err(err) => {
                    // Don't leave the pins that did work exported.
                    controls.close();
                    return Err(err);
                }
            }
        }
        info!(
            shutdown = settings.shutdown_pin,
            pause = settings.pause_pin,
            screenshot = settings.screenshot_pin,
            "watching buttons"
        );
        Ok(controls)
    }

    /// Stop watching and unexport every pin. The running flag must be cleared first.
    pub(crate) fn close(&mut self) {
        for pin in self.pins.drain(..) {
            if let Err(err) = pin.close() {
                warn!(error = ?err, "error releasing GPIO");
            }
        }
    }
}

/// Save the latest blended frame, then show where it was saved.
///
/// The frame store lock is only held long enough to grab the frame.
pub(crate) fn take_screenshot(
    store: &FrameStore,
    display: &SharedDisplay,
    text: &TextRenderer,
    directory: &std::path::Path,
    message_duration: Duration,
) -> anyhow::Result<PathBuf> {
    let frame = store
        .latest_blended()
        .ok_or_else(|| anyhow!("Nothing has been shown yet"))?;
    let path = save_screenshot(directory, &frame)?;
    let message = format!("Screenshot saved as {}", path.display());
    let shown = overlay_message(&frame, text, &message);
    display.show_message(&shown, message_duration)?;
    Ok(path)
}

/// Run the configured shutdown command, and wait for it to finish.
pub(crate) fn run_shutdown_command(command: &[String]) -> anyhow::Result<()> {
    let (program, args) = command
        .split_first()
        .ok_or_else(|| anyhow!("No shutdown command configured"))?;
    info!(?command, "running shutdown command");
    let status = Command::new(program)
        .args(args)
        .status()
        .with_context(|| format!("Unable to run {}", program))?;
    if !status.success() {
        bail!("Shutdown command failed with {}", status);
    }
    Ok(())
}

// SPDX-License-Identifier: GPL-3.0-or-later
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use anyhow::{anyhow, Context as _};
use linux_embedded_hal::sysfs_gpio::{Direction, Edge, Pin};
use tokio::sync::mpsc::UnboundedSender;
use tracing::{debug, trace, warn};

use super::ControlEvent;

/// How often the watcher threads check whether they should stop, in milliseconds.
const POLL_TIMEOUT: isize = 500;

/// Drops edges that come too soon after the last accepted one.
#[derive(Clone, Copy, Debug)]
pub(crate) struct Debouncer {
    interval: Duration,
    last: Option<Instant>,
}

impl Debouncer {
    pub(crate) fn new(interval: Duration) -> Self {
        Self {
            interval,
            last: None,
        }
    }

    /// Whether an edge at `now` counts as a new press.
    pub(crate) fn accept(&mut self, now: Instant) -> bool {
        let accepted = match self.last {
            None => true,
            Some(last) => now.saturating_duration_since(last) >= self.interval,
        };
        if accepted {
            self.last = Some(now);
        }
        accepted
    }
}

/// A GPIO input being watched for presses on a background thread.
#[derive(Debug)]
pub(crate) struct WatchedPin {
    pin: Pin,
    event: ControlEvent,
    thread: Option<thread::JoinHandle<()>>,
}

impl WatchedPin {
    /// Export `pin_number` as an input, and send `event` on `sender` for every debounced falling
    /// edge until `running` is cleared.
    pub(crate) fn watch(
        pin_number: u64,
        debounce: Duration,
        event: ControlEvent,
        sender: UnboundedSender<ControlEvent>,
        running: Arc<AtomicBool>,
    ) -> anyhow::Result<Self> {
        let pin = Pin::new(pin_number);
        pin.export()
            .with_context(|| format!("Unable to export GPIO {}", pin_number))?;
        pin.set_direction(Direction::In)
            .and_then(|_| pin.set_edge(Edge::FallingEdge))
            .with_context(|| format!("Unable to configure GPIO {} as an input", pin_number))?;
        let mut poller = pin
            .get_poller()
            .with_context(|| format!("Unable to watch GPIO {}", pin_number))?;
        let thread = thread::Builder::new()
            .name(format!("gpio-{}", pin_number))
            .spawn(move || {
                // The first poll returns immediately with the current state.
                let _ = poller.poll(0);
                let mut debouncer = Debouncer::new(debounce);
                while running.load(Ordering::Acquire) {
                    match poller.poll(POLL_TIMEOUT) {
                        Ok(Some(_)) => {
                            if debouncer.accept(Instant::now()) {
                                debug!(pin = pin_number, ?event, "button pressed");
                                if sender.send(event).is_err() {
                                    break;
                                }
                            } else {
                                trace!(pin = pin_number, "ignoring bounce");
                            }
                        }
                        Ok(None) => (),
                        Err(err) => {
                            warn!(pin = pin_number, error = %err, "stopped watching GPIO");
                            break;
                        }
                    }
                }
            })
            .context("Unable to start GPIO watcher thread")?;
        Ok(Self {
            pin,
            event,
            thread: Some(thread),
        })
    }

    /// Wait for the watcher thread to notice `running` was cleared, then unexport the pin.
    pub(crate) fn close(mut self) -> anyhow::Result<()> {
        if let Some(thread) = self.thread.take() {
            thread
                .join()
                .map_err(|_| anyhow!("GPIO watcher thread for {:?} panicked", self.event))?;
        }
        self.pin
            .unexport()
            .with_context(|| format!("Unable to unexport GPIO {}", self.pin.get_pin_num()))
    }
}

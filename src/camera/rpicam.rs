// SPDX-License-Identifier: GPL-3.0-or-later
use std::io::{self, Read};
use std::process::{Child, Command, Stdio};
use std::sync::Arc;
use std::thread;

use anyhow::{anyhow, bail, Context as _};
use image::{ImageFormat, RgbImage};
use parking_lot::{Condvar, Mutex};
use tracing::{debug, info, trace, warn};

use super::CameraSource;

/// Start of image marker.
const SOI: [u8; 2] = [0xFF, 0xD8];
/// End of image marker.
const EOI: [u8; 2] = [0xFF, 0xD9];

const READ_CHUNK: usize = 64 * 1024;

fn find(haystack: &[u8], needle: &[u8], from: usize) -> Option<usize> {
    haystack
        .get(from..)?
        .windows(needle.len())
        .position(|window| window == needle)
        .map(|position| position + from)
}

/// Splits a concatenated stream of JPEG images into individual images.
///
/// MJPEG from `rpicam-vid` is just each frame's JPEG written one after another, so frames are
/// delimited by the start and end of image markers.
pub(crate) struct MjpegSplitter<R> {
    reader: R,
    buffer: Vec<u8>,
    chunk: Vec<u8>,
}

impl<R: Read> MjpegSplitter<R> {
    pub(crate) fn new(reader: R) -> Self {
        Self {
            reader,
            buffer: Vec::new(),
            chunk: vec![0; READ_CHUNK],
        }
    }

    /// Read the next complete JPEG from the stream, or `None` once the stream ends.
    ///
    /// A partial frame at the end of the stream is discarded.
    pub(crate) fn next_frame(&mut self) -> io::Result<Option<Vec<u8>>> {
        loop {
            if let Some(frame) = self.split_frame() {
                return Ok(Some(frame));
            }
            let count = self.reader.read(&mut self.chunk)?;
            if count == 0 {
                return Ok(None);
            }
            self.buffer.extend_from_slice(&self.chunk[..count]);
        }
    }

    fn split_frame(&mut self) -> Option<Vec<u8>> {
        match find(&self.buffer, &SOI, 0) {
            Some(0) => (),
            Some(start) => {
                trace!(skipped = start, "discarding bytes before start of image");
                self.buffer.drain(..start);
            }
            None => {
                // Keep the last byte in case it's the first half of a marker.
                let keep_from = self.buffer.len().saturating_sub(1);
                self.buffer.drain(..keep_from);
                return None;
            }
        }
        let end = find(&self.buffer, &EOI, SOI.len())? + EOI.len();
        Some(self.buffer.drain(..end).collect())
    }
}

#[derive(Debug, Default)]
struct FrameSlot {
    jpeg: Option<Vec<u8>>,
    finished: bool,
}

/// The most recent frame from the reader thread. Older frames are overwritten, so a slow
/// consumer always gets the freshest frame instead of a growing backlog.
#[derive(Debug, Default)]
struct LatestFrame {
    slot: Mutex<FrameSlot>,
    ready: Condvar,
}

impl LatestFrame {
    fn replace(&self, jpeg: Vec<u8>) {
        let mut slot = self.slot.lock();
        slot.jpeg = Some(jpeg);
        self.ready.notify_one();
    }

    fn finish(&self) {
        let mut slot = self.slot.lock();
        slot.finished = true;
        self.ready.notify_all();
    }

    fn take(&self) -> Option<Vec<u8>> {
        let mut slot = self.slot.lock();
        while slot.jpeg.is_none() && !slot.finished {
            self.ready.wait(&mut slot);
        }
        slot.jpeg.take()
    }
}

/// A Raspberry Pi camera module, captured with an `rpicam-vid` subprocess.
#[derive(Debug)]
pub(crate) struct Rpicam {
    child: Child,
    latest: Arc<LatestFrame>,
    reader: Option<thread::JoinHandle<()>>,
}

impl Rpicam {
    pub(crate) fn spawn(command: &str, width: u32, height: u32, framerate: u32) -> anyhow::Result<Self> {
        let mut child = Command::new(command)
            .args(&["--timeout", "0", "--nopreview", "--codec", "mjpeg", "--output", "-"])
            .arg("--width")
            .arg(width.to_string())
            .arg("--height")
            .arg(height.to_string())
            .arg("--framerate")
            .arg(framerate.to_string())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()
            .with_context(|| format!("Unable to run {}", command))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| anyhow!("{} has no stdout", command))?;
        let latest = Arc::new(LatestFrame::default());
        let reader_latest = Arc::clone(&latest);
        let reader = thread::Builder::new()
            .name("rpicam-reader".to_string())
            .spawn(move || {
                let mut splitter = MjpegSplitter::new(stdout);
                loop {
                    match splitter.next_frame() {
                        Ok(Some(jpeg)) => reader_latest.replace(jpeg),
                        Ok(None) => {
                            debug!("camera stream closed");
                            break;
                        }
                        Err(err) => {
                            warn!(error = %err, "error reading camera stream");
                            break;
                        }
                    }
                }
                reader_latest.finish();
            })
            .context("Unable to start camera reader thread")?;
        info!(command, width, height, framerate, pid = child.id(), "started camera");
        Ok(Self {
            child,
            latest,
            reader: Some(reader),
        })
    }
}

impl CameraSource for Rpicam {
    fn capture(&mut self) -> anyhow::Result<RgbImage> {
        let jpeg = match self.latest.take() {
            Some(jpeg) => jpeg,
            None => bail!("Camera stream ended"),
        };
        let image = image::load_from_memory_with_format(&jpeg, ImageFormat::Jpeg)
            .context("Unable to decode camera frame")?
            .into_rgb8();
        Ok(image)
    }

    fn close(&mut self) -> anyhow::Result<()> {
        debug!(pid = self.child.id(), "stopping camera");
        self.child.kill().context("Unable to stop the camera process")?;
        self.child.wait().context("Unable to reap the camera process")?;
        if let Some(reader) = self.reader.take() {
            reader
                .join()
                .map_err(|_| anyhow!("camera reader thread panicked"))?;
        }
        Ok(())
    }
}

impl Drop for Rpicam {
    fn drop(&mut self) {
        if self.reader.is_some() {
            // Not closed cleanly, at least don't leave the process running.
            let _ = self.child.kill();
            let _ = self.child.wait();
        }
    }
}

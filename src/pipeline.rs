// SPDX-License-Identifier: GPL-3.0-or-later
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use anyhow::{anyhow, Context as _};
use futures::future::FutureExt;
use futures::stream::{FuturesUnordered, StreamExt};
use image::{Rgb, RgbImage};
use tokio::signal::unix::{signal, SignalKind};
use tokio::sync::mpsc;
use tokio::task::spawn_blocking;
use tokio::time::{interval_at, Interval};
use tracing::{debug, error, info, trace, warn};

use crate::camera::CameraSource;
use crate::control::{self, ControlEvent, ControlSettings, Controls};
use crate::display::{log_display_error, DisplaySink, SharedDisplay};
use crate::error::FetchError;
use crate::frame_store::{BlendWriter, FrameCounts, FrameStore, RasterWriter};
use crate::render::message::overlay_message;
use crate::render::{self, CameraRenderer, TextRenderer, ThermalRenderer};
use crate::settings::Settings;
use crate::system::{cpu_temperature, CpuLoad};
use crate::thermal::{fetch_with_retry, RetryPolicy, ThermalSource};
use crate::util::flatten_join_result;

/// The long running loops. Each runs on its own blocking thread.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Producer {
    Camera,
    Thermal,
    Compositor,
}

impl fmt::Display for Producer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Camera => "camera",
            Self::Thermal => "thermal camera",
            Self::Compositor => "compositor",
        })
    }
}

type ProducerTask = Pin<Box<dyn Future<Output = (Producer, anyhow::Result<()>)> + Send>>;
type TaskList = FuturesUnordered<ProducerTask>;

/// Why the main loop stopped.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Exit {
    /// Interrupted or terminated.
    Quit,

    /// The shutdown button was pressed.
    PowerOff,
}

/// Everything that the producers are built from.
pub(crate) struct Parts {
    pub(crate) camera: Box<dyn CameraSource + Send>,
    pub(crate) thermal: Box<dyn ThermalSource + Send>,
    pub(crate) display: Box<dyn DisplaySink + Send>,
}

impl Parts {
    /// Open the hardware (or stand-ins) named in `settings`.
    pub(crate) fn open(settings: &Settings) -> anyhow::Result<Self> {
        let display = settings
            .display
            .create_sink()
            .context("Error opening display")?;
        let thermal = settings
            .thermal
            .create_source()
            .context("Error opening thermal camera")?;
        let camera = settings
            .camera
            .create_source()
            .context("Error opening camera")?;
        Ok(Self {
            camera,
            thermal,
            display,
        })
    }
}

pub(crate) struct Pipeline {
    running: Arc<AtomicBool>,
    store: FrameStore,
    display: SharedDisplay,
    text: Arc<TextRenderer>,
    controls: ControlSettings,
    stats_interval: Option<Duration>,
    tasks: TaskList,
    inputs: Option<Controls>,
    events: mpsc::UnboundedReceiver<ControlEvent>,
    // Kept so the event channel stays open when no buttons are watched.
    event_sender: mpsc::UnboundedSender<ControlEvent>,
}

impl Pipeline {
    pub(crate) fn new(settings: Settings) -> anyhow::Result<Self> {
        settings.validate()?;
        let parts = Parts::open(&settings)?;
        let mut pipeline = Self::with_parts(&settings, parts)?;
        if settings.controls.enabled {
            let inputs = Controls::watch(
                &settings.controls,
                pipeline.event_sender.clone(),
                Arc::clone(&pipeline.running),
            );
            match inputs {
                Ok(inputs) => pipeline.inputs = Some(inputs),
                Err(err) => {
                    pipeline.stop_producers();
                    return Err(err.context("Error setting up buttons"));
                }
            }
        }
        Ok(pipeline)
    }

    /// Start the producer and compositor loops.
    ///
    /// Must be called from within a tokio runtime.
    pub(crate) fn with_parts(settings: &Settings, parts: Parts) -> anyhow::Result<Self> {
        let Parts {
            camera,
            thermal,
            display,
        } = parts;
        let display = SharedDisplay::new(display);
        log_display_error(
            display.set_backlight(settings.display.backlight_duty),
            "turn on the backlight",
        );
        let display_size = display.size();
        let render_settings = &settings.render;
        let text = render::load_text_renderer(
            render_settings.font_path.as_deref(),
            render_settings.font_size,
        )
        .context("Error loading font")?;
        let thermal_renderer =
            render::thermal_renderer(render_settings, display_size, Arc::clone(&text))
                .context("Error creating thermal renderer")?;
        let camera_renderer = CameraRenderer::new(
            settings.camera.rotation,
            display_size,
            render_settings.camera_filter,
        );
        let (store, writers) = FrameStore::new();
        let running = Arc::new(AtomicBool::new(true));
        let timing = &settings.timing;
        let tasks: TaskList = vec![
            spawn_producer(Producer::Camera, {
                let running = Arc::clone(&running);
                let writer = writers.camera;
                let interval = Duration::from(timing.camera_interval);
                move || camera_loop(camera, camera_renderer, writer, interval, &running)
            }),
            spawn_producer(Producer::Thermal, {
                let running = Arc::clone(&running);
                let writer = writers.thermal;
                let interval = Duration::from(timing.thermal_interval);
                move || {
                    thermal_loop(
                        thermal,
                        thermal_renderer,
                        writer,
                        interval,
                        RetryPolicy::unlimited(),
                        &running,
                    )
                }
            }),
            spawn_producer(Producer::Compositor, {
                let running = Arc::clone(&running);
                let writer = writers.blend;
                let display = display.clone();
                let weight = render_settings.blend;
                let interval = Duration::from(timing.display_interval);
                move || compositor_loop(writer, display, weight, interval, &running)
            }),
        ]
        .into_iter()
        .collect();
        let (event_sender, events) = mpsc::unbounded_channel();
        Ok(Self {
            running,
            store,
            display,
            text,
            controls: settings.controls.clone(),
            stats_interval: settings.timing.stats_interval(),
            tasks,
            inputs: None,
            events,
            event_sender,
        })
    }

    /// Run until interrupted, terminated, or the shutdown button is pressed, then tear
    /// everything down.
    pub(crate) async fn run(mut self) -> anyhow::Result<Exit> {
        let mut terminate =
            signal(SignalKind::terminate()).context("Unable to listen for SIGTERM")?;
        let mut stats = self
            .stats_interval
            .map(|period| interval_at(tokio::time::Instant::now() + period, period));
        let mut stats_logger = StatsLogger::new(self.store.counts());
        let result = loop {
            tokio::select! {
                _ = tokio::signal::ctrl_c() => {
                    info!("interrupted");
                    break Ok(Exit::Quit);
                }
                _ = terminate.recv() => {
                    info!("terminated");
                    break Ok(Exit::Quit);
                }
                Some(event) = self.events.recv() => {
                    if let Some(exit) = self.handle_event(event).await {
                        break Ok(exit);
                    }
                }
                Some((producer, result)) = self.tasks.next() => {
                    if let Err(err) = self.producer_stopped(producer, result).await {
                        break Err(err);
                    }
                }
                _ = tick(&mut stats) => {
                    stats_logger.log(self.store.counts());
                }
            }
        };
        self.shutdown().await;
        let exit = result?;
        if exit == Exit::PowerOff {
            control::run_shutdown_command(&self.controls.shutdown_command)?;
        }
        Ok(exit)
    }

    /// Respond to a button press. Returns the reason to exit, if the press was a reason to exit.
    async fn handle_event(&mut self, event: ControlEvent) -> Option<Exit> {
        debug!(?event, "handling control event");
        match event {
            ControlEvent::Shutdown => {
                info!("shutdown requested");
                Some(Exit::PowerOff)
            }
            ControlEvent::TogglePause => {
                let paused = self.store.toggle_pause();
                info!(paused, "toggled pause");
                None
            }
            ControlEvent::Screenshot => {
                let store = self.store.clone();
                let display = self.display.clone();
                let text = Arc::clone(&self.text);
                let directory = self.controls.screenshot_dir.clone();
                let hold = Duration::from(self.controls.message_duration);
                let saved = spawn_blocking(move || {
                    control::take_screenshot(&store, &display, &text, &directory, hold)
                })
                .await;
                if let Err(err) = flatten_join_result(saved) {
                    warn!(error = ?err, "unable to take screenshot");
                }
                None
            }
        }
    }

    /// Decide what to do when one of the loops ends on its own.
    ///
    /// The camera and thermal loops can die and the rest keeps going, but nothing can be shown
    /// without the compositor.
    async fn producer_stopped(
        &self,
        producer: Producer,
        result: anyhow::Result<()>,
    ) -> anyhow::Result<()> {
        match result {
            Ok(()) => {
                info!(%producer, "loop stopped");
                Ok(())
            }
            Err(err) if producer == Producer::Compositor => {
                Err(err.context("The compositor stopped"))
            }
            Err(err) => {
                error!(%producer, error = ?err, "loop failed, continuing without it");
                self.show_message(format!("The {} stopped", producer)).await;
                Ok(())
            }
        }
    }

    /// Show `message` over the latest frame, off the async runtime.
    async fn show_message(&self, message: String) {
        let store = self.store.clone();
        let display = self.display.clone();
        let text = Arc::clone(&self.text);
        let hold = Duration::from(self.controls.message_duration);
        let shown = spawn_blocking(move || {
            let background = match store.latest_blended() {
                Some(blended) => RgbImage::clone(&blended),
                None => {
                    let (width, height) = display.size();
                    RgbImage::from_pixel(width, height, Rgb([0, 0, 0]))
                }
            };
            let image = overlay_message(&background, &text, &message);
            display.show_message(&image, hold)
        })
        .await;
        log_display_error(flatten_join_result(shown), "show message");
    }

    fn stop_producers(&self) {
        self.running.store(false, Ordering::Release);
    }

    /// Stop every loop, then release the display and the buttons.
    async fn shutdown(&mut self) {
        info!("shutting down");
        self.stop_producers();
        while let Some((producer, result)) = self.tasks.next().await {
            match result {
                Ok(()) => debug!(%producer, "loop stopped"),
                Err(err) => warn!(%producer, error = ?err, "loop failed while stopping"),
            }
        }
        log_display_error(self.display.shutdown(), "turn off the display");
        if let Some(mut inputs) = self.inputs.take() {
            let closed = spawn_blocking(move || inputs.close()).await;
            if let Err(err) = closed {
                warn!(error = ?err, "unable to release buttons");
            }
        }
    }
}

impl fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pipeline")
            .field("running", &self.running)
            .field("display", &self.display)
            .field("tasks", &self.tasks.len())
            .finish()
    }
}

fn spawn_producer<F>(producer: Producer, body: F) -> ProducerTask
where
    F: FnOnce() -> anyhow::Result<()> + Send + 'static,
{
    spawn_blocking(move || {
        info!(%producer, "starting loop");
        body()
    })
    .map(move |result| (producer, flatten_join_result(result)))
    .boxed()
}

/// Resolves on every tick of `stats`, or never if there's no interval.
async fn tick(stats: &mut Option<Interval>) {
    match stats {
        Some(stats) => {
            stats.tick().await;
        }
        None => futures::future::pending().await,
    }
}

fn camera_loop(
    mut camera: Box<dyn CameraSource + Send>,
    renderer: CameraRenderer,
    writer: RasterWriter,
    interval: Duration,
    running: &AtomicBool,
) -> anyhow::Result<()> {
    let captured = (|| {
        while running.load(Ordering::Acquire) {
            let start = Instant::now();
            let frame = camera.capture().context("Error capturing camera frame")?;
            writer.replace(renderer.render(frame));
            trace!(elapsed = ?start.elapsed(), "camera frame");
            thread::sleep(interval);
        }
        Ok(())
    })();
    // Release the camera however the loop ended.
    let closed = camera.close().context("Error closing camera");
    captured.and(closed)
}

fn thermal_loop(
    mut source: Box<dyn ThermalSource + Send>,
    renderer: ThermalRenderer,
    writer: RasterWriter,
    interval: Duration,
    policy: RetryPolicy,
    running: &AtomicBool,
) -> anyhow::Result<()> {
    while running.load(Ordering::Acquire) {
        let start = Instant::now();
        let frame = match fetch_with_retry(source.as_mut(), policy, running) {
            Ok(frame) => frame,
            Err(FetchError::Cancelled) => break,
            Err(err) => return Err(anyhow!(err)),
        };
        let raster = renderer
            .render(&frame)
            .context("Error rendering thermal frame")?;
        writer.replace(raster);
        trace!(elapsed = ?start.elapsed(), "thermal frame");
        thread::sleep(interval);
    }
    Ok(())
}

fn compositor_loop(
    writer: BlendWriter,
    display: SharedDisplay,
    weight: f32,
    interval: Duration,
    running: &AtomicBool,
) -> anyhow::Result<()> {
    while running.load(Ordering::Acquire) {
        let composite = writer.compose(weight);
        if let Some(image) = composite.image() {
            display
                .show_frame(image)
                .context("Error writing to display")?;
        }
        thread::sleep(interval);
    }
    Ok(())
}

/// Logs frame rates and host load.
#[derive(Debug)]
struct StatsLogger {
    previous: FrameCounts,
    since: Instant,
    cpu_load: CpuLoad,
}

impl StatsLogger {
    fn new(counts: FrameCounts) -> Self {
        Self {
            previous: counts,
            since: Instant::now(),
            cpu_load: CpuLoad::default(),
        }
    }

    fn log(&mut self, counts: FrameCounts) {
        let elapsed = self.since.elapsed().as_secs_f32();
        if elapsed <= 0.0 {
            return;
        }
        let rate = |current: u64, previous: u64| current.saturating_sub(previous) as f32 / elapsed;
        info!(
            camera_fps = rate(counts.camera, self.previous.camera),
            thermal_fps = rate(counts.thermal, self.previous.thermal),
            display_fps = rate(counts.composited, self.previous.composited),
            cpu_temperature = ?cpu_temperature(),
            cpu_load = ?self.cpu_load.sample(),
            "stats"
        );
        self.previous = counts;
        self.since = Instant::now();
    }
}

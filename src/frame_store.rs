// SPDX-License-Identifier: GPL-3.0-or-later
//! The latest raster from each producer, and the blended result.
//!
//! Everything lives behind a single lock. Rasters are replaced wholesale (as an [`Arc`] swap),
//! so a reader never sees a half written raster, and staleness is limited to "whatever was
//! written last".
use std::sync::Arc;

use image::RgbImage;
use parking_lot::Mutex;
use tracing::warn;

use crate::render::layer::blend;

#[derive(Debug, Default)]
struct Slots {
    camera: Option<Arc<RgbImage>>,
    thermal: Option<Arc<RgbImage>>,
    blended: Option<Arc<RgbImage>>,
    paused: bool,
    counts: FrameCounts,
}

/// How many rasters have been written to each slot since startup.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub(crate) struct FrameCounts {
    pub(crate) camera: u64,
    pub(crate) thermal: u64,
    pub(crate) composited: u64,
}

/// Read access to the store, and the pause flag. Cheap to clone.
#[derive(Clone, Debug, Default)]
pub(crate) struct FrameStore {
    slots: Arc<Mutex<Slots>>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum RasterKind {
    Camera,
    Thermal,
}

/// The only way to write to the camera or thermal slot. There's exactly one of each.
#[derive(Debug)]
pub(crate) struct RasterWriter {
    store: FrameStore,
    kind: RasterKind,
}

/// The only way to write to the blended slot.
#[derive(Debug)]
pub(crate) struct BlendWriter {
    store: FrameStore,
}

/// The write handles for a new [`FrameStore`].
#[derive(Debug)]
pub(crate) struct Writers {
    pub(crate) camera: RasterWriter,
    pub(crate) thermal: RasterWriter,
    pub(crate) blend: BlendWriter,
}

/// What the compositor should show this cycle.
#[derive(Clone, Debug, PartialEq)]
pub(crate) enum Composite {
    /// Paused; leave the display alone.
    Paused,

    /// No rasters yet.
    Empty,

    /// No camera raster yet, so the thermal raster alone.
    ThermalOnly(Arc<RgbImage>),

    /// No thermal raster yet, so the camera raster alone.
    CameraOnly(Arc<RgbImage>),

    Blended(Arc<RgbImage>),
}

impl Composite {
    pub(crate) fn image(&self) -> Option<&Arc<RgbImage>> {
        match self {
            Self::Paused | Self::Empty => None,
            Self::ThermalOnly(image) | Self::CameraOnly(image) | Self::Blended(image) => {
                Some(image)
            }
        }
    }
}

impl FrameStore {
    pub(crate) fn new() -> (Self, Writers) {
        let store = Self::default();
        let writers = Writers {
            camera: RasterWriter {
                store: store.clone(),
                kind: RasterKind::Camera,
            },
            thermal: RasterWriter {
                store: store.clone(),
                kind: RasterKind::Thermal,
            },
            blend: BlendWriter {
                store: store.clone(),
            },
        };
        (store, writers)
    }

    /// The most recently blended raster.
    pub(crate) fn latest_blended(&self) -> Option<Arc<RgbImage>> {
        self.slots.lock().blended.clone()
    }

    /// Flip the pause flag, returning the new value.
    pub(crate) fn toggle_pause(&self) -> bool {
        let mut slots = self.slots.lock();
        slots.paused = !slots.paused;
        slots.paused
    }

    pub(crate) fn is_paused(&self) -> bool {
        self.slots.lock().paused
    }

    pub(crate) fn counts(&self) -> FrameCounts {
        self.slots.lock().counts
    }
}

impl RasterWriter {
    /// Replace this writer's slot. The raster should be fully rendered before calling this.
    pub(crate) fn replace(&self, raster: RgbImage) {
        let raster = Arc::new(raster);
        let mut slots = self.store.slots.lock();
        match self.kind {
            RasterKind::Camera => {
                slots.camera = Some(raster);
                slots.counts.camera += 1;
            }
            RasterKind::Thermal => {
                slots.thermal = Some(raster);
                slots.counts.thermal += 1;
            }
        }
    }
}

impl BlendWriter {
    /// Blend the latest camera and thermal rasters, `camera * (1 - weight) + thermal * weight`.
    ///
    /// Blended (and thermal only) results are stored as the latest blended raster.
    pub(crate) fn compose(&self, weight: f32) -> Composite {
        let mut slots = self.store.slots.lock();
        if slots.paused {
            return Composite::Paused;
        }
        let composite = match (&slots.camera, &slots.thermal) {
            (None, None) => return Composite::Empty,
            (Some(camera), None) => return Composite::CameraOnly(Arc::clone(camera)),
            (None, Some(thermal)) => Composite::ThermalOnly(Arc::clone(thermal)),
            (Some(camera), Some(thermal)) => match blend(camera, thermal, weight) {
                Some(blended) => Composite::Blended(Arc::new(blended)),
                None => {
                    warn!(
                        camera = ?camera.dimensions(),
                        thermal = ?thermal.dimensions(),
                        "camera and thermal rasters are different sizes, showing thermal only"
                    );
                    Composite::ThermalOnly(Arc::clone(thermal))
                }
            },
        };
        slots.blended = composite.image().cloned();
        slots.counts.composited += 1;
        composite
    }
}

// SPDX-License-Identifier: GPL-3.0-or-later
use std::fs;
use std::io;
use std::path::Path;

use anyhow::Context as _;
use serde::Deserialize;
use tracing::{info, warn};

mod cli;
mod timing;

use crate::camera::CameraSettings;
use crate::control::ControlSettings;
use crate::display::DisplaySettings;
use crate::render::RenderSettings;
use crate::thermal::ThermalSettings;
pub(crate) use cli::Args;
pub(crate) use timing::{Milliseconds, TimingSettings};

#[derive(Clone, Debug, Default, Deserialize, PartialEq)]
pub(crate) struct Settings {
    /// The thermal sensor.
    #[serde(default)]
    pub(crate) thermal: ThermalSettings,

    /// The visible light camera.
    #[serde(default)]
    pub(crate) camera: CameraSettings,

    #[serde(default)]
    pub(crate) display: DisplaySettings,

    /// How the thermal image is colored, zoomed, labeled and blended.
    #[serde(default)]
    pub(crate) render: RenderSettings,

    /// Producer and compositor loop intervals.
    #[serde(default)]
    pub(crate) timing: TimingSettings,

    /// The GPIO buttons.
    #[serde(default)]
    pub(crate) controls: ControlSettings,
}

impl Settings {
    /// Load the settings named on the command line.
    ///
    /// A missing config file at the default location isn't an error, the defaults are used
    /// instead. A missing file that was explicitly given is.
    pub(crate) fn load(args: &Args) -> anyhow::Result<Self> {
        let path = args.config_path.as_path();
        match Self::from_path(path) {
            Err(err) if path == Path::new(cli::DEFAULT_CONFIG_PATH) && is_not_found(&err) => {
                warn!(
                    path = %path.display(),
                    "config file not found, using default settings"
                );
                Ok(Self::default())
            }
            result => result,
        }
    }

    pub(crate) fn from_path(path: &Path) -> anyhow::Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Unable to read config file {}", path.display()))?;
        let settings = toml::from_str(&contents)
            .with_context(|| format!("Unable to parse config file {}", path.display()))?;
        info!(path = %path.display(), "loaded configuration");
        Ok(settings)
    }

    /// Check the settings that can't be checked while parsing.
    pub(crate) fn validate(&self) -> anyhow::Result<()> {
        self.render
            .validate()
            .context("Invalid render settings")?;
        self.display
            .validate()
            .context("Invalid display settings")?;
        if self.controls.enabled {
            self.controls
                .validate()
                .context("Invalid control settings")?;
        }
        Ok(())
    }
}

fn is_not_found(err: &anyhow::Error) -> bool {
    err.chain()
        .filter_map(|cause| cause.downcast_ref::<io::Error>())
        .any(|io_err| io_err.kind() == io::ErrorKind::NotFound)
}

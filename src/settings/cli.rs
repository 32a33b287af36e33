// SPDX-License-Identifier: GPL-3.0-or-later
use structopt::StructOpt;

use std::path::PathBuf;

/// Where the config file is looked for when one isn't given. Keep in sync with `Args`.
pub(crate) const DEFAULT_CONFIG_PATH: &str = "config.toml";

#[derive(Debug, StructOpt)]
#[structopt(about = "Blend a thermal camera with a visible light camera on a small LCD.")]
pub struct Args {
    /// Path to a configuration file.
    #[structopt(short, long, parse(from_os_str), default_value = "config.toml")]
    pub config_path: PathBuf,

    /// Log filter directives, in the same format as `RUST_LOG`.
    #[structopt(long)]
    pub log: Option<String>,
}

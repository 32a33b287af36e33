// SPDX-License-Identifier: GPL-3.0-or-later
use structopt::StructOpt;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

mod camera;
mod control;
mod display;
mod error;
mod frame_store;
mod image_buffer;
mod pipeline;
mod render;
mod settings;
mod system;
mod temperature;
mod thermal;
mod util;

use crate::pipeline::Pipeline;
use crate::settings::{Args, Settings};

fn init_logging(args: &Args) {
    let filter = match &args.log {
        Some(directives) => EnvFilter::new(directives),
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

async fn run(args: Args) -> anyhow::Result<()> {
    let settings = Settings::load(&args)?;
    let pipeline = Pipeline::new(settings)?;
    let exit = pipeline.run().await?;
    info!(?exit, "exiting");
    Ok(())
}

#[tokio::main]
async fn main() {
    let args = Args::from_args();
    init_logging(&args);
    if let Err(err) = run(args).await {
        error!(error = ?err, "fatal error");
        std::process::exit(1);
    }
}

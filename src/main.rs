use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::Parser;
use labelocr::{
    config::{AppConfig, Config},
    pipeline::run_batch,
    services::{ocr::DetectorList, Services},
};
use log::info;

/// Detect text in a folder of images and write LabelMe annotations next to them.
#[derive(Parser, Debug)]
#[command(name = "labelocr", version, about)]
struct Args {
    /// Folder containing the images to annotate.
    #[arg(default_value = "samples")]
    folder: PathBuf,

    /// Configuration file to use instead of the one in the user's configuration directory.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Language of the text on the images.
    #[arg(long)]
    language: Option<String>,

    /// Ignore detections shorter than this many pixels.
    #[arg(long)]
    min_height: Option<i32>,

    /// Ignore detections narrower than this many pixels.
    #[arg(long)]
    min_width: Option<i32>,

    /// Text detector to use.
    #[arg(long, value_enum)]
    detector: Option<DetectorList>,

    /// Also process images in subfolders.
    #[arg(long)]
    recursive: bool,

    /// Number of images handed to the detector at once.
    #[arg(long)]
    jobs: Option<usize>,

    /// Leave `imageData` empty in the annotation files.
    #[arg(long)]
    no_image_data: bool,

    /// Write the resulting configuration back before processing.
    #[arg(long)]
    save_config: bool,
}

impl Args {
    fn apply(&self, config: &mut AppConfig) {
        if let Some(language) = &self.language {
            config.language = language.clone();
        }
        if let Some(min_height) = self.min_height {
            config.min_height = min_height;
        }
        if let Some(min_width) = self.min_width {
            config.min_width = min_width;
        }
        if let Some(detector) = self.detector {
            config.detector = detector;
        }
        if self.recursive {
            config.recursive = true;
        }
        if let Some(jobs) = self.jobs {
            config.parallel_jobs = jobs;
        }
        if self.no_image_data {
            config.embed_image_data = false;
        }
    }
}

fn main() -> Result<()> {
    let mut logger = pretty_env_logger::formatted_builder();
    logger.filter_level(log::LevelFilter::Info);
    if let Ok(filters) = std::env::var("RUST_LOG") {
        logger.parse_filters(&filters);
    }
    logger.init();

    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => AppConfig::load_from(path),
        None => AppConfig::load(),
    }
    .context("Could not load main configuration file")?;
    args.apply(&mut config);

    if args.save_config {
        match &args.config {
            Some(path) => config.save_to(path),
            None => config.save(),
        }
        .context("Could not save main configuration file")?;
    }

    let mut services = Services::new(&config)?;
    let summary = run_batch(&config, services.detector.as_mut(), &args.folder)?;

    info!(
        "Done: {} image(s) annotated with {} region(s), {} failed",
        summary.processed, summary.regions, summary.failed
    );

    if summary.processed == 0 && summary.failed > 0 {
        bail!("Every image failed to process");
    }

    Ok(())
}

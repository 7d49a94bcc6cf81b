use std::{
    io::{Cursor, Write},
    path::{Path, PathBuf},
};

use anyhow::{ensure, Context, Result};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use image::{DynamicImage, ImageFormat};
use log::{debug, error, info, warn};
use tempfile::NamedTempFile;
use walkdir::WalkDir;

use crate::{
    annotation::{text_listing, AnnotationDocument, ImageInfo},
    config::AppConfig,
    consolidate::{consolidate, MergedRegion},
    detection::RawDetection,
    services::ocr::{DetectionJob, TextDetector},
};

/// Everything written for one image, built before anything touches the disk.
#[derive(Debug, Clone)]
pub struct ImageOutput {
    pub regions: Vec<MergedRegion>,
    pub json: String,
    pub listing: String,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct BatchSummary {
    pub processed: usize,
    pub failed: usize,
    pub regions: usize,
}

/// Turn the detector's output for one image into its annotation file and text listing.
pub fn process_image(
    config: &AppConfig,
    raw: &[RawDetection],
    image_path: &Path,
) -> Result<ImageOutput> {
    let image = image::open(image_path)
        .with_context(|| format!("Could not open image `{}`", image_path.display()))?;

    let detections = config
        .filter()
        .apply(raw, config.box_mode)
        .context("Detector returned a malformed box")?;
    debug!(
        "{} of {} detections passed the size thresholds",
        detections.len(),
        raw.len()
    );

    let regions = consolidate(&detections)?;

    let data = if config.embed_image_data {
        Some(encode_png(&image).with_context(|| {
            format!("Could not re-encode image `{}`", image_path.display())
        })?)
    } else {
        None
    };
    let info = ImageInfo {
        path: file_name(image_path),
        width: image.width(),
        height: image.height(),
        data,
    };

    let json = AnnotationDocument::new(config.schema_version.as_str(), info, &regions)
        .to_json()
        .context("Could not serialise annotation document")?;
    let listing = text_listing(&regions);

    Ok(ImageOutput {
        regions,
        json,
        listing,
    })
}

fn encode_png(image: &DynamicImage) -> Result<String> {
    let mut buf = Cursor::new(Vec::new());
    image.write_to(&mut buf, ImageFormat::Png)?;
    Ok(STANDARD.encode(buf.into_inner()))
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Paths of the annotation file and the text listing for `image_path`.
pub fn output_paths(image_path: &Path) -> (PathBuf, PathBuf) {
    let stem = image_path
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_default();
    (
        image_path.with_file_name(format!("{stem}_JSON.json")),
        image_path.with_file_name(format!("{stem}_OCR_content.txt")),
    )
}

/// Write the annotation file and the text listing. Either both end up on disk or neither does.
pub fn write_outputs(image_path: &Path, output: &ImageOutput) -> Result<()> {
    let (json_path, txt_path) = output_paths(image_path);

    let json = write_temp(&json_path, &output.json)?;
    let txt = write_temp(&txt_path, &output.listing)?;

    json.persist(&json_path)
        .with_context(|| format!("Could not write `{}`", json_path.display()))?;
    if let Err(e) = txt.persist(&txt_path) {
        let _ = std::fs::remove_file(&json_path);
        return Err(e).with_context(|| format!("Could not write `{}`", txt_path.display()));
    }

    Ok(())
}

/// Write `contents` to a temporary file in the directory of `path`, ready to be renamed onto it.
fn write_temp(path: &Path, contents: &str) -> Result<NamedTempFile> {
    let dir = match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir,
        _ => Path::new("."),
    };

    let mut file = NamedTempFile::new_in(dir)
        .with_context(|| format!("Could not create a temporary file in `{}`", dir.display()))?;
    file.write_all(contents.as_bytes())
        .with_context(|| format!("Could not write `{}`", file.path().display()))?;

    Ok(file)
}

/// Images directly inside `folder` (or anywhere below it when `recursive`) with one of the given
/// extensions, sorted by file name.
pub fn find_images(folder: &Path, extensions: &[String], recursive: bool) -> Result<Vec<PathBuf>> {
    ensure!(
        folder.is_dir(),
        "Input folder `{}` is not a directory",
        folder.display()
    );

    let max_depth = if recursive { usize::MAX } else { 1 };
    let mut images = Vec::new();
    for entry in WalkDir::new(folder)
        .min_depth(1)
        .max_depth(max_depth)
        .sort_by_file_name()
    {
        let entry =
            entry.with_context(|| format!("Could not list folder `{}`", folder.display()))?;
        if !entry.file_type().is_file() {
            continue;
        }

        let matches = entry
            .path()
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| extensions.iter().any(|e| e.eq_ignore_ascii_case(ext)));
        if matches {
            images.push(entry.into_path());
        }
    }

    Ok(images)
}

/// Annotate every image in `folder`. A failing image is logged and skipped.
pub fn run_batch(
    config: &AppConfig,
    detector: &mut dyn TextDetector,
    folder: &Path,
) -> Result<BatchSummary> {
    let images = find_images(folder, &config.extensions, config.recursive)?;
    info!(
        "Found {} image(s) in `{}`, detecting text with {}",
        images.len(),
        folder.display(),
        detector.name()
    );

    let mut summary = BatchSummary::default();
    for chunk in images.chunks(config.parallel_jobs.max(1)) {
        let jobs: Vec<(&PathBuf, DetectionJob)> = chunk
            .iter()
            .map(|path| (path, detector.detect(path)))
            .collect();

        for (path, job) in jobs {
            info!("Processing image: {}...", file_name(path));

            let result = job
                .wait()
                .and_then(|detections| detections)
                .and_then(|raw| process_image(config, &raw, path))
                .and_then(|output| write_outputs(path, &output).map(|_| output));

            match result {
                Ok(output) => {
                    if output.regions.is_empty() {
                        warn!("No text regions found in {}", file_name(path));
                    } else {
                        info!("Text regions found: {}", output.regions.len());
                    }
                    let (json_path, txt_path) = output_paths(path);
                    info!(
                        "Output saved to {} and {}",
                        json_path.display(),
                        txt_path.display()
                    );
                    summary.processed += 1;
                    summary.regions += output.regions.len();
                }
                Err(e) => {
                    error!("Failed to process {}: {e:#}", path.display());
                    summary.failed += 1;
                }
            }
        }
    }

    Ok(summary)
}

use std::{
    fs::File,
    path::{Path, PathBuf},
};

use anyhow::Context;

use crate::{detection::RawDetection, services::ServiceJob};

use super::{DetectionJob, TextDetector};

/// Reads detections computed ahead of time from `<stem>.detections.json` next to each image.
#[derive(Debug, Default)]
pub struct Sidecar;

impl Sidecar {
    pub fn detections_path(image_path: &Path) -> PathBuf {
        let stem = image_path
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_default();
        image_path.with_file_name(format!("{stem}.detections.json"))
    }
}

impl TextDetector for Sidecar {
    fn name(&self) -> &'static str {
        "sidecar"
    }

    fn init(&mut self) -> anyhow::Result<()> {
        Ok(())
    }

    fn terminate(&mut self) -> anyhow::Result<()> {
        Ok(())
    }

    fn detect(&mut self, image_path: &Path) -> DetectionJob {
        let path = Self::detections_path(image_path);

        ServiceJob::new(move || {
            let file = File::open(&path).with_context(|| {
                format!("Sidecar: Could not open detections file `{}`", path.display())
            })?;
            let detections: Vec<RawDetection> =
                serde_json::from_reader(file).with_context(|| {
                    format!("Sidecar: Could not parse detections file `{}`", path.display())
                })?;
            Ok(detections)
        })
    }
}

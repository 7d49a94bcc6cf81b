use std::path::Path;

use anyhow::{anyhow, Context, Result};
use pyo3::{prelude::*, types::PyDict};
use serde::{Deserialize, Serialize};

use crate::{config::Config, detection::RawDetection, services::ServiceJob};

use super::{DetectionJob, TextDetector};

/// Runs the EasyOCR Python package in-process.
///
/// The `easyocr.Reader` is built once in `init()` and shared by every detection job.
pub struct EasyOcr {
    language: String,
    config: EasyOcrConfig,
    reader: Option<Py<PyAny>>,
}

#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
pub struct EasyOcrConfig {
    gpu: bool,
    /// Directory holding the detection and recognition models. EasyOCR's default when empty.
    model_storage_directory: String,
}

impl Config for EasyOcrConfig {
    fn path() -> &'static str {
        "ocr_services/easyocr.json"
    }
}

impl EasyOcr {
    pub fn new(language: &str) -> Self {
        Self {
            language: language.to_owned(),
            config: EasyOcrConfig::default(),
            reader: None,
        }
    }

    fn create_reader(&self) -> Result<Py<PyAny>> {
        Python::with_gil(|py| -> PyResult<Py<PyAny>> {
            let easyocr = py.import("easyocr")?;
            let kwargs = PyDict::new(py);
            kwargs.set_item("gpu", self.config.gpu)?;
            if !self.config.model_storage_directory.is_empty() {
                kwargs.set_item(
                    "model_storage_directory",
                    &self.config.model_storage_directory,
                )?;
            }
            let reader = easyocr
                .getattr("Reader")?
                .call((vec![self.language.clone()],), Some(&kwargs))?;
            Ok(reader.unbind())
        })
        .map_err(|e| anyhow!("{e}"))
    }
}

impl TextDetector for EasyOcr {
    fn name(&self) -> &'static str {
        "easyocr"
    }

    fn init(&mut self) -> anyhow::Result<()> {
        self.config = EasyOcrConfig::load().context("EasyOCR: Failed to load configuration file")?;
        let reader = self.create_reader().with_context(|| {
            format!(
                "EasyOCR: Failed to create a reader for language `{}`",
                self.language
            )
        })?;
        self.reader = Some(reader);
        Ok(())
    }

    fn terminate(&mut self) -> anyhow::Result<()> {
        self.reader = None;
        self.config
            .save()
            .context("EasyOCR: Failed to save configuration file")?;
        Ok(())
    }

    fn detect(&mut self, image_path: &Path) -> DetectionJob {
        let reader = self
            .reader
            .as_ref()
            .map(|reader| Python::with_gil(|py| reader.clone_ref(py)));
        let image_path = image_path.to_path_buf();

        ServiceJob::new(move || {
            let reader = reader.ok_or_else(|| anyhow!("EasyOCR: Service was not initialised"))?;
            let path = image_path
                .to_str()
                .ok_or_else(|| anyhow!("EasyOCR: Image path `{}` is not UTF-8", image_path.display()))?;

            let results = Python::with_gil(|py| {
                reader
                    .bind(py)
                    .call_method1("readtext", (path,))?
                    .extract::<Vec<(Vec<Vec<f64>>, String, f64)>>()
            })
            .map_err(|e| anyhow!("{e}"))
            .with_context(|| format!("EasyOCR: Failed to read text from `{}`", image_path.display()))?;

            results
                .into_iter()
                .map(|(corners, text, confidence)| {
                    Ok(RawDetection {
                        corners: to_corners(&corners)?,
                        text,
                        confidence: Some(confidence),
                    })
                })
                .collect()
        })
    }
}

fn to_corners(points: &[Vec<f64>]) -> Result<[[f64; 2]; 4]> {
    let mut corners = [[0.0; 2]; 4];
    if points.len() != corners.len() {
        return Err(anyhow!(
            "EasyOCR: Expected a box with 4 corners, got {}",
            points.len()
        ));
    }
    for (corner, point) in corners.iter_mut().zip(points) {
        match point.as_slice() {
            [x, y] => *corner = [*x, *y],
            _ => return Err(anyhow!("EasyOCR: Expected an (x, y) point, got {point:?}")),
        }
    }
    Ok(corners)
}

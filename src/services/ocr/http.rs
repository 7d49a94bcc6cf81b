use std::path::Path;

use anyhow::Context;
use serde::{Deserialize, Serialize};

use crate::{config::Config, detection::RawDetection, services::ServiceJob};

use super::{DetectionJob, TextDetector};

/// Posts each image to an HTTP endpoint that answers with a JSON array of detections.
pub struct HttpDetector {
    language: String,
    config: HttpConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HttpConfig {
    url: String,
    /// Sent as a bearer token when not empty.
    api_key: String,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            url: "http://127.0.0.1:8080/detect".to_owned(),
            api_key: String::new(),
        }
    }
}

impl Config for HttpConfig {
    fn path() -> &'static str {
        "ocr_services/http.json"
    }
}

impl HttpDetector {
    pub fn new(language: &str) -> Self {
        Self {
            language: language.to_owned(),
            config: HttpConfig::default(),
        }
    }
}

impl TextDetector for HttpDetector {
    fn name(&self) -> &'static str {
        "http"
    }

    fn init(&mut self) -> anyhow::Result<()> {
        self.config = HttpConfig::load().context("Http: Failed to load configuration file")?;
        Ok(())
    }

    fn terminate(&mut self) -> anyhow::Result<()> {
        self.config
            .save()
            .context("Http: Failed to save configuration file")?;
        Ok(())
    }

    fn detect(&mut self, image_path: &Path) -> DetectionJob {
        let config = self.config.clone();
        let language = self.language.clone();
        let image_path = image_path.to_path_buf();

        ServiceJob::new(move || {
            let image = std::fs::read(&image_path).with_context(|| {
                format!("Http: Failed to read image `{}`", image_path.display())
            })?;

            let mut request = attohttpc::post(&config.url)
                .param("lang", &language)
                .header("Content-Type", "image/png");
            if !config.api_key.is_empty() {
                request = request.bearer_auth(&config.api_key);
            }

            let detections: Vec<RawDetection> = request
                .bytes(image)
                .send()
                .with_context(|| format!("Http: Failed to reach `{}`", config.url))?
                .error_for_status()
                .with_context(|| format!("Http: `{}` returned an error status", config.url))?
                .json()
                .context("Http: Response was not a list of detections")?;

            Ok(detections)
        })
    }
}

use std::path::Path;

use anyhow::Result;
use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::detection::RawDetection;

use super::ServiceJob;

pub mod easyocr;
pub mod http;
pub mod sidecar;
pub mod websocket;

pub type DetectionJob = ServiceJob<Result<Vec<RawDetection>>>;

/// An external text detector, turning an image into boxes with recognised text.
pub trait TextDetector {
    fn name(&self) -> &'static str;

    /// Initialise the service (ie. load its configuration file, load models, etc).
    fn init(&mut self) -> Result<()>;
    /// Terminate the service (ie. save its configuration file, etc).
    fn terminate(&mut self) -> Result<()>;

    /// Detect text in the image at `image_path` on a background thread.
    fn detect(&mut self, image_path: &Path) -> DetectionJob;
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum DetectorList {
    #[value(name = "easyocr")]
    EasyOcr,
    Websocket,
    Http,
    Sidecar,
}

impl DetectorList {
    /// Create the detector for `language`. It still has to be initialised with `init()`.
    pub fn create_service(self, language: &str) -> Box<dyn TextDetector> {
        match self {
            Self::EasyOcr => Box::new(easyocr::EasyOcr::new(language)),
            Self::Websocket => Box::new(websocket::WebsocketDetector::new(language)),
            Self::Http => Box::new(http::HttpDetector::new(language)),
            Self::Sidecar => Box::new(sidecar::Sidecar),
        }
    }
}

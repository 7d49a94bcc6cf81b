use std::{
    fs::File,
    path::{Path, PathBuf},
};

use anyhow::{anyhow, Context, Result};
use serde::{de::DeserializeOwned, Deserialize, Serialize};

use crate::{
    detection::{BoxMode, DetectionFilter},
    services::ocr::DetectorList,
};

pub trait Config: Serialize + DeserializeOwned + Default {
    /// Path of the configuration file, relative to the application's configuration directory.
    fn path() -> &'static str;

    /// Full path of the configuration file inside the user's configuration directory.
    fn default_location() -> Result<PathBuf> {
        let mut config_path = dirs::config_dir()
            .ok_or_else(|| anyhow!("Could not find suitable config directory"))?;
        config_path.push(env!("CARGO_PKG_NAME"));
        config_path.push(Self::path());
        Ok(config_path)
    }

    /// Loads the configuration file, or creates a default configuration struct if the file does not exist.
    fn load() -> Result<Self> {
        Self::load_from(Self::default_location()?)
    }

    /// Loads a configuration file from an explicit path, falling back to defaults if it does not exist.
    fn load_from(config_path: impl AsRef<Path>) -> Result<Self> {
        let config_path = config_path.as_ref();

        if !config_path.exists() {
            return Ok(Self::default());
        }

        let file = File::open(config_path).with_context(|| {
            format!(
                "Could not open configuration file: `{}`",
                config_path.display()
            )
        })?;

        let config = serde_json::from_reader(file).with_context(|| {
            format!(
                "Could not read configuration file: `{}`",
                config_path.display(),
            )
        })?;

        Ok(config)
    }

    fn save(&self) -> Result<()> {
        self.save_to(Self::default_location()?)
    }

    fn save_to(&self, config_path: impl AsRef<Path>) -> Result<()> {
        let config_path = config_path.as_ref();

        if let Some(config_dir) = config_path.parent() {
            std::fs::create_dir_all(config_dir).with_context(|| {
                format!(
                    "Could not create configuration directory: `{}`",
                    config_dir.display()
                )
            })?;
        }

        let file = File::create(config_path).with_context(|| {
            format!(
                "Could not write to configuration file: `{}`",
                config_path.display()
            )
        })?;

        serde_json::to_writer_pretty(file, self).with_context(|| {
            format!(
                "Could not serialise configuration file: `{}`",
                config_path.display()
            )
        })?;

        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Language code passed to the text detector (eg. `ru`, `en`, `ja`).
    pub language: String,
    /// Detections shorter than this (in pixels) are ignored.
    pub min_height: i32,
    /// Detections narrower than this (in pixels) are ignored.
    pub min_width: i32,
    pub box_mode: BoxMode,
    pub detector: DetectorList,
    /// Image file extensions to process, compared case-insensitively.
    pub extensions: Vec<String>,
    pub recursive: bool,
    /// Value of the `version` field of the annotation files.
    pub schema_version: String,
    /// Embed the base64 encoded image in the annotation files.
    pub embed_image_data: bool,
    /// Number of images handed to the detector at once.
    pub parallel_jobs: usize,
}

impl AppConfig {
    pub fn filter(&self) -> DetectionFilter {
        DetectionFilter {
            min_height: self.min_height,
            min_width: self.min_width,
        }
    }
}

impl Config for AppConfig {
    fn path() -> &'static str {
        "config.json"
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            language: "ru".to_owned(),
            min_height: 12,
            min_width: 70,
            box_mode: BoxMode::default(),
            detector: DetectorList::EasyOcr,
            extensions: vec!["png".to_owned()],
            recursive: false,
            schema_version: "4.5.6".to_owned(),
            embed_image_data: true,
            parallel_jobs: 1,
        }
    }
}

use std::path::Path;

use anyhow::{ensure, Context, Result};
use serde::{Deserialize, Serialize};

use crate::{config::Config, detection::RawDetection, services::ServiceJob};

use super::{DetectionJob, TextDetector};

/// Talks to a detection server over a websocket: one binary message with the image bytes is
/// answered by one text message holding a JSON array of detections.
pub struct WebsocketDetector {
    language: String,
    config: WebsocketConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WebsocketConfig {
    address: String,
    port: u16,
}

impl Default for WebsocketConfig {
    fn default() -> Self {
        Self {
            address: "127.0.0.1".to_owned(),
            port: 7331,
        }
    }
}

impl Config for WebsocketConfig {
    fn path() -> &'static str {
        "ocr_services/websocket.json"
    }
}

impl WebsocketDetector {
    pub fn new(language: &str) -> Self {
        Self {
            language: language.to_owned(),
            config: WebsocketConfig::default(),
        }
    }

    /// The language is sent unescaped, so only plain codes such as `en` or `zh_sim` are allowed.
    fn url(&self) -> Result<String> {
        ensure!(
            !self.language.is_empty()
                && self
                    .language
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-'),
            "Websocket: Language `{}` is not a plain language code",
            self.language
        );
        Ok(format!(
            "ws://{}:{}/?lang={}",
            self.config.address, self.config.port, self.language
        ))
    }
}

impl TextDetector for WebsocketDetector {
    fn name(&self) -> &'static str {
        "websocket"
    }

    fn init(&mut self) -> anyhow::Result<()> {
        self.config =
            WebsocketConfig::load().context("Websocket: Failed to load configuration file")?;
        self.url()?;
        Ok(())
    }

    fn terminate(&mut self) -> anyhow::Result<()> {
        self.config
            .save()
            .context("Websocket: Failed to save configuration file")?;
        Ok(())
    }

    fn detect(&mut self, image_path: &Path) -> DetectionJob {
        let addr = self.url();
        let image_path = image_path.to_path_buf();

        ServiceJob::new(move || {
            let addr = addr?;
            let image = std::fs::read(&image_path).with_context(|| {
                format!("Websocket: Failed to read image `{}`", image_path.display())
            })?;

            let (mut socket, _) = tungstenite::connect(&addr)
                .with_context(|| format!("Websocket: Failed to connect to websocket `{addr}`"))?;

            socket
                .send(tungstenite::Message::binary(image))
                .context("Websocket: Failed to send image through websocket")?;
            let text = socket
                .read()
                .context("Websocket: Failed to read response message from websocket")?
                .into_text()
                .context(
                    "Websocket: Response message from websocket did not contain UTF-8 encoded text",
                )?;

            socket
                .close(None)
                .context("Websocket: Failed to close websocket")?;

            let detections: Vec<RawDetection> = serde_json::from_str(text.as_str())
                .context("Websocket: Response was not a list of detections")?;

            Ok(detections)
        })
    }
}

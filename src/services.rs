use std::thread::JoinHandle;

use anyhow::{anyhow, Context, Result};
use log::warn;
use ocr::TextDetector;

use crate::config::AppConfig;

pub mod ocr;

/// Holds instanciated services.
pub struct Services {
    pub detector: Box<dyn TextDetector>,
}

impl Services {
    /// Create and initialise the services specified in the given `AppConfig`.
    pub fn new(config: &AppConfig) -> Result<Self> {
        let mut detector = config.detector.create_service(&config.language);
        detector.init().with_context(|| {
            format!("Failed to initialise text detector `{}`", detector.name())
        })?;

        Ok(Self { detector })
    }
}

impl Drop for Services {
    fn drop(&mut self) {
        if let Err(e) = self.detector.terminate() {
            warn!(
                "Failed to terminate text detector `{}`: {e:#}",
                self.detector.name()
            );
        }
    }
}

/// A job being performed by a service on a background thread.
pub struct ServiceJob<T> {
    handle: JoinHandle<T>,
}

impl<T: Send + 'static> ServiceJob<T> {
    pub fn new<F: FnOnce() -> T + Send + 'static>(f: F) -> Self {
        std::thread::spawn(f).into()
    }
}

impl<T> ServiceJob<T> {
    /// Wait for the job to finish and return its return value.
    ///
    /// Returns `Err` if the job panicked.
    pub fn wait(self) -> Result<T> {
        self.handle
            .join()
            .map_err(|_| anyhow!("service job panicked"))
    }
}

impl<T> From<JoinHandle<T>> for ServiceJob<T> {
    fn from(handle: JoinHandle<T>) -> Self {
        ServiceJob { handle }
    }
}

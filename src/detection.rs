use serde::{Deserialize, Serialize};

use crate::geometry::{GeometryError, Rect};

/// A detection as reported by a text detector: a four-corner box and its recognised text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawDetection {
    /// Corners in reading order: top-left, top-right, bottom-right, bottom-left.
    #[serde(rename = "box")]
    pub corners: [[f64; 2]; 4],
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
}

/// A detection reduced to an integer rectangle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Detection {
    pub rect: Rect,
    pub text: String,
}

impl Detection {
    pub fn new(rect: Rect, text: impl Into<String>) -> Self {
        Self {
            rect,
            text: text.into(),
        }
    }
}

/// How a four-corner box becomes a rectangle.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BoxMode {
    /// Axis-aligned bounds of all four corners.
    #[default]
    Bounding,
    /// Corner 0 as top-left and corner 2 as bottom-right, unchanged.
    Diagonal,
}

impl RawDetection {
    /// Reduce this detection to an integer rectangle, truncating coordinates toward zero.
    pub fn normalize(&self, mode: BoxMode) -> Result<Detection, GeometryError> {
        let rect = match mode {
            BoxMode::Bounding => {
                let (mut x1, mut y1) = (f64::INFINITY, f64::INFINITY);
                let (mut x2, mut y2) = (f64::NEG_INFINITY, f64::NEG_INFINITY);
                for [x, y] in self.corners {
                    x1 = x1.min(x);
                    y1 = y1.min(y);
                    x2 = x2.max(x);
                    y2 = y2.max(y);
                }
                Rect::new((x1 as i32, y1 as i32), (x2 as i32, y2 as i32))?
            }
            BoxMode::Diagonal => {
                let [x1, y1] = self.corners[0];
                let [x2, y2] = self.corners[2];
                Rect::new((x1 as i32, y1 as i32), (x2 as i32, y2 as i32))?
            }
        };

        Ok(Detection::new(rect, self.text.clone()))
    }
}

/// Drops detections smaller than the configured minimum size.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DetectionFilter {
    pub min_height: i32,
    pub min_width: i32,
}

impl DetectionFilter {
    pub fn accepts(&self, detection: &Detection) -> bool {
        detection.rect.height() >= i64::from(self.min_height)
            && detection.rect.width() >= i64::from(self.min_width)
    }

    /// Normalise every raw detection and keep the ones passing the thresholds, in order.
    ///
    /// Fails on the first detection that does not reduce to a well-formed rectangle.
    pub fn apply(
        &self,
        raw: &[RawDetection],
        mode: BoxMode,
    ) -> Result<Vec<Detection>, GeometryError> {
        let mut detections = Vec::with_capacity(raw.len());
        for detection in raw {
            let detection = detection.normalize(mode)?;
            if self.accepts(&detection) {
                detections.push(detection);
            }
        }
        Ok(detections)
    }
}

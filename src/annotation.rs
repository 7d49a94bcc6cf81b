use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::consolidate::MergedRegion;
use crate::geometry::Rect;

pub const SHAPE_TYPE_RECTANGLE: &str = "rectangle";

/// A LabelMe annotation file for one image.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnnotationDocument {
    pub version: String,
    pub flags: Map<String, Value>,
    pub shapes: Vec<Shape>,
    pub image_path: String,
    /// Base64 PNG of the image, or `None` when the image is not embedded.
    pub image_data: Option<String>,
    pub image_height: u32,
    pub image_width: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Shape {
    pub label: String,
    pub points: Rect,
    pub group_id: Option<i64>,
    /// The region's text, already passed through [`escape_description`].
    pub description: String,
    pub shape_type: String,
    pub flags: Map<String, Value>,
}

/// Metadata of the annotated image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageInfo {
    pub path: String,
    pub width: u32,
    pub height: u32,
    pub data: Option<String>,
}

impl AnnotationDocument {
    /// Build the document, labelling regions `"1"`, `"2"`, ... in the given order.
    pub fn new(version: impl Into<String>, image: ImageInfo, regions: &[MergedRegion]) -> Self {
        let shapes = regions
            .iter()
            .enumerate()
            .map(|(i, region)| Shape {
                label: (i + 1).to_string(),
                points: region.rect,
                group_id: None,
                description: escape_description(&region.text),
                shape_type: SHAPE_TYPE_RECTANGLE.to_owned(),
                flags: Map::new(),
            })
            .collect();

        Self {
            version: version.into(),
            flags: Map::new(),
            shapes,
            image_path: image.path,
            image_data: image.data,
            image_height: image.height,
            image_width: image.width,
        }
    }

    /// Pretty-printed JSON with two-space indentation.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

/// JSON string encoding of `text` without the surrounding quotes. Non-ASCII is kept as is.
pub fn escape_description(text: &str) -> String {
    let quoted = Value::String(text.to_owned()).to_string();
    quoted[1..quoted.len() - 1].to_owned()
}

/// Inverse of [`escape_description`].
pub fn unescape_description(escaped: &str) -> serde_json::Result<String> {
    serde_json::from_str(&format!("\"{escaped}\""))
}

/// One escaped description per line, in region order.
pub fn text_listing(regions: &[MergedRegion]) -> String {
    let mut listing = String::new();
    for region in regions {
        listing.push_str(&escape_description(&region.text));
        listing.push('\n');
    }
    listing
}

/// Data models for the upload and thumbnail pipeline
use image::GenericImageView;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Thumbnail job carried over the work queue
///
/// Wire format is a UTF-8 JSON object. `size` and `image_id` may be absent
/// when the producer predates them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThumbnailJob {
    /// Location of the stored original blob
    pub path: String,
    /// Requested bounding-box edge length; 0 means "use the default"
    #[serde(default)]
    pub size: u32,
    /// Identifier of the original record the thumbnail belongs to
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_id: Option<Uuid>,
}

impl ThumbnailJob {
    pub fn new(path: impl Into<String>, size: u32, image_id: Uuid) -> Self {
        Self {
            path: path.into(),
            size,
            image_id: Some(image_id),
        }
    }

    /// Bounding-box edge to resize into
    pub fn bounding_box(&self, default_size: u32) -> u32 {
        if self.size == 0 {
            default_size
        } else {
            self.size
        }
    }
}

/// Metadata written for an original upload or a thumbnail
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageMeta {
    pub name: String,
    #[serde(rename = "type")]
    pub image_type: String,
    pub width: u32,
    pub height: u32,
}

/// A persisted original or thumbnail record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageRecord {
    pub id: i64,
    pub name: String,
    #[serde(rename = "type")]
    pub image_type: String,
    pub width: u32,
    pub height: u32,
}

/// An original image joined with its thumbnail
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageWithThumbnail {
    pub id: i64,
    pub image_id: Uuid,
    pub name: String,
    #[serde(rename = "type")]
    pub image_type: String,
    pub width: u32,
    pub height: u32,
    #[serde(rename = "name_miniature")]
    pub thumbnail_name: String,
    #[serde(rename = "width_miniature")]
    pub thumbnail_width: u32,
    #[serde(rename = "height_miniature")]
    pub thumbnail_height: u32,
}

/// Returned to the uploader once the original is stored and the job published
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadReceipt {
    pub id: i64,
    pub image_id: Uuid,
    #[serde(flatten)]
    pub meta: ImageMeta,
}

/// Read name, format and dimensions from raw image bytes
///
/// The type is the canonical file extension of the detected format
/// (`jpg`, `png`, ...), not the extension of `name`.
pub fn collect_image_meta(data: &[u8], name: &str) -> image::ImageResult<ImageMeta> {
    let format = image::guess_format(data)?;
    let img = image::load_from_memory_with_format(data, format)?;
    let (width, height) = img.dimensions();

    let image_type = format
        .extensions_str()
        .first()
        .copied()
        .unwrap_or("bin")
        .to_string();

    Ok(ImageMeta {
        name: name.to_string(),
        image_type,
        width,
        height,
    })
}

//! Thumbnail processor - fits an image into a square bounding box
//!
//! Resizes with Lanczos3 while keeping the aspect ratio, never upscales, and
//! always encodes the result as PNG.
//!
//! Decode, resize and encode are CPU bound; `generate_async` runs them on the
//! blocking thread pool.

use crate::error::JobError;
use bytes::Bytes;
use image::imageops::FilterType;
use image::{DynamicImage, GenericImageView, ImageOutputFormat};
use std::io::Cursor;
use std::sync::Arc;
use tracing::debug;

/// Type recorded for every generated thumbnail
pub const THUMBNAIL_TYPE: &str = "png";

/// A generated thumbnail
#[derive(Debug)]
pub struct ThumbnailResult {
    /// PNG-encoded image data
    pub data: Bytes,
    pub width: u32,
    pub height: u32,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ThumbnailProcessor;

impl ThumbnailProcessor {
    pub fn new() -> Self {
        Self
    }

    /// Generate a thumbnail from encoded image data (blocking version)
    ///
    /// `path` only labels errors.
    pub fn generate(
        &self,
        path: &str,
        original_data: &[u8],
        bounding_box: u32,
    ) -> Result<ThumbnailResult, JobError> {
        let img = decode(path, original_data)?;
        render(path, img, bounding_box)
    }

    /// Generate a thumbnail on the blocking thread pool
    ///
    /// Decoding and resize/encode run as separate blocking calls, so a panic
    /// is reported under the stage it happened in.
    pub async fn generate_async(
        self: Arc<Self>,
        path: String,
        original_data: Bytes,
        bounding_box: u32,
    ) -> Result<ThumbnailResult, JobError> {
        let task_path = path.clone();
        let img = run_blocking(
            move || decode(&task_path, &original_data),
            |reason| JobError::Decode {
                path: path.clone(),
                reason,
            },
        )
        .await?;

        let task_path = path.clone();
        run_blocking(
            move || render(&task_path, img, bounding_box),
            |reason| JobError::Encode { path, reason },
        )
        .await
    }
}

fn decode(path: &str, original_data: &[u8]) -> Result<DynamicImage, JobError> {
    image::load_from_memory(original_data).map_err(|e| JobError::Decode {
        path: path.to_string(),
        reason: e.to_string(),
    })
}

fn render(path: &str, img: DynamicImage, bounding_box: u32) -> Result<ThumbnailResult, JobError> {
    let (orig_w, orig_h) = img.dimensions();
    let (new_w, new_h) = calculate_dimensions(orig_w, orig_h, bounding_box);

    let resized = if (new_w, new_h) == (orig_w, orig_h) {
        debug!(path = %path, width = orig_w, height = orig_h, "Image already within bounding box");
        img
    } else {
        img.resize_exact(new_w, new_h, FilterType::Lanczos3)
    };

    let data = encode_png(&resized).map_err(|e| JobError::Encode {
        path: path.to_string(),
        reason: e.to_string(),
    })?;

    debug!(
        path = %path,
        original_width = orig_w,
        original_height = orig_h,
        width = new_w,
        height = new_h,
        size = data.len(),
        "Thumbnail generated"
    );

    Ok(ThumbnailResult {
        data,
        width: new_w,
        height: new_h,
    })
}

/// Run `work` on the blocking pool, turning a panic into `on_panic`'s error
async fn run_blocking<T, F>(
    work: F,
    on_panic: impl FnOnce(String) -> JobError,
) -> Result<T, JobError>
where
    F: FnOnce() -> Result<T, JobError> + Send + 'static,
    T: Send + 'static,
{
    match tokio::task::spawn_blocking(work).await {
        Ok(result) => result,
        Err(e) => Err(on_panic(format!("thumbnail task panicked: {e}"))),
    }
}

/// Dimensions of `width × height` scaled into a `bounding_box` square
///
/// Images that already fit keep their size. Otherwise the longer edge
/// becomes `bounding_box` and the shorter edge is rounded, never below 1.
pub fn calculate_dimensions(width: u32, height: u32, bounding_box: u32) -> (u32, u32) {
    if width <= bounding_box && height <= bounding_box {
        return (width, height);
    }

    let scale = |edge: u32, longer: u32| -> u32 {
        let scaled = (edge as f64 * bounding_box as f64 / longer as f64).round() as u32;
        scaled.max(1)
    };

    if width >= height {
        (bounding_box, scale(height, width))
    } else {
        (scale(width, height), bounding_box)
    }
}

fn encode_png(img: &DynamicImage) -> image::ImageResult<Bytes> {
    let mut buf = Vec::new();
    img.write_to(&mut Cursor::new(&mut buf), ImageOutputFormat::Png)?;
    Ok(Bytes::from(buf))
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::RgbImage;

    fn jpeg(width: u32, height: u32) -> Vec<u8> {
        let img = DynamicImage::ImageRgb8(RgbImage::from_pixel(
            width,
            height,
            image::Rgb([200, 120, 40]),
        ));
        let mut buf = Cursor::new(Vec::new());
        img.write_to(&mut buf, ImageOutputFormat::Jpeg(90)).unwrap();
        buf.into_inner()
    }

    #[test]
    fn test_calculate_dimensions_landscape() {
        assert_eq!(calculate_dimensions(800, 400, 100), (100, 50));
        assert_eq!(calculate_dimensions(640, 480, 100), (100, 75));
    }

    #[test]
    fn test_calculate_dimensions_portrait() {
        assert_eq!(calculate_dimensions(400, 800, 100), (50, 100));
    }

    #[test]
    fn test_calculate_dimensions_never_upscales() {
        assert_eq!(calculate_dimensions(50, 50, 100), (50, 50));
        assert_eq!(calculate_dimensions(100, 20, 100), (100, 20));
    }

    #[test]
    fn test_calculate_dimensions_keeps_thin_edge() {
        assert_eq!(calculate_dimensions(10_000, 10, 100), (100, 1));
    }

    #[test]
    fn test_generate_outputs_png() {
        let result = ThumbnailProcessor::new()
            .generate("uploads/wide.jpg", &jpeg(800, 400), 100)
            .unwrap();
        assert_eq!((result.width, result.height), (100, 50));

        let decoded = image::load_from_memory(&result.data).unwrap();
        assert_eq!(decoded.dimensions(), (100, 50));
        assert_eq!(
            image::guess_format(&result.data).unwrap(),
            image::ImageFormat::Png
        );
    }

    #[test]
    fn test_generate_small_image_keeps_size() {
        let result = ThumbnailProcessor::new()
            .generate("uploads/small.jpg", &jpeg(50, 50), 100)
            .unwrap();
        assert_eq!((result.width, result.height), (50, 50));
    }

    #[test]
    fn test_generate_rejects_undecodable_input() {
        let err = ThumbnailProcessor::new()
            .generate("uploads/broken.jpg", b"not an image", 100)
            .unwrap_err();
        assert_eq!(err.stage(), "decode");
        assert!(err.to_string().contains("uploads/broken.jpg"));
    }

    #[tokio::test]
    async fn test_blocking_panic_keeps_its_stage() {
        let err = run_blocking(
            || -> Result<(), JobError> { panic!("corrupt header") },
            |reason| JobError::Decode {
                path: "uploads/cat.jpg".to_string(),
                reason,
            },
        )
        .await
        .unwrap_err();
        assert_eq!(err.stage(), "decode");
        assert!(err.to_string().contains("panicked"));

        let err = run_blocking(
            || -> Result<(), JobError> { panic!("encoder bug") },
            |reason| JobError::Encode {
                path: "uploads/cat.jpg".to_string(),
                reason,
            },
        )
        .await
        .unwrap_err();
        assert_eq!(err.stage(), "encode");
    }

    #[tokio::test]
    async fn test_generate_async_reports_decode_stage() {
        let err = Arc::new(ThumbnailProcessor::new())
            .generate_async("uploads/broken.jpg".to_string(), Bytes::from_static(b"nope"), 100)
            .await
            .unwrap_err();
        assert_eq!(err.stage(), "decode");
    }

    #[tokio::test]
    async fn test_generate_async() {
        let processor = Arc::new(ThumbnailProcessor::new());
        let result = processor
            .generate_async("uploads/cat.jpg".to_string(), Bytes::from(jpeg(640, 480)), 100)
            .await
            .unwrap();
        assert_eq!((result.width, result.height), (100, 75));
    }
}

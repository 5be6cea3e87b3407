/// Service layer for uploads and thumbnails
pub mod thumbnail;
pub mod upload;

pub use thumbnail::{StoredThumbnail, ThumbnailJobHandler, ThumbnailProcessor};
pub use upload::{original_blob_name, UploadService};

//! Thumbnail generation
//!
//! - Processor for resizing and PNG encoding
//! - Job handler run by every pool worker

pub mod handler;
pub mod processor;

pub use handler::{thumbnail_name, StoredThumbnail, ThumbnailJobHandler};
pub use processor::{calculate_dimensions, ThumbnailProcessor, ThumbnailResult};

//! Gallery module - records, sort orders and the like-tracking store

pub mod record;
pub mod store;

pub use record::{GalleryEntry, GenerationRecord, SortOrder, UploadedImage};
pub use store::GalleryStore;

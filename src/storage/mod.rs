//! Storage module - image files on disk and base64 helpers

pub mod base64;
pub mod files;

pub use files::{ContentStore, StoredFile};

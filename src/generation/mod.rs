//! Generation module - prompt validation, dispatch and gallery persistence

pub mod service;

pub use service::{GenerationResult, GenerationService, MAX_ATTACHMENTS};

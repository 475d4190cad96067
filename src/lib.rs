//! Prompt-to-Image Gallery Gateway
//!
//! Forwards prompts and reference images to a generative image API through a
//! credential-rotating dispatcher, and keeps the results in an in-memory
//! gallery that visitors can sort and like.

pub mod api;
pub mod config;
pub mod error;
pub mod gallery;
pub mod generation;
pub mod middleware;
pub mod storage;
pub mod upstream;

pub use error::{AppError, Result};

use std::sync::Arc;

use crate::config::Settings;
use crate::gallery::GalleryStore;
use crate::generation::GenerationService;
use crate::storage::ContentStore;
use crate::upstream::GenerationClient;

/// Application state shared across all handlers
pub struct AppState {
    pub settings: Arc<Settings>,
    pub gallery: Arc<GalleryStore>,
    pub content: Arc<ContentStore>,
    pub generation: Arc<GenerationService>,
}

impl AppState {
    /// Wire the gallery, content store and generation workflow around a client
    pub fn new(settings: Settings, client: Arc<dyn GenerationClient>) -> Self {
        let gallery = Arc::new(GalleryStore::new());
        let content = Arc::new(ContentStore::new(&settings.storage));
        let generation = Arc::new(GenerationService::new(
            client,
            gallery.clone(),
            content.clone(),
        ));

        Self {
            settings: Arc::new(settings),
            gallery,
            content,
            generation,
        }
    }
}

//! Orchestrates one prompt-to-image generation

use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::error::{AppError, Result};
use crate::gallery::{GalleryStore, GenerationRecord, UploadedImage};
use crate::storage::ContentStore;
use crate::upstream::types::{GenerateContentRequest, GenerationOutput, ImageAttachment};
use crate::upstream::GenerationClient;

/// Maximum number of input images per prompt
pub const MAX_ATTACHMENTS: usize = 2;

/// Outcome of a successful generation
#[derive(Debug, Clone, Serialize)]
pub struct GenerationResult {
    /// Public path of the last generated image
    pub result_image: String,
    pub response_text: String,
    /// Gallery ids created by this generation
    #[serde(skip)]
    pub record_ids: Vec<String>,
}

/// Validates input, dispatches it and stores the results in the gallery
pub struct GenerationService {
    client: Arc<dyn GenerationClient>,
    gallery: Arc<GalleryStore>,
    content: Arc<ContentStore>,
}

impl GenerationService {
    pub fn new(
        client: Arc<dyn GenerationClient>,
        gallery: Arc<GalleryStore>,
        content: Arc<ContentStore>,
    ) -> Self {
        Self {
            client,
            gallery,
            content,
        }
    }

    pub fn client(&self) -> &Arc<dyn GenerationClient> {
        &self.client
    }

    /// Run one generation and append every returned image to the gallery
    pub async fn generate(
        &self,
        prompt: &str,
        attachments: Vec<ImageAttachment>,
    ) -> Result<GenerationResult> {
        let prompt = prompt.trim();
        if prompt.is_empty() {
            return Err(AppError::InvalidRequest("A prompt is required".to_string()));
        }

        let images: Vec<ImageAttachment> = attachments
            .into_iter()
            .filter(|a| {
                if !a.is_image() {
                    debug!(filename = %a.filename, mime = %a.mime_type, "Ignoring non-image attachment");
                }
                a.is_image()
            })
            .collect();

        if images.len() > MAX_ATTACHMENTS {
            return Err(AppError::InvalidRequest(format!(
                "At most {} images may be attached",
                MAX_ATTACHMENTS
            )));
        }

        let mut stored_uploads = Vec::with_capacity(images.len());
        let mut uploaded = Vec::with_capacity(images.len());
        for image in &images {
            let stored = self.content.save_upload(&image.data).await?;
            uploaded.push(UploadedImage {
                filename: image.filename.clone(),
                path: stored.public_path.clone(),
            });
            stored_uploads.push(stored);
        }

        let payload = GenerateContentRequest::image_generation(prompt, &images);
        let output = match self.dispatch(&payload).await {
            Ok(output) => output,
            Err(e) => {
                self.content.discard_uploads(&stored_uploads).await;
                return Err(e);
            }
        };

        let mut result_image = String::new();
        let mut record_ids = Vec::with_capacity(output.images.len());
        for image in &output.images {
            let stored = self.content.save_result(&image.data).await?;
            let record = GenerationRecord::new(
                stored.id,
                stored.public_path.clone(),
                prompt,
                uploaded.clone(),
                image.text.clone(),
            );
            let record = self.gallery.append(record)?;
            record_ids.push(record.id);
            result_image = stored.public_path;
        }

        info!(
            images = record_ids.len(),
            inputs = uploaded.len(),
            gallery_size = self.gallery.len(),
            "Generation stored"
        );

        Ok(GenerationResult {
            result_image,
            response_text: output.text,
            record_ids,
        })
    }

    /// Call the upstream and require at least one image back
    async fn dispatch(&self, payload: &GenerateContentRequest) -> Result<GenerationOutput> {
        let output = self.client.generate(payload).await?.into_output()?;

        if output.images.is_empty() {
            warn!(
                text_len = output.text.len(),
                finish_reason = output.finish_reason.as_deref().unwrap_or("none"),
                "Upstream response contained no image"
            );
            return Err(AppError::NoImageReturned);
        }

        Ok(output)
    }
}

//! Request handlers

use axum::{
    extract::{Multipart, Path, Query, State},
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info};

use crate::error::{AppError, Result};
use crate::gallery::{GalleryEntry, SortOrder};
use crate::middleware::ClientId;
use crate::upstream::types::ImageAttachment;
use crate::AppState;

/// Multipart field names accepted as input images
const IMAGE_FIELDS: [&str; 2] = ["image1", "image2"];

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub live_credentials: usize,
    pub gallery_size: usize,
}

pub async fn health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        live_credentials: state.generation.client().live_credentials(),
        gallery_size: state.gallery.len(),
    })
}

#[derive(Debug, Serialize)]
pub struct GenerateResponse {
    pub success: bool,
    pub result_image: String,
    pub response_text: String,
}

pub async fn generate(
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> Result<Json<GenerateResponse>> {
    let mut prompt = String::new();
    let mut attachments = Vec::new();

    while let Some(field) = multipart.next_field().await.map_err(malformed)? {
        let name = field.name().unwrap_or_default().to_string();

        if name == "prompt" {
            prompt = field.text().await.map_err(malformed)?;
        } else if IMAGE_FIELDS.contains(&name.as_str()) {
            let filename = field.file_name().unwrap_or_default().to_string();
            let mime_type = field.content_type().unwrap_or_default().to_string();
            let data = field.bytes().await.map_err(malformed)?;

            // browsers send an empty part for an untouched file input
            if filename.is_empty() || data.is_empty() {
                continue;
            }
            attachments.push(ImageAttachment {
                filename,
                mime_type,
                data: data.to_vec(),
            });
        }
    }

    let result = state
        .generation
        .generate(&prompt, attachments)
        .await
        .map_err(|e| {
            error!(error = %e, "Generation failed");
            e
        })?;

    Ok(Json(GenerateResponse {
        success: true,
        result_image: result.result_image,
        response_text: result.response_text,
    }))
}

fn malformed(e: axum::extract::multipart::MultipartError) -> AppError {
    AppError::InvalidRequest(format!("Malformed multipart body: {}", e))
}

#[derive(Debug, Deserialize)]
pub struct GalleryQuery {
    #[serde(default)]
    pub sort: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct GalleryResponse {
    pub current_sort: &'static str,
    pub images: Vec<GalleryEntry>,
}

pub async fn gallery(
    State(state): State<Arc<AppState>>,
    Query(query): Query<GalleryQuery>,
    client: ClientId,
) -> Json<GalleryResponse> {
    let order = query
        .sort
        .as_deref()
        .map(SortOrder::from_query)
        .unwrap_or_default();

    Json(GalleryResponse {
        current_sort: order.as_str(),
        images: state.gallery.list(order, client.as_str()),
    })
}

#[derive(Debug, Serialize)]
pub struct LikeResponse {
    pub success: bool,
    pub likes: u64,
    pub user_liked: bool,
}

pub async fn like(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    client: ClientId,
) -> Result<Json<LikeResponse>> {
    let likes = state.gallery.like(&id, client.as_str())?;
    info!(id = %id, likes, "Image liked");

    Ok(Json(LikeResponse {
        success: true,
        likes,
        user_liked: true,
    }))
}

pub async fn image_details(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    client: ClientId,
) -> Result<Json<GalleryEntry>> {
    Ok(Json(state.gallery.get_for_client(&id, client.as_str())?))
}
